//! Title, status and version URLs from the W3C API, Specref, or the
//! document itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use specindex_fetch::Fetcher;
use specindex_shared::{
    FetchErrorKind, Nightly, Release, Result, SourcesConfig, SpecEntry, SpecIndexError,
};
use tracing::debug;
use url::Url;

use super::{InfoOrigin, InfoSource, SpecInfo};

const EDITORS_DRAFT: &str = "Editor's Draft";
const LIVING_STANDARD: &str = "Living Standard";

/// Info source trying the W3C API, then Specref, then the document's
/// own `<title>`.
pub struct HttpInfoSource {
    fetcher: Arc<Fetcher>,
    w3c_api: String,
    specref: String,
}

#[derive(Debug, Deserialize)]
struct W3cVersion {
    title: String,
    status: String,
    uri: String,
    #[serde(rename = "editor-draft", default)]
    editor_draft: Option<String>,
    #[serde(rename = "_links", default)]
    links: Option<W3cLinks>,
}

#[derive(Debug, Deserialize)]
struct W3cLinks {
    #[serde(default)]
    specification: Option<W3cLink>,
}

#[derive(Debug, Deserialize)]
struct W3cLink {
    href: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecrefEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ed_draft: Option<String>,
    #[serde(default)]
    alias_of: Option<String>,
}

impl HttpInfoSource {
    pub fn new(fetcher: Arc<Fetcher>, sources: &SourcesConfig) -> Self {
        Self {
            fetcher,
            w3c_api: sources.w3c_api.trim_end_matches('/').to_string(),
            specref: sources.specref.trim_end_matches('/').to_string(),
        }
    }

    async fn from_w3c_api(&self, entry: &SpecEntry) -> Result<Option<SpecInfo>> {
        let url = format!(
            "{}/specifications/{}/versions/latest",
            self.w3c_api, entry.shortname
        );
        let version: W3cVersion = match self.fetcher.json(&url).await {
            Ok(v) => v,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let canonical = version
            .links
            .and_then(|l| l.specification)
            .and_then(|s| last_segment(&s.href));

        Ok(Some(SpecInfo {
            title: version.title,
            status: version.status.clone(),
            nightly: Nightly {
                url: version.editor_draft.unwrap_or_else(|| entry.url.clone()),
                status: EDITORS_DRAFT.to_string(),
                ..Nightly::default()
            },
            release: Some(Release {
                url: version.uri,
                status: version.status,
                filename: None,
            }),
            source: InfoOrigin::W3cApi,
            canonical,
        }))
    }

    async fn from_specref(&self, entry: &SpecEntry) -> Result<Option<SpecInfo>> {
        let url = format!("{}/bibrefs?refs={}", self.specref, entry.shortname);
        let mut refs: HashMap<String, SpecrefEntry> = self.fetcher.json(&url).await?;

        let Some(mut found) = refs.remove(&entry.shortname) else {
            return Ok(None);
        };
        let canonical = found.alias_of.clone();
        if let Some(target) = canonical.as_ref().and_then(|alias| refs.remove(alias)) {
            found = target;
        }

        let Some(title) = found.title else {
            return Ok(None);
        };
        let status = found.status.unwrap_or_else(|| EDITORS_DRAFT.to_string());
        let release = found
            .href
            .as_deref()
            .filter(|href| is_tr_url(href))
            .map(|href| Release {
                url: href.to_string(),
                status: status.clone(),
                filename: None,
            });
        let nightly_url = found
            .ed_draft
            .or(found.href.filter(|href| !is_tr_url(href)))
            .unwrap_or_else(|| entry.url.clone());
        let nightly_status = if status == LIVING_STANDARD {
            LIVING_STANDARD
        } else {
            EDITORS_DRAFT
        };

        Ok(Some(SpecInfo {
            title,
            status: status.clone(),
            nightly: Nightly {
                url: nightly_url,
                status: nightly_status.to_string(),
                ..Nightly::default()
            },
            release,
            source: InfoOrigin::Specref,
            canonical,
        }))
    }

    async fn from_spec(&self, entry: &SpecEntry) -> Result<SpecInfo> {
        let body = self.fetcher.text(&entry.url).await?;
        let title = page_title(&body).ok_or_else(|| {
            SpecIndexError::fetch(&entry.url, FetchErrorKind::Decode, "document has no <title>")
        })?;

        let status = if entry.url.contains(".spec.whatwg.org") {
            LIVING_STANDARD
        } else {
            EDITORS_DRAFT
        };

        Ok(SpecInfo {
            title,
            status: status.to_string(),
            nightly: Nightly {
                url: entry.url.clone(),
                status: status.to_string(),
                ..Nightly::default()
            },
            release: None,
            source: InfoOrigin::Spec,
            canonical: None,
        })
    }
}

#[async_trait]
impl InfoSource for HttpInfoSource {
    async fn info(&self, entry: &SpecEntry) -> Result<SpecInfo> {
        if is_tr_url(&entry.url) {
            if let Some(info) = self.from_w3c_api(entry).await? {
                debug!(shortname = %entry.shortname, source = %info.source, "info found");
                return Ok(info);
            }
        }
        if let Some(info) = self.from_specref(entry).await? {
            debug!(shortname = %entry.shortname, source = %info.source, "info found");
            return Ok(info);
        }
        self.from_spec(entry).await
    }
}

fn is_tr_url(url: &str) -> bool {
    Url::parse(url)
        .is_ok_and(|u| u.host_str() == Some("www.w3.org") && u.path().starts_with("/TR/"))
}

fn is_not_found(err: &SpecIndexError) -> bool {
    matches!(
        err,
        SpecIndexError::Fetch {
            kind: FetchErrorKind::Status(404),
            ..
        }
    )
}

fn last_segment(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Text of the first `<title>`, whitespace-collapsed.
fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("title").unwrap();
    let title = doc
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::entry;
    use specindex_shared::FetchConfig;
    use std::time::Duration;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> HttpInfoSource {
        let fetcher = Fetcher::new(&FetchConfig {
            cooldown: Duration::ZERO,
            ..FetchConfig::default()
        })
        .unwrap();
        let sources = SourcesConfig {
            w3c_api: server.uri(),
            specref: server.uri(),
            ..SourcesConfig::default()
        };
        HttpInfoSource::new(Arc::new(fetcher), &sources)
    }

    #[tokio::test]
    async fn w3c_api_first_for_tr_urls() {
        let server = MockServer::start().await;
        Mock::given(path("/specifications/css-color-4/versions/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "CSS Color Module Level 4",
                "status": "Candidate Recommendation Draft",
                "uri": "https://www.w3.org/TR/2025/CRD-css-color-4-20250424/",
                "editor-draft": "https://drafts.csswg.org/css-color-4/",
                "_links": { "specification": { "href": "https://api.w3.org/specifications/css-color-4" } }
            })))
            .mount(&server)
            .await;

        let info = source(&server)
            .info(&entry("https://www.w3.org/TR/css-color-4/", "css-color-4"))
            .await
            .unwrap();

        assert_eq!(info.source, InfoOrigin::W3cApi);
        assert_eq!(info.title, "CSS Color Module Level 4");
        assert_eq!(info.nightly.url, "https://drafts.csswg.org/css-color-4/");
        assert_eq!(info.canonical.as_deref(), Some("css-color-4"));
        assert_eq!(
            info.release.map(|r| r.status).as_deref(),
            Some("Candidate Recommendation Draft")
        );
    }

    #[tokio::test]
    async fn specref_reports_aliases() {
        let server = MockServer::start().await;
        Mock::given(path("/bibrefs"))
            .and(query_param("refs", "old-name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "old-name": { "aliasOf": "new-name" },
                "new-name": { "title": "New Name", "href": "https://example.org/new/" }
            })))
            .mount(&server)
            .await;

        let info = source(&server)
            .info(&entry("https://wicg.github.io/old-name/", "old-name"))
            .await
            .unwrap();
        assert_eq!(info.source, InfoOrigin::Specref);
        assert_eq!(info.canonical.as_deref(), Some("new-name"));
        assert_eq!(info.title, "New Name");
    }

    #[tokio::test]
    async fn falls_back_to_document_title() {
        let server = MockServer::start().await;
        Mock::given(path("/bibrefs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(path("/fetch/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>\n  Fetch\n  Standard </title></head></html>",
            ))
            .mount(&server)
            .await;

        let url = format!("{}/fetch/", server.uri());
        let info = source(&server).info(&entry(&url, "fetch")).await.unwrap();
        assert_eq!(info.source, InfoOrigin::Spec);
        assert_eq!(info.title, "Fetch Standard");
        assert_eq!(info.nightly.url, url);
        assert!(info.release.is_none());
    }

    #[tokio::test]
    async fn untitled_document_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(path("/bibrefs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(path("/blank/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>nothing</p>"))
            .mount(&server)
            .await;

        let url = format!("{}/blank/", server.uri());
        let err = source(&server).info(&entry(&url, "blank")).await.unwrap_err();
        assert!(err.is_fetch());
    }

    #[test]
    fn tr_url_detection() {
        assert!(is_tr_url("https://www.w3.org/TR/webauthn-3/"));
        assert!(!is_tr_url("https://w3c.github.io/webauthn/"));
        assert_eq!(
            last_segment("https://api.w3.org/specifications/webauthn-3/").as_deref(),
            Some("webauthn-3")
        );
    }
}
