//! Organization and group attribution by host, with the W3C API for
//! W3C-hosted documents.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use specindex_fetch::Fetcher;
use specindex_shared::{Group, Result, SourcesConfig, SpecEntry, SpecIndexError};
use url::Url;

use super::{Affiliation, GroupResolver};

pub struct HostGroupResolver {
    fetcher: Arc<Fetcher>,
    w3c_api: String,
}

#[derive(Debug, Deserialize)]
struct Deliverers {
    #[serde(rename = "_links")]
    links: DelivererLinks,
}

#[derive(Debug, Deserialize)]
struct DelivererLinks {
    #[serde(default)]
    deliverers: Vec<Deliverer>,
}

#[derive(Debug, Deserialize)]
struct Deliverer {
    href: String,
    title: String,
}

fn group(name: &str, url: &str) -> Group {
    Group {
        name: name.to_string(),
        url: url.to_string(),
    }
}

fn affiliation(organization: &str, groups: Vec<Group>) -> Affiliation {
    Affiliation {
        organization: organization.to_string(),
        groups,
    }
}

/// Affiliation that follows from the host alone.
fn from_host(host: &str, path: &str) -> Option<Affiliation> {
    let css_wg = || {
        group(
            "Cascading Style Sheets (CSS) Working Group",
            "https://www.w3.org/groups/wg/css/",
        )
    };

    let found = match host {
        h if h.ends_with(".spec.whatwg.org") => {
            affiliation("WHATWG", vec![group("WHATWG", "https://whatwg.org/")])
        }
        "drafts.csswg.org" | "drafts.css-houdini.org" => affiliation("W3C", vec![css_wg()]),
        "drafts.fxtf.org" => affiliation(
            "W3C",
            vec![
                css_wg(),
                group("SVG Working Group", "https://www.w3.org/groups/wg/svg/"),
            ],
        ),
        "svgwg.org" => affiliation(
            "W3C",
            vec![group("SVG Working Group", "https://www.w3.org/groups/wg/svg/")],
        ),
        "wicg.github.io" => affiliation(
            "W3C",
            vec![group(
                "Web Platform Incubator Community Group",
                "https://www.w3.org/community/wicg/",
            )],
        ),
        "tc39.es" | "ecma-international.org" => {
            affiliation("Ecma International", vec![group("TC39", "https://tc39.es/")])
        }
        "registry.khronos.org" => affiliation(
            "Khronos Group",
            vec![group("WebGL Working Group", "https://www.khronos.org/webgl/")],
        ),
        "datatracker.ietf.org" => {
            let wg = path
                .strip_prefix("/doc/html/draft-ietf-")
                .and_then(|rest| rest.split('-').next())
                .filter(|wg| !wg.is_empty());
            match wg {
                Some(wg) => affiliation(
                    "IETF",
                    vec![group(
                        &format!("{} Working Group", wg.to_ascii_uppercase()),
                        &format!("https://datatracker.ietf.org/wg/{wg}/"),
                    )],
                ),
                None => affiliation("IETF", vec![]),
            }
        }
        "www.rfc-editor.org" => affiliation("IETF", vec![]),
        "www.iso.org" => affiliation("ISO", vec![]),
        _ => return None,
    };
    Some(found)
}

impl HostGroupResolver {
    pub fn new(fetcher: Arc<Fetcher>, sources: &SourcesConfig) -> Self {
        Self {
            fetcher,
            w3c_api: sources.w3c_api.trim_end_matches('/').to_string(),
        }
    }

    async fn from_w3c_api(&self, entry: &SpecEntry) -> Result<Affiliation> {
        let url = format!(
            "{}/specifications/{}/versions/latest/deliverers",
            self.w3c_api, entry.shortname
        );
        let deliverers: Deliverers = self.fetcher.json(&url).await?;
        let groups = deliverers
            .links
            .deliverers
            .into_iter()
            .map(|d| Group {
                url: homepage_of(&d.href),
                name: d.title,
            })
            .collect();
        Ok(affiliation("W3C", groups))
    }
}

/// `https://api.w3.org/groups/wg/css` → `https://www.w3.org/groups/wg/css/`.
fn homepage_of(api_href: &str) -> String {
    match api_href.split_once("/groups/") {
        Some((_, rest)) => format!("https://www.w3.org/groups/{}/", rest.trim_end_matches('/')),
        None => api_href.to_string(),
    }
}

#[async_trait]
impl GroupResolver for HostGroupResolver {
    async fn affiliation(&self, entry: &SpecEntry) -> Result<Affiliation> {
        let url = entry
            .nightly
            .as_ref()
            .map_or(entry.url.as_str(), |n| n.url.as_str());
        let parsed = Url::parse(url)
            .map_err(|e| SpecIndexError::validation(format!("invalid url {url}: {e}")))?;
        let host = parsed.host_str().unwrap_or_default();

        if let Some(found) = from_host(host, parsed.path()) {
            return Ok(found);
        }
        if host == "www.w3.org" || host == "w3c.github.io" || entry.release.is_some() {
            return self.from_w3c_api(entry).await;
        }
        Err(SpecIndexError::validation(format!(
            "no known organization for {}; set it in the input list",
            entry.url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::entry;
    use specindex_shared::FetchConfig;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(api: &str) -> HostGroupResolver {
        let fetcher = Fetcher::new(&FetchConfig::default()).unwrap();
        let sources = SourcesConfig {
            w3c_api: api.to_string(),
            ..SourcesConfig::default()
        };
        HostGroupResolver::new(Arc::new(fetcher), &sources)
    }

    #[tokio::test]
    async fn known_hosts() {
        let r = resolver("http://unused.invalid");

        let a = r
            .affiliation(&entry("https://fetch.spec.whatwg.org/", "fetch"))
            .await
            .unwrap();
        assert_eq!(a.organization, "WHATWG");

        let a = r
            .affiliation(&entry("https://drafts.csswg.org/css-grid-3/", "css-grid-3"))
            .await
            .unwrap();
        assert_eq!(a.groups[0].url, "https://www.w3.org/groups/wg/css/");

        let a = r
            .affiliation(&entry(
                "https://datatracker.ietf.org/doc/html/draft-ietf-httpbis-digest-headers",
                "digest-headers",
            ))
            .await
            .unwrap();
        assert_eq!(a.groups[0].name, "HTTPBIS Working Group");
    }

    #[tokio::test]
    async fn w3c_documents_use_the_api() {
        let server = MockServer::start().await;
        Mock::given(path("/specifications/webauthn-3/versions/latest/deliverers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_links": { "deliverers": [
                    { "href": "https://api.w3.org/groups/wg/webauthn", "title": "Web Authentication Working Group" }
                ]}
            })))
            .mount(&server)
            .await;

        let a = resolver(&server.uri())
            .affiliation(&entry("https://www.w3.org/TR/webauthn-3/", "webauthn-3"))
            .await
            .unwrap();
        assert_eq!(a.organization, "W3C");
        assert_eq!(
            a.groups,
            vec![group(
                "Web Authentication Working Group",
                "https://www.w3.org/groups/wg/webauthn/"
            )]
        );
    }

    #[tokio::test]
    async fn unknown_host_is_not_guessed() {
        let err = resolver("http://unused.invalid")
            .affiliation(&entry("https://example.org/spec/", "spec"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpecIndexError::Validation { .. }));
    }
}
