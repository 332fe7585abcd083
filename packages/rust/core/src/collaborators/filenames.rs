//! Filename of a published document, probing for the index file when the
//! URL names a directory.

use std::sync::Arc;

use async_trait::async_trait;
use specindex_fetch::Fetcher;
use specindex_shared::{FetchErrorKind, Result, SpecIndexError};
use url::Url;

use super::FilenameProber;

/// Index files tried, in order, for directory URLs.
const CANDIDATES: &[&str] = &["index.html", "Overview.html"];

pub struct HttpFilenameProber {
    fetcher: Arc<Fetcher>,
}

impl HttpFilenameProber {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FilenameProber for HttpFilenameProber {
    async fn filename(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| SpecIndexError::validation(format!("invalid url {url}: {e}")))?;

        if let Some(last) = parsed.path_segments().and_then(|mut s| s.next_back()) {
            if !last.is_empty() {
                return Ok(last.to_string());
            }
        }

        for candidate in CANDIDATES {
            let probe = parsed
                .join(candidate)
                .map_err(|e| SpecIndexError::validation(format!("invalid url {url}: {e}")))?;
            if self.fetcher.exists(probe.as_str()).await? {
                return Ok((*candidate).to_string());
            }
        }

        Err(SpecIndexError::fetch(
            url,
            FetchErrorKind::Status(404),
            "no index file found",
        ))
    }
}
