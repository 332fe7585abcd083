//! HTTP fetcher on top of the [`FetchQueue`].
//!
//! All requests go through the queue. Successful text responses are cached
//! per URL for the lifetime of the fetcher; concurrent requests for the same
//! URL share a single network round-trip. Failures are not cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use specindex_shared::{FetchConfig, FetchErrorKind, Result, SpecIndexError};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::queue::FetchQueue;

/// User-Agent string for index build requests.
const USER_AGENT: &str = concat!("specindex/", env!("CARGO_PKG_VERSION"));

type CacheSlot = Arc<OnceCell<Arc<String>>>;

/// Queue-bound HTTP client with a write-once response cache.
pub struct Fetcher {
    client: Client,
    queue: FetchQueue,
    timeout: Duration,
    github_token: Option<String>,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

impl Fetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                SpecIndexError::config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            queue: FetchQueue::new(config),
            timeout: config.timeout,
            github_token: None,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Authenticate requests to the GitHub API with `token`.
    pub fn with_github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token;
        self
    }

    /// The underlying queue.
    pub fn queue(&self) -> &FetchQueue {
        &self.queue
    }

    fn slot(&self, url: &str) -> CacheSlot {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(url.to_string()).or_default())
    }

    /// GET `url` and return the body as text.
    #[instrument(skip(self), fields(origin = %self.queue.origin_of(url)))]
    pub async fn text(&self, url: &str) -> Result<Arc<String>> {
        let slot = self.slot(url);
        let body = slot
            .get_or_try_init(|| async {
                let body = self.queue.submit(url, self.get(url)).await?;
                debug!(url, bytes = body.len(), "fetched");
                Ok::<_, SpecIndexError>(Arc::new(body))
            })
            .await?;
        Ok(Arc::clone(body))
    }

    /// GET `url` and decode the body as JSON.
    pub async fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| SpecIndexError::fetch(url, FetchErrorKind::Decode, e.to_string()))
    }

    /// HEAD `url`: `true` on success, `false` on 404/410.
    #[instrument(skip(self))]
    pub async fn exists(&self, url: &str) -> Result<bool> {
        self.queue.submit(url, self.head(url)).await
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.github_token {
            Some(token) if url.starts_with("https://api.github.com/") => {
                builder.bearer_auth(token)
            }
            _ => builder,
        }
    }

    async fn get(&self, url: &str) -> Result<String> {
        within_deadline(url, self.timeout, async {
            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .map_err(|e| transport_error(url, e))?;
            check_status(url, response.status())?;
            response.text().await.map_err(|e| transport_error(url, e))
        })
        .await
    }

    async fn head(&self, url: &str) -> Result<bool> {
        within_deadline(url, self.timeout, async {
            let response = self
                .request(reqwest::Method::HEAD, url)
                .send()
                .await
                .map_err(|e| transport_error(url, e))?;
            match response.status() {
                StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
                status => check_status(url, status).map(|()| true),
            }
        })
        .await
    }
}

/// Run a whole request, body included, under one deadline.
async fn within_deadline<T>(
    url: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
        Err(SpecIndexError::fetch(
            url,
            FetchErrorKind::Timeout,
            format!("no response within {timeout:?}"),
        ))
    })
}

fn check_status(url: &str, status: StatusCode) -> Result<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SpecIndexError::fetch(
            url,
            FetchErrorKind::RateLimited,
            "server asked to slow down",
        ));
    }
    if !status.is_success() {
        return Err(SpecIndexError::fetch(
            url,
            FetchErrorKind::Status(status.as_u16()),
            format!("HTTP {status}"),
        ));
    }
    Ok(())
}

fn transport_error(url: &str, e: reqwest::Error) -> SpecIndexError {
    let kind = if e.is_timeout() {
        FetchErrorKind::Timeout
    } else if e.is_decode() {
        FetchErrorKind::Decode
    } else {
        FetchErrorKind::Transport
    };
    SpecIndexError::fetch(url, kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout: Duration) -> Fetcher {
        Fetcher::new(&FetchConfig {
            cooldown: Duration::ZERO,
            timeout,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    fn fetch_kind(err: &SpecIndexError) -> Option<FetchErrorKind> {
        match err {
            SpecIndexError::Fetch { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    #[tokio::test]
    async fn text_is_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<title>Doc</title>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher(Duration::from_secs(5));
        let url = format!("{}/doc/", server.uri());

        let (a, b) = futures::join!(fetcher.text(&url), fetcher.text(&url));
        assert_eq!(a.unwrap().as_str(), "<title>Doc</title>");
        assert_eq!(b.unwrap().as_str(), "<title>Doc</title>");
        assert_eq!(fetcher.text(&url).await.unwrap().as_str(), "<title>Doc</title>");
    }

    #[tokio::test]
    async fn json_decodes_and_reports_bad_bodies() {
        let server = MockServer::start().await;
        Mock::given(path("/ok.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"title":"X"}"#))
            .mount(&server)
            .await;
        Mock::given(path("/bad.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = fetcher(Duration::from_secs(5));
        let value: serde_json::Value = fetcher
            .json(&format!("{}/ok.json", server.uri()))
            .await
            .unwrap();
        assert_eq!(value["title"], "X");

        let err = fetcher
            .json::<serde_json::Value>(&format!("{}/bad.json", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(fetch_kind(&err), Some(FetchErrorKind::Decode));
    }

    #[tokio::test]
    async fn rate_limit_and_status_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = fetcher(Duration::from_secs(5));
        let err = fetcher.text(&format!("{}/busy", server.uri())).await.unwrap_err();
        assert_eq!(fetch_kind(&err), Some(FetchErrorKind::RateLimited));

        let err = fetcher.text(&format!("{}/missing", server.uri())).await.unwrap_err();
        assert_eq!(fetch_kind(&err), Some(FetchErrorKind::Status(404)));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("back"))
            .mount(&server)
            .await;

        let fetcher = fetcher(Duration::from_secs(5));
        let url = format!("{}/flaky", server.uri());
        assert!(fetcher.text(&url).await.is_err());
        assert_eq!(fetcher.text(&url).await.unwrap().as_str(), "back");
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher(Duration::from_millis(100));
        let err = fetcher.text(&format!("{}/slow", server.uri())).await.unwrap_err();
        assert_eq!(fetch_kind(&err), Some(FetchErrorKind::Timeout));
    }

    #[tokio::test]
    async fn deadline_covers_headers_and_body_together() {
        // Each half fits the deadline on its own, both together do not.
        let deadline = Duration::from_millis(100);
        let err = within_deadline("https://slow.example/", deadline, async {
            tokio::time::sleep(Duration::from_millis(70)).await;
            tokio::time::sleep(Duration::from_millis(70)).await;
            Ok::<_, SpecIndexError>("body")
        })
        .await
        .unwrap_err();

        assert_eq!(fetch_kind(&err), Some(FetchErrorKind::Timeout));
    }

    #[tokio::test]
    async fn head_probe() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/Overview.html"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = fetcher(Duration::from_secs(5));
        assert!(fetcher.exists(&format!("{}/Overview.html", server.uri())).await.unwrap());
        assert!(!fetcher.exists(&format!("{}/index.html", server.uri())).await.unwrap());
    }
}
