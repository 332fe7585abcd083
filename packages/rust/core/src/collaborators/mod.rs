//! Contracts for the external data sources consulted by build steps.
//!
//! Each collaborator answers with a value or an error, never with
//! fabricated data. The HTTP implementations route every request through
//! the shared [`Fetcher`], hence through the origin-throttled queue.

mod filenames;
mod groups;
mod info;
mod repository;
mod test_paths;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use specindex_fetch::Fetcher;
use specindex_shared::{Group, Nightly, Release, Result, SourcesConfig, SpecEntry, TestInfo};

pub use filenames::HttpFilenameProber;
pub use groups::HostGroupResolver;
pub use info::HttpInfoSource;
pub use repository::UrlRepositoryResolver;
pub use test_paths::WptTestPathResolver;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Where a piece of document information came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoOrigin {
    W3cApi,
    Specref,
    Spec,
}

impl fmt::Display for InfoOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::W3cApi => f.write_str("w3c-api"),
            Self::Specref => f.write_str("specref"),
            Self::Spec => f.write_str("spec"),
        }
    }
}

/// Descriptive information about a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInfo {
    pub title: String,
    /// Overall maturity, e.g. "Working Draft" or "Living Standard".
    pub status: String,
    pub nightly: Nightly,
    pub release: Option<Release>,
    pub source: InfoOrigin,
    /// Shortname the source considers canonical, when it says so.
    pub canonical: Option<String>,
}

/// Organization and groups that develop a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affiliation {
    pub organization: String,
    pub groups: Vec<Group>,
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[async_trait]
pub trait InfoSource: Send + Sync {
    async fn info(&self, entry: &SpecEntry) -> Result<SpecInfo>;
}

#[async_trait]
pub trait GroupResolver: Send + Sync {
    async fn affiliation(&self, entry: &SpecEntry) -> Result<Affiliation>;
}

#[async_trait]
pub trait RepositoryResolver: Send + Sync {
    /// Source repository of the editor's draft, `None` when there is none.
    async fn repository(&self, entry: &SpecEntry) -> Result<Option<String>>;
}

#[async_trait]
pub trait FilenameProber: Send + Sync {
    /// Name of the file served at `url`.
    async fn filename(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait TestPathResolver: Send + Sync {
    /// Conformance test location, `None` when the document has no tests.
    async fn tests(&self, entry: &SpecEntry) -> Result<Option<TestInfo>>;
}

/// The full set of collaborators a build uses.
#[derive(Clone)]
pub struct Collaborators {
    pub info: Arc<dyn InfoSource>,
    pub groups: Arc<dyn GroupResolver>,
    pub repository: Arc<dyn RepositoryResolver>,
    pub filenames: Arc<dyn FilenameProber>,
    pub tests: Arc<dyn TestPathResolver>,
}

impl Collaborators {
    /// Default HTTP-backed collaborators sharing one fetcher.
    pub fn http(fetcher: Arc<Fetcher>, sources: &SourcesConfig) -> Self {
        Self {
            info: Arc::new(HttpInfoSource::new(Arc::clone(&fetcher), sources)),
            groups: Arc::new(HostGroupResolver::new(Arc::clone(&fetcher), sources)),
            repository: Arc::new(UrlRepositoryResolver),
            filenames: Arc::new(HttpFilenameProber::new(Arc::clone(&fetcher))),
            tests: Arc::new(WptTestPathResolver::new(fetcher, sources)),
        }
    }
}
