//! Deterministic in-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use specindex_shared::{
    FetchErrorKind, Group, Nightly, Release, Result, Series, SeriesComposition, SpecEntry,
    SpecIndexError, TestInfo,
};

use super::{
    Affiliation, Collaborators, FilenameProber, GroupResolver, InfoOrigin, InfoSource,
    RepositoryResolver, SpecInfo, TestPathResolver,
};

/// Minimal entry with a one-member series.
pub(crate) fn entry(url: &str, shortname: &str) -> SpecEntry {
    SpecEntry {
        url: url.to_string(),
        shortname: shortname.to_string(),
        series: Series {
            shortname: shortname.to_string(),
            version: None,
            current_specification: shortname.to_string(),
            previous: None,
            next: None,
        },
        series_composition: SeriesComposition::Full,
        fork_of: None,
        forks: vec![],
        force_current: false,
        multipage: false,
        title: None,
        short_title: None,
        organization: None,
        groups: vec![],
        nightly: None,
        release: None,
        standing: None,
        categories: vec![],
        tests: None,
    }
}

/// Answers every request from the entry itself; URLs in `failing` get a
/// transport error from every collaborator.
#[derive(Default)]
pub(crate) struct StubSources {
    failing: HashSet<String>,
    redirects: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubSources {
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn redirect(mut self, shortname: &str, canonical: &str) -> Self {
        self.redirects
            .insert(shortname.to_string(), canonical.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_collaborators(self) -> (Arc<Self>, Collaborators) {
        let stub = Arc::new(self);
        let collaborators = Collaborators {
            info: stub.clone(),
            groups: stub.clone(),
            repository: stub.clone(),
            filenames: stub.clone(),
            tests: stub.clone(),
        };
        (stub, collaborators)
    }

    fn check(&self, url: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|f| url.starts_with(f.as_str())) {
            return Err(SpecIndexError::fetch(
                url,
                FetchErrorKind::Transport,
                "connection reset",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InfoSource for StubSources {
    async fn info(&self, entry: &SpecEntry) -> Result<SpecInfo> {
        self.check(&entry.url)?;
        Ok(SpecInfo {
            title: format!("{} Level 1", entry.shortname.to_uppercase()),
            status: "Working Draft".into(),
            nightly: Nightly {
                url: format!("{}ed/", entry.url),
                status: "Editor's Draft".into(),
                ..Nightly::default()
            },
            release: Some(Release {
                url: entry.url.clone(),
                status: "Working Draft".into(),
                filename: None,
            }),
            source: InfoOrigin::W3cApi,
            canonical: self.redirects.get(&entry.shortname).cloned(),
        })
    }
}

#[async_trait]
impl GroupResolver for StubSources {
    async fn affiliation(&self, entry: &SpecEntry) -> Result<Affiliation> {
        self.check(&entry.url)?;
        Ok(Affiliation {
            organization: "W3C".into(),
            groups: vec![Group {
                name: "Test Working Group".into(),
                url: "https://www.w3.org/groups/wg/test/".into(),
            }],
        })
    }
}

#[async_trait]
impl RepositoryResolver for StubSources {
    async fn repository(&self, entry: &SpecEntry) -> Result<Option<String>> {
        self.check(&entry.url)?;
        Ok(Some(format!("https://github.com/test/{}", entry.shortname)))
    }
}

#[async_trait]
impl FilenameProber for StubSources {
    async fn filename(&self, url: &str) -> Result<String> {
        self.check(url)?;
        Ok("index.html".into())
    }
}

#[async_trait]
impl TestPathResolver for StubSources {
    async fn tests(&self, entry: &SpecEntry) -> Result<Option<TestInfo>> {
        self.check(&entry.url)?;
        Ok(Some(TestInfo {
            repository: "https://github.com/web-platform-tests/wpt".into(),
            test_paths: vec![entry.series.shortname.clone()],
            exclude_paths: vec![],
        }))
    }
}
