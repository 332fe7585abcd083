//! Test locations from the web-platform-tests directory tree.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use specindex_fetch::Fetcher;
use specindex_shared::{Result, SourcesConfig, SpecEntry, TestInfo};
use tokio::sync::OnceCell;
use tracing::debug;

use super::TestPathResolver;

const WPT_REPOSITORY: &str = "https://github.com/web-platform-tests/wpt";

/// Hosts whose tests live under `css/` in the tree.
const CSS_HOSTS: &[&str] = &[
    "https://drafts.csswg.org/",
    "https://drafts.fxtf.org/",
    "https://drafts.css-houdini.org/",
];

pub struct WptTestPathResolver {
    fetcher: Arc<Fetcher>,
    tree_url: String,
    directories: OnceCell<HashSet<String>>,
}

#[derive(Debug, Deserialize)]
struct Tree {
    tree: Vec<TreeItem>,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl WptTestPathResolver {
    pub fn new(fetcher: Arc<Fetcher>, sources: &SourcesConfig) -> Self {
        Self {
            fetcher,
            tree_url: sources.wpt_tree.clone(),
            directories: OnceCell::new(),
        }
    }

    async fn directories(&self) -> Result<&HashSet<String>> {
        self.directories
            .get_or_try_init(|| async {
                let tree: Tree = self.fetcher.json(&self.tree_url).await?;
                let dirs: HashSet<String> = tree
                    .tree
                    .into_iter()
                    .filter(|item| item.kind == "tree")
                    .map(|item| item.path)
                    .collect();
                debug!(directories = dirs.len(), "test tree loaded");
                Ok(dirs)
            })
            .await
    }
}

/// Directory names the tests of `entry` would live in, series first.
fn candidates(entry: &SpecEntry) -> Vec<String> {
    let names = [entry.series.shortname.as_str(), entry.shortname.as_str()];
    if CSS_HOSTS.iter().any(|h| entry.url.starts_with(h)) {
        names.iter().map(|n| format!("css/{n}")).collect()
    } else {
        names.iter().map(|n| (*n).to_string()).collect()
    }
}

#[async_trait]
impl TestPathResolver for WptTestPathResolver {
    async fn tests(&self, entry: &SpecEntry) -> Result<Option<TestInfo>> {
        let dirs = self.directories().await?;
        Ok(candidates(entry)
            .into_iter()
            .find(|c| dirs.contains(c))
            .map(|dir| TestInfo {
                repository: WPT_REPOSITORY.to_string(),
                test_paths: vec![dir],
                exclude_paths: vec![],
            }))
    }
}
