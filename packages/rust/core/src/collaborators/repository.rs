//! Source repository derived from the editor's draft URL.

use async_trait::async_trait;
use specindex_shared::{Result, SpecEntry};
use url::Url;

use super::RepositoryResolver;

/// Maps well-known drafting hosts onto their GitHub repositories.
pub struct UrlRepositoryResolver;

fn github(org: &str, repo: &str) -> String {
    format!("https://github.com/{org}/{repo}")
}

/// Repository serving `url`, when the host follows a known convention.
pub(crate) fn repository_of(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;
    let first = url.path_segments()?.find(|s| !s.is_empty());

    match host {
        "drafts.csswg.org" => Some(github("w3c", "csswg-drafts")),
        "drafts.fxtf.org" => Some(github("w3c", "fxtf-drafts")),
        "drafts.css-houdini.org" => Some(github("w3c", "css-houdini-drafts")),
        "svgwg.org" => Some(github("w3c", "svgwg")),
        "registry.khronos.org" => Some(github("KhronosGroup", "WebGL")),
        "tc39.es" => first.map(|repo| github("tc39", repo)),
        h => {
            if let Some(name) = h.strip_suffix(".spec.whatwg.org") {
                Some(github("whatwg", name))
            } else if let Some(org) = h.strip_suffix(".github.io") {
                first.map(|repo| github(org, repo))
            } else {
                None
            }
        }
    }
}

#[async_trait]
impl RepositoryResolver for UrlRepositoryResolver {
    async fn repository(&self, entry: &SpecEntry) -> Result<Option<String>> {
        let url = entry
            .nightly
            .as_ref()
            .map_or(entry.url.as_str(), |n| n.url.as_str());
        Ok(repository_of(url))
    }
}
