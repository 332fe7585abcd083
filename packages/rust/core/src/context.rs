//! Per-run build context.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use specindex_shared::{RawSpec, SpecEntry};

use crate::collaborators::Collaborators;
use crate::pipeline::{ProgressReporter, SilentProgress};

/// Everything a build step may consult besides the index it transforms.
///
/// Constructed once per run and passed by reference to every step.
pub struct BuildContext {
    raw: Vec<RawSpec>,
    raw_by_url: HashMap<String, usize>,
    previous: Vec<SpecEntry>,
    previous_by_url: HashMap<String, usize>,
    previous_by_shortname: HashMap<String, usize>,
    selection: Option<HashSet<String>>,
    collaborators: Collaborators,
    progress: Arc<dyn ProgressReporter>,
}

impl BuildContext {
    pub fn new(raw: Vec<RawSpec>, collaborators: Collaborators) -> Self {
        let raw_by_url = raw
            .iter()
            .enumerate()
            .map(|(i, r)| (r.url.clone(), i))
            .collect();
        Self {
            raw,
            raw_by_url,
            previous: Vec::new(),
            previous_by_url: HashMap::new(),
            previous_by_shortname: HashMap::new(),
            selection: None,
            collaborators,
            progress: Arc::new(SilentProgress),
        }
    }

    /// Last known good index, used as fallback for discontinued entries.
    pub fn with_previous(mut self, previous: Vec<SpecEntry>) -> Self {
        self.previous_by_url = previous
            .iter()
            .enumerate()
            .map(|(i, e)| (e.url.clone(), i))
            .collect();
        self.previous_by_shortname = previous
            .iter()
            .enumerate()
            .map(|(i, e)| (e.shortname.clone(), i))
            .collect();
        self.previous = previous;
        self
    }

    /// Restrict the build output to these URLs. Identities and links are
    /// still computed against the whole raw list.
    pub fn with_selection(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.selection = Some(urls.into_iter().collect());
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn raw(&self) -> &[RawSpec] {
        &self.raw
    }

    pub fn raw_for(&self, url: &str) -> Option<&RawSpec> {
        self.raw_by_url.get(url).map(|&i| &self.raw[i])
    }

    /// Previous version of `entry`, matched by URL, then by shortname.
    pub fn previous_for(&self, entry: &SpecEntry) -> Option<&SpecEntry> {
        self.previous_by_url
            .get(&entry.url)
            .or_else(|| self.previous_by_shortname.get(&entry.shortname))
            .map(|&i| &self.previous[i])
    }

    pub fn selection(&self) -> Option<&HashSet<String>> {
        self.selection.as_ref()
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn progress(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }
}
