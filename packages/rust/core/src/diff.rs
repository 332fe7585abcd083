//! Incremental rebuilds against a previously built index.
//!
//! Compares a new raw list with the raw list the base index was built from,
//! rebuilds only added and updated items, and optionally splices them back
//! into the base index.

use std::collections::{HashMap, HashSet};

use tracing::{info, instrument, warn};

use specindex_shared::{RawSpec, Result, SpecEntry};

use crate::context::BuildContext;
use crate::pipeline::{RunMode, run_build};
use crate::steps::check_unique;

// ---------------------------------------------------------------------------
// Raw list diff
// ---------------------------------------------------------------------------

/// URLs of raw items by change status.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RawDiff {
    /// Items not present in the base list.
    pub added: Vec<String>,
    /// Items whose raw definition changed.
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    /// Items of the base list no longer present.
    pub deleted: Vec<String>,
}

impl RawDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Compare two raw lists item by item, keyed by URL.
pub fn diff_raw(new: &[RawSpec], base: &[RawSpec]) -> RawDiff {
    let base_by_url: HashMap<&str, &RawSpec> = base.iter().map(|r| (r.url.as_str(), r)).collect();
    let new_urls: HashSet<&str> = new.iter().map(|r| r.url.as_str()).collect();

    let mut diff = RawDiff::default();

    for item in new {
        match base_by_url.get(item.url.as_str()) {
            Some(old) if *old == item => diff.unchanged.push(item.url.clone()),
            Some(_) => diff.updated.push(item.url.clone()),
            None => diff.added.push(item.url.clone()),
        }
    }

    for old in base {
        if !new_urls.contains(old.url.as_str()) {
            diff.deleted.push(old.url.clone());
        }
    }

    diff
}

// ---------------------------------------------------------------------------
// Incremental build
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// Report the changed entries only.
    #[default]
    Diff,
    /// Also produce the complete updated index.
    Full,
}

/// Entries affected by a raw list change.
#[derive(Debug, Default)]
pub struct DiffOutcome {
    pub added: Vec<SpecEntry>,
    pub updated: Vec<SpecEntry>,
    /// Base index entries whose raw item disappeared.
    pub deleted: Vec<SpecEntry>,
    /// The spliced index, in [`DiffMode::Full`].
    pub index: Option<Vec<SpecEntry>>,
}

/// Rebuild the items of `ctx`'s raw list that differ from `base_raw`.
///
/// The base index serves as fallback data for discontinued entries.
/// Identities and series links are computed against the whole new raw list.
#[instrument(skip_all, fields(raw = ctx.raw().len(), base = base_index.len(), ?mode))]
pub async fn diff(
    ctx: BuildContext,
    base_raw: &[RawSpec],
    base_index: Vec<SpecEntry>,
    mode: DiffMode,
) -> Result<DiffOutcome> {
    let changes = diff_raw(ctx.raw(), base_raw);
    info!(
        added = changes.added.len(),
        updated = changes.updated.len(),
        deleted = changes.deleted.len(),
        unchanged = changes.unchanged.len(),
        "raw list compared"
    );

    let selection: Vec<String> = changes
        .added
        .iter()
        .chain(&changes.updated)
        .cloned()
        .collect();

    let built = if selection.is_empty() {
        Vec::new()
    } else {
        let ctx = ctx.with_previous(base_index.clone()).with_selection(selection);
        run_build(&ctx, RunMode::Full, None).await?.index
    };

    let added_urls: HashSet<&str> = changes.added.iter().map(String::as_str).collect();
    let (added, updated): (Vec<_>, Vec<_>) = built
        .into_iter()
        .partition(|e| added_urls.contains(e.url.as_str()));

    let deleted_urls: HashSet<&str> = changes.deleted.iter().map(String::as_str).collect();
    let deleted: Vec<SpecEntry> = base_index
        .iter()
        .filter(|e| deleted_urls.contains(e.url.as_str()))
        .cloned()
        .collect();
    if deleted.len() != deleted_urls.len() {
        warn!(
            missing = deleted_urls.len() - deleted.len(),
            "deleted raw items without a base index entry"
        );
    }

    let index = match mode {
        DiffMode::Diff => None,
        DiffMode::Full => Some(splice(base_index, &added, &updated, &deleted_urls)?),
    };

    Ok(DiffOutcome {
        added,
        updated,
        deleted,
        index,
    })
}

/// Keep unchanged entries, replace updated ones, drop deleted ones and
/// append added ones, then relink: series membership may have changed.
fn splice(
    base: Vec<SpecEntry>,
    added: &[SpecEntry],
    updated: &[SpecEntry],
    deleted: &HashSet<&str>,
) -> Result<Vec<SpecEntry>> {
    let replaced: HashSet<&str> = updated.iter().map(|e| e.url.as_str()).collect();

    let mut index: Vec<SpecEntry> = base
        .into_iter()
        .filter(|e| !deleted.contains(e.url.as_str()) && !replaced.contains(e.url.as_str()))
        .chain(updated.iter().cloned())
        .chain(added.iter().cloned())
        .collect();
    index.sort_by(|a, b| a.url.cmp(&b.url));

    specindex_series::relink(&mut index);
    specindex_series::validate_series(&index)?;
    check_unique(&index)?;
    Ok(index)
}
