//! The fixed, ordered list of build steps.
//!
//! Every step takes the whole index produced by the previous one and
//! returns a new index. Within a step, entries are processed concurrently;
//! the fetch queue bounds the actual network parallelism.

mod filenames;
mod finalize;
mod groups;
mod info;
mod repository;
mod skeleton;
mod test_paths;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use futures::future::join_all;
use specindex_shared::{Result, SpecEntry, SpecIndexError};
use tracing::{instrument, warn};

use crate::context::BuildContext;

pub use info::{short_title, standing_for_status};
pub use skeleton::entry_from_raw;
pub(crate) use skeleton::check_unique;

/// Discriminants follow step positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Skeleton,
    Info,
    Groups,
    Repository,
    Filenames,
    Tests,
    Finalize,
}

/// Immutable step descriptor.
#[derive(Debug)]
pub struct BuildStep {
    pub kind: StepKind,
    pub name: &'static str,
    pub position: usize,
    pub description: &'static str,
}

/// All steps, in execution order.
pub static STEPS: [BuildStep; 7] = [
    BuildStep {
        kind: StepKind::Skeleton,
        name: "skeleton",
        position: 0,
        description: "derive identities from the raw list and link series",
    },
    BuildStep {
        kind: StepKind::Info,
        name: "info",
        position: 1,
        description: "title, status, nightly and release versions",
    },
    BuildStep {
        kind: StepKind::Groups,
        name: "groups",
        position: 2,
        description: "organization and groups",
    },
    BuildStep {
        kind: StepKind::Repository,
        name: "repository",
        position: 3,
        description: "source repository of the editor's draft",
    },
    BuildStep {
        kind: StepKind::Filenames,
        name: "filenames",
        position: 4,
        description: "filenames of the nightly and release versions",
    },
    BuildStep {
        kind: StepKind::Tests,
        name: "tests",
        position: 5,
        description: "conformance test locations",
    },
    BuildStep {
        kind: StepKind::Finalize,
        name: "finalize",
        position: 6,
        description: "defaults, relink, sort and validate",
    },
];

impl StepKind {
    pub fn step(self) -> &'static BuildStep {
        &STEPS[self as usize]
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step().name)
    }
}

impl FromStr for StepKind {
    type Err = SpecIndexError;

    fn from_str(s: &str) -> Result<Self> {
        STEPS.iter().find(|step| step.name == s).map(|step| step.kind).ok_or_else(|| {
            let known: Vec<&str> = STEPS.iter().map(|step| step.name).collect();
            SpecIndexError::validation(format!(
                "unknown step {s:?}, expected one of: {}",
                known.join(", ")
            ))
        })
    }
}

impl BuildStep {
    /// Run this step over `index`.
    ///
    /// Errors come back tagged with the step name.
    #[instrument(skip_all, fields(step = self.name, items = index.len()))]
    pub async fn enrich(&self, index: Vec<SpecEntry>, ctx: &BuildContext) -> Result<Vec<SpecEntry>> {
        let result = match self.kind {
            StepKind::Skeleton => skeleton::run(self, ctx),
            StepKind::Info => info::run(self, index, ctx).await,
            StepKind::Groups => groups::run(self, index, ctx).await,
            StepKind::Repository => repository::run(self, index, ctx).await,
            StepKind::Filenames => filenames::run(self, index, ctx).await,
            StepKind::Tests => test_paths::run(self, index, ctx).await,
            StepKind::Finalize => finalize::run(self, index, ctx),
        };
        result.map_err(|e| e.in_stage(self.name, None))
    }

    /// The step that feeds this one, if any.
    pub fn predecessor(&self) -> Option<&'static BuildStep> {
        self.position.checked_sub(1).map(|p| &STEPS[p])
    }
}

// ---------------------------------------------------------------------------
// Per-entry execution with fallback
// ---------------------------------------------------------------------------

/// Copies the fields a step owns from a previous entry.
pub(crate) type Restore = fn(&mut SpecEntry, &SpecEntry);

/// Run `work` on every entry concurrently.
///
/// A fetch failure on an entry that is, or previously was, discontinued is
/// absorbed by restoring the step's fields from the previous index. Any
/// other failure aborts the step, tagged with the entry URL.
pub(crate) async fn enrich_each<F, Fut>(
    step: &BuildStep,
    index: Vec<SpecEntry>,
    ctx: &BuildContext,
    restore: Restore,
    work: F,
) -> Result<Vec<SpecEntry>>
where
    F: Fn(SpecEntry) -> Fut,
    Fut: Future<Output = Result<SpecEntry>>,
{
    let results = join_all(index.iter().map(|entry| {
        let pending = work(entry.clone());
        async move {
            let result = pending.await;
            ctx.progress().item_done(step.name, &entry.shortname);
            result
        }
    }))
    .await;

    index
        .into_iter()
        .zip(results)
        .map(|(original, result)| match result {
            Ok(entry) => Ok(entry),
            Err(err) if err.is_fetch() => fall_back(step, original, err, ctx, restore),
            Err(err) => Err(err.in_stage(step.name, Some(&original.url))),
        })
        .collect()
}

fn fall_back(
    step: &BuildStep,
    mut entry: SpecEntry,
    err: SpecIndexError,
    ctx: &BuildContext,
    restore: Restore,
) -> Result<SpecEntry> {
    let previous = ctx.previous_for(&entry);
    let discontinued =
        entry.is_discontinued() || previous.is_some_and(SpecEntry::is_discontinued);

    match previous {
        Some(previous) if discontinued => {
            warn!(
                step = step.name,
                url = %entry.url,
                error = %err,
                "fetch failed for discontinued entry, reusing previous data"
            );
            restore(&mut entry, previous);
            Ok(entry)
        }
        _ => Err(err.in_stage(step.name, Some(&entry.url))),
    }
}
