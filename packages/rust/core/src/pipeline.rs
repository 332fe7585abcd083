//! Step-by-step index build: raw list → skeleton → … → finalized index.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use uuid::Uuid;

use specindex_shared::{Result, SpecEntry, SpecIndexError};

use crate::checkpoint::CheckpointStore;
use crate::context::BuildContext;
use crate::steps::{BuildStep, STEPS, StepKind};

/// Which steps a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Every step, starting from the raw list.
    Full,
    /// The given step and all later ones, starting from the checkpoint of
    /// the step before it.
    From(StepKind),
    /// Only the given step, starting from the checkpoint of the step before it.
    Only(StepKind),
}

impl RunMode {
    pub fn steps(self) -> &'static [BuildStep] {
        match self {
            Self::Full => &STEPS,
            Self::From(kind) => &STEPS[kind.step().position..],
            Self::Only(kind) => {
                let position = kind.step().position;
                &STEPS[position..=position]
            }
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::From(kind) => write!(f, "from {kind}"),
            Self::Only(kind) => write!(f, "only {kind}"),
        }
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct BuildOutcome {
    pub run_id: Uuid,
    pub index: Vec<SpecEntry>,
    /// Names of the steps that ran, in order.
    pub steps: Vec<&'static str>,
    pub elapsed: Duration,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a step starts, with the number of items it will see.
    fn stage_started(&self, step: &BuildStep, items: usize);
    /// Called when a step is done with one item.
    fn item_done(&self, stage: &str, item: &str);
    /// Called once a step's output has been checkpointed.
    fn stage_finished(&self, step: &BuildStep, items: usize);
    /// Called when the run completes.
    fn done(&self, outcome: &BuildOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _step: &BuildStep, _items: usize) {}
    fn item_done(&self, _stage: &str, _item: &str) {}
    fn stage_finished(&self, _step: &BuildStep, _items: usize) {}
    fn done(&self, _outcome: &BuildOutcome) {}
}

/// Run the build steps selected by `mode`.
///
/// Steps run one after the other; each sees the complete output of the
/// previous one. When `checkpoints` is set, every step's output is saved
/// before the next step starts, and partial runs read their input from it.
#[instrument(skip_all, fields(mode = %mode))]
pub async fn run_build(
    ctx: &BuildContext,
    mode: RunMode,
    checkpoints: Option<&CheckpointStore>,
) -> Result<BuildOutcome> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    let steps = mode.steps();

    let mut index = match steps[0].predecessor() {
        None => Vec::new(),
        Some(previous) => {
            let store = checkpoints.ok_or_else(|| {
                SpecIndexError::validation(format!(
                    "starting at step {} needs the {} checkpoint, but no checkpoint directory is set",
                    steps[0].name, previous.name
                ))
            })?;
            store.load(previous)?
        }
    };

    info!(%run_id, steps = steps.len(), raw = ctx.raw().len(), "starting build");

    let mut ran = Vec::with_capacity(steps.len());
    for step in steps {
        let items = match step.kind {
            StepKind::Skeleton => ctx.raw().len(),
            _ => index.len(),
        };
        ctx.progress().stage_started(step, items);

        index = step.enrich(index, ctx).await?;
        if let Some(store) = checkpoints {
            store.save(run_id, step, &index)?;
        }

        ctx.progress().stage_finished(step, index.len());
        info!(step = step.name, items = index.len(), "step complete");
        ran.push(step.name);
    }

    let outcome = BuildOutcome {
        run_id,
        index,
        steps: ran,
        elapsed: start.elapsed(),
    };
    ctx.progress().done(&outcome);

    info!(
        %run_id,
        items = outcome.index.len(),
        elapsed_ms = outcome.elapsed.as_millis(),
        "build complete"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::collaborators::testing::StubSources;
    use crate::index_file::render_index;
    use specindex_shared::{RawSpec, Standing};

    const GRID_1: &str = "https://drafts.csswg.org/css-grid-1/";
    const GRID_2: &str = "https://drafts.csswg.org/css-grid-2/";
    const OLD: &str = "https://www.w3.org/TR/old-api/";

    fn raw() -> Vec<RawSpec> {
        [GRID_2, OLD, GRID_1].into_iter().map(RawSpec::from_url).collect()
    }

    async fn build(stub: StubSources, previous: Vec<SpecEntry>) -> Result<BuildOutcome> {
        let (_, collaborators) = stub.into_collaborators();
        let ctx = BuildContext::new(raw(), collaborators).with_previous(previous);
        run_build(&ctx, RunMode::Full, None).await
    }

    fn temp_store() -> CheckpointStore {
        let dir = std::env::temp_dir().join(format!("specindex-pipeline-test-{}", Uuid::now_v7()));
        CheckpointStore::open(dir).unwrap()
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressReporter for Recorder {
        fn stage_started(&self, step: &BuildStep, items: usize) {
            self.0.lock().unwrap().push(format!("start {} {items}", step.name));
        }
        fn item_done(&self, _stage: &str, _item: &str) {}
        fn stage_finished(&self, step: &BuildStep, items: usize) {
            self.0.lock().unwrap().push(format!("end {} {items}", step.name));
        }
        fn done(&self, outcome: &BuildOutcome) {
            self.0.lock().unwrap().push(format!("done {}", outcome.index.len()));
        }
    }

    #[tokio::test]
    async fn full_build_fills_and_sorts_every_entry() {
        let outcome = build(StubSources::default(), vec![]).await.unwrap();
        assert_eq!(outcome.steps.len(), STEPS.len());

        let urls: Vec<_> = outcome.index.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec![GRID_1, GRID_2, OLD]);

        let grid2 = &outcome.index[1];
        assert_eq!(grid2.series.previous.as_deref(), Some("css-grid-1"));
        assert_eq!(grid2.series.current_specification, "css-grid-2");
        assert_eq!(grid2.organization.as_deref(), Some("W3C"));
        let nightly = grid2.nightly.as_ref().unwrap();
        assert_eq!(nightly.filename.as_deref(), Some("index.html"));
        assert_eq!(nightly.repository.as_deref(), Some("https://github.com/test/css-grid-2"));
        assert_eq!(grid2.categories, vec!["browser"]);
        assert_eq!(grid2.tests.as_ref().unwrap().test_paths, vec!["css-grid"]);
    }

    #[tokio::test]
    async fn explicit_empty_overrides_survive_the_build() {
        let url = "https://www.w3.org/TR/widgets/";
        let raw = RawSpec {
            organization: Some("Acme".into()),
            groups: Some(vec![]),
            categories: Some(vec![]),
            ..RawSpec::from_url(url)
        };
        let (_, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(vec![raw], collaborators);

        let outcome = run_build(&ctx, RunMode::Full, None).await.unwrap();
        let widgets = &outcome.index[0];
        assert_eq!(widgets.organization.as_deref(), Some("Acme"));
        assert!(widgets.groups.is_empty());
        assert!(widgets.categories.is_empty());
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_bytes() {
        let first = build(StubSources::default(), vec![]).await.unwrap();
        let second = build(StubSources::default(), first.index.clone()).await.unwrap();
        assert_eq!(
            render_index(&first.index).unwrap(),
            render_index(&second.index).unwrap()
        );
    }

    #[tokio::test]
    async fn discontinued_entry_keeps_previous_data_on_fetch_failure() {
        let mut previous = build(StubSources::default(), vec![]).await.unwrap().index;
        let old = previous.iter_mut().find(|e| e.url == OLD).unwrap();
        old.standing = Some(Standing::Discontinued);
        old.title = Some("Old API".into());
        let expected = old.clone();

        let outcome = build(StubSources::default().failing(OLD), previous).await.unwrap();
        let old = outcome.index.iter().find(|e| e.url == OLD).unwrap();
        assert_eq!(old, &expected);
    }

    #[tokio::test]
    async fn fetch_failure_on_live_entry_aborts() {
        let previous = build(StubSources::default(), vec![]).await.unwrap().index;
        let err = build(StubSources::default().failing(OLD), previous)
            .await
            .unwrap_err();
        assert!(err.is_fetch());
        assert!(err.to_string().starts_with(&format!("stage info failed on {OLD}")));
    }

    #[tokio::test]
    async fn identity_redirect_aborts() {
        let err = build(StubSources::default().redirect("old-api", "new-api"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            SpecIndexError::IdentityRedirect { item, .. } if item == "old-api"
        ));
    }

    #[tokio::test]
    async fn resumes_from_checkpoint() {
        let store = temp_store();
        let (_, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(raw(), collaborators);
        let full = run_build(&ctx, RunMode::Full, Some(&store)).await.unwrap();
        assert_eq!(store.manifest().unwrap().unwrap().steps.len(), STEPS.len());

        let (stub, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(raw(), collaborators);
        let resumed = run_build(&ctx, RunMode::From(StepKind::Tests), Some(&store))
            .await
            .unwrap();
        assert_eq!(resumed.steps, vec!["tests", "finalize"]);
        assert_eq!(resumed.index, full.index);
        // Only the test-path resolver runs, once per entry.
        assert_eq!(stub.calls(), full.index.len());

        let only = run_build(&ctx, RunMode::Only(StepKind::Finalize), Some(&store))
            .await
            .unwrap();
        assert_eq!(only.steps, vec!["finalize"]);
        assert_eq!(only.index, full.index);

        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[tokio::test]
    async fn partial_run_needs_a_checkpoint_store() {
        let (_, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(raw(), collaborators);
        let err = run_build(&ctx, RunMode::Only(StepKind::Groups), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("needs the info checkpoint"));
    }

    #[tokio::test]
    async fn progress_follows_step_barriers() {
        let recorder = Arc::new(Recorder::default());
        let (_, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(raw(), collaborators).with_progress(recorder.clone());
        run_build(&ctx, RunMode::Full, None).await.unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(events.first().map(String::as_str), Some("start skeleton 3"));
        assert_eq!(events[1], "end skeleton 3");
        assert_eq!(events.last().map(String::as_str), Some("done 3"));
        assert_eq!(events.len(), STEPS.len() * 2 + 1);
    }

    #[test]
    fn run_modes_select_steps() {
        assert_eq!(RunMode::Full.steps().len(), 7);
        let names: Vec<_> = RunMode::From(StepKind::Filenames)
            .steps()
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["filenames", "tests", "finalize"]);
        assert_eq!(RunMode::Only(StepKind::Info).steps()[0].name, "info");
        assert_eq!(RunMode::From(StepKind::Info).to_string(), "from info");
    }
}
