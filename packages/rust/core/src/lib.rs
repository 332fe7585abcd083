//! Index build engine for specindex.
//!
//! This crate ties together name resolution, series linking and the fetch
//! queue into the step-by-step build (`run_build`) and the incremental
//! rebuild (`diff`).

pub mod checkpoint;
pub mod collaborators;
pub mod context;
pub mod diff;
pub mod index_file;
pub mod pipeline;
pub mod steps;

pub use checkpoint::{CheckpointManifest, CheckpointRecord, CheckpointStore};
pub use collaborators::Collaborators;
pub use context::BuildContext;
pub use diff::{DiffMode, DiffOutcome, RawDiff, diff, diff_raw};
pub use pipeline::{BuildOutcome, ProgressReporter, RunMode, SilentProgress, run_build};
pub use steps::{BuildStep, STEPS, StepKind};
