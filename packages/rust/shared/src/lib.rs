//! Shared types, error model, and configuration for specindex.
//!
//! This crate is the foundation depended on by all other specindex crates.
//! It provides:
//! - [`SpecIndexError`] — the unified error type
//! - Domain types ([`SpecEntry`], [`Series`], [`RawSpec`], ...)
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, FetchConfig, FetchSettings, OriginGroup, SourcesConfig, config_dir,
    config_file_path, github_token, init_config, load_config, load_config_from,
};
pub use error::{FetchErrorKind, NameErrorKind, Result, SpecIndexError};
pub use types::{
    Group, Nightly, NightlyOverride, RawSeries, RawSpec, Release, ReleaseOverride, Series,
    SeriesComposition, SpecEntry, Standing, TestInfo,
};
