//! Application configuration for specindex.
//!
//! User config lives at `~/.specindex/specindex.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecIndexError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "specindex.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".specindex";

// ---------------------------------------------------------------------------
// Config structs (matching specindex.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Build inputs and outputs.
    #[serde(default)]
    pub build: BuildConfig,

    /// Network fetch policy.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// External data source endpoints.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Raw input list (JSON array of locators or objects).
    #[serde(default = "default_input")]
    pub input: String,

    /// Where the final index is written.
    #[serde(default = "default_output")]
    pub output: String,

    /// Directory holding per-step checkpoints.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,

    /// Previous full build, used as last-known-good fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_index: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            checkpoint_dir: default_checkpoint_dir(),
            previous_index: None,
        }
    }
}

fn default_input() -> String {
    "specs.json".into()
}
fn default_output() -> String {
    "index.json".into()
}
fn default_checkpoint_dir() -> String {
    ".specindex/checkpoints".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Maximum number of fetches in flight across all origins.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Pause after a fetch completes before the same origin is hit again.
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// Upper bound on a single fetch, queue wait excluded.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Hosts that share one rate-limit policy.
    #[serde(default = "default_origin_groups")]
    pub origin_groups: Vec<OriginGroup>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            cooldown_ms: default_cooldown(),
            timeout_secs: default_timeout(),
            origin_groups: default_origin_groups(),
        }
    }
}

fn default_concurrency() -> u32 {
    4
}
fn default_cooldown() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    30
}

/// `[[fetch.origin_groups]]` entry.
///
/// A host pattern is either an exact host name or `*.suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginGroup {
    /// Logical origin name.
    pub name: String,
    /// Host patterns folded into this origin.
    pub hosts: Vec<String>,
}

fn default_origin_groups() -> Vec<OriginGroup> {
    vec![
        OriginGroup {
            name: "csswg".into(),
            hosts: vec![
                "drafts.csswg.org".into(),
                "drafts.fxtf.org".into(),
                "drafts.css-houdini.org".into(),
            ],
        },
        OriginGroup {
            name: "github.io".into(),
            hosts: vec!["*.github.io".into()],
        },
    ]
}

/// `[sources]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// W3C API base URL.
    #[serde(default = "default_w3c_api")]
    pub w3c_api: String,

    /// Specref API base URL.
    #[serde(default = "default_specref")]
    pub specref: String,

    /// Recursive tree listing of the web-platform-tests repository.
    #[serde(default = "default_wpt_tree")]
    pub wpt_tree: String,

    /// Name of the env var holding a GitHub token (never store the token itself).
    #[serde(default = "default_github_token_env")]
    pub github_token_env: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            w3c_api: default_w3c_api(),
            specref: default_specref(),
            wpt_tree: default_wpt_tree(),
            github_token_env: default_github_token_env(),
        }
    }
}

fn default_w3c_api() -> String {
    "https://api.w3.org".into()
}
fn default_specref() -> String {
    "https://api.specref.org".into()
}
fn default_wpt_tree() -> String {
    "https://api.github.com/repos/web-platform-tests/wpt/git/trees/HEAD?recursive=1".into()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Global ceiling on in-flight fetches.
    pub concurrency: usize,
    /// Per-origin pause between two fetches.
    pub cooldown: Duration,
    /// Bounded wait for a single fetch.
    pub timeout: Duration,
    /// Host folding rules.
    pub origin_groups: Vec<OriginGroup>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.fetch.concurrency.max(1) as usize,
            cooldown: Duration::from_millis(config.fetch.cooldown_ms),
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            origin_groups: config.fetch.origin_groups.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.specindex/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SpecIndexError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.specindex/specindex.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SpecIndexError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SpecIndexError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SpecIndexError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SpecIndexError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SpecIndexError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the GitHub token from the configured env var, if set and non-empty.
pub fn github_token(config: &AppConfig) -> Option<String> {
    std::env::var(&config.sources.github_token_env)
        .ok()
        .filter(|v| !v.is_empty())
}
