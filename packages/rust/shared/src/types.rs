//! Core domain types for the specification index.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SpecIndexError;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// How a document relates to the rest of its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesComposition {
    /// A complete level of the series.
    #[default]
    Full,
    /// Only the changes on top of a `full` predecessor.
    Delta,
    /// An alternate track, kept out of the version chain.
    Fork,
}

impl SeriesComposition {
    /// Forks and deltas can never be the current level of a series.
    pub fn is_partial(self) -> bool {
        matches!(self, Self::Delta | Self::Fork)
    }
}

/// Coarse lifecycle classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    #[default]
    Good,
    Pending,
    Discontinued,
}

// ---------------------------------------------------------------------------
// SpecEntry
// ---------------------------------------------------------------------------

/// Series membership of an entry, including its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    /// Shortname shared by all levels of the series.
    pub shortname: String,
    /// Level of this entry within the series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Shortname of the series member considered current.
    pub current_specification: String,
    /// Shortname of the nearest lower level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    /// Shortname of the nearest higher level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// A working group or community attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub url: String,
}

/// The editor's draft (latest, unstable) version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nightly {
    pub url: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default)]
    pub alternate_urls: Vec<String>,
}

/// The published (stable) version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub url: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Where the conformance tests of a document live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    pub repository: String,
    #[serde(default)]
    pub test_paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

/// One document in the built index.
///
/// Identity fields are set once by the skeleton step; every later step only
/// fills in descriptive fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecEntry {
    pub url: String,
    pub shortname: String,
    pub series: Series,
    pub series_composition: SeriesComposition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_of: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forks: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_current: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub multipage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nightly: Option<Nightly>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<Release>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standing: Option<Standing>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestInfo>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SpecEntry {
    /// Version used for ordering; a missing version counts as `"0"`.
    pub fn version_key(&self) -> &str {
        self.series.version.as_deref().unwrap_or("0")
    }

    /// Whether the entry is flagged as discontinued.
    pub fn is_discontinued(&self) -> bool {
        self.standing == Some(Standing::Discontinued)
    }
}

// ---------------------------------------------------------------------------
// RawSpec
// ---------------------------------------------------------------------------

/// Series overrides accepted in the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSeries {
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Partial nightly overrides accepted in the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NightlyOverride {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub alternate_urls: Option<Vec<String>>,
}

/// Partial release overrides accepted in the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseOverride {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// One item of the raw input list, normalized.
///
/// The input accepts either a bare locator (optionally followed by a space
/// and one of `delta`, `current`, `multipage`) or an object with a required
/// `url` and optional overrides. Overrides always win over computed values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSpec {
    pub url: String,
    pub shortname: Option<String>,
    pub series: Option<RawSeries>,
    pub series_composition: Option<SeriesComposition>,
    pub fork_of: Option<String>,
    pub force_current: bool,
    pub multipage: bool,
    pub title: Option<String>,
    pub short_title: Option<String>,
    pub organization: Option<String>,
    pub groups: Option<Vec<Group>>,
    pub nightly: Option<NightlyOverride>,
    pub release: Option<ReleaseOverride>,
    pub standing: Option<Standing>,
    pub categories: Option<Vec<String>>,
    pub tests: Option<TestInfo>,
}

impl RawSpec {
    /// A raw item with only a locator.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse the compact `"<url> [modifier]"` form.
    pub fn parse_compact(input: &str) -> Result<Self, SpecIndexError> {
        let mut parts = input.split(' ').filter(|p| !p.is_empty());
        let url = parts
            .next()
            .ok_or_else(|| SpecIndexError::validation("empty raw input item"))?;
        let mut spec = Self::from_url(url);

        match parts.next() {
            None => {}
            Some("delta") => spec.series_composition = Some(SeriesComposition::Delta),
            Some("current") => spec.force_current = true,
            Some("multipage") => spec.multipage = true,
            Some(other) => {
                return Err(SpecIndexError::validation(format!(
                    "unknown modifier {other:?} in {input:?}"
                )));
            }
        }

        if parts.next().is_some() {
            return Err(SpecIndexError::validation(format!(
                "at most one modifier is allowed in {input:?}"
            )));
        }

        Ok(spec)
    }
}

/// Wire shape of a raw input item.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpecInput {
    Compact(String),
    Detailed(RawSpecFields),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawSpecFields {
    url: String,
    #[serde(default)]
    shortname: Option<String>,
    #[serde(default)]
    series: Option<RawSeries>,
    #[serde(default)]
    series_composition: Option<SeriesComposition>,
    #[serde(default)]
    fork_of: Option<String>,
    #[serde(default)]
    force_current: bool,
    #[serde(default)]
    multipage: bool,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    short_title: Option<String>,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    groups: Option<Vec<Group>>,
    #[serde(default)]
    nightly: Option<NightlyOverride>,
    #[serde(default)]
    release: Option<ReleaseOverride>,
    #[serde(default)]
    standing: Option<Standing>,
    #[serde(default)]
    categories: Option<Vec<String>>,
    #[serde(default)]
    tests: Option<TestInfo>,
}

impl<'de> Deserialize<'de> for RawSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawSpecInput::deserialize(deserializer)?
            .into_raw_spec()
            .map_err(serde::de::Error::custom)
    }
}

impl RawSpecInput {
    fn into_raw_spec(self) -> Result<RawSpec, SpecIndexError> {
        match self {
            Self::Compact(s) => RawSpec::parse_compact(&s),
            Self::Detailed(f) => {
                if f.url.is_empty() {
                    return Err(SpecIndexError::validation("raw input item has an empty url"));
                }
                Ok(RawSpec {
                    url: f.url,
                    shortname: f.shortname,
                    series: f.series,
                    series_composition: f.series_composition,
                    fork_of: f.fork_of,
                    force_current: f.force_current,
                    multipage: f.multipage,
                    title: f.title,
                    short_title: f.short_title,
                    organization: f.organization,
                    groups: f.groups,
                    nightly: f.nightly,
                    release: f.release,
                    standing: f.standing,
                    categories: f.categories,
                    tests: f.tests,
                })
            }
        }
    }
}
