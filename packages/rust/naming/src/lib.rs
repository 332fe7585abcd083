//! Deterministic identity derivation for specification documents.
//!
//! [`resolve`] turns a canonical locator (usually a URL) into a shortname,
//! a series shortname and an optional series version. It is pure: the same
//! input always yields the same output, and no I/O is performed.
//!
//! Resolution runs in two phases:
//! 1. [`extract_name`] — an ordered cascade of locator patterns produces an
//!    atomic name, which is then checked against the allowed character set.
//! 2. Series decomposition — a trailing level is split off the name (unless
//!    the series keeps its digits) and legacy prefixes are modernized.

mod patterns;
mod series;

use std::sync::LazyLock;

use regex::Regex;
use specindex_shared::{NameErrorKind, Result, SpecIndexError};
use tracing::trace;

/// ASCII letters, digits, underscores and hyphens, with at most one dot that
/// must be part of a trailing fractional level (`-1.2`, `-v1.2`).
static VALID_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_-]+|[A-Za-z0-9_-]*-v?[0-9]+\.[0-9]+)$").unwrap()
});

/// Identity derived from a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolution {
    /// Unique name of the document.
    pub shortname: String,
    /// Name shared by all levels of the series.
    pub series_shortname: String,
    /// Level of the document within its series, if any.
    pub series_version: Option<String>,
}

/// Extract and validate the atomic name of a locator.
pub fn extract_name(locator: &str) -> Result<String> {
    let (label, name) =
        patterns::extract(locator).ok_or_else(|| SpecIndexError::NameResolution {
            locator: locator.to_string(),
            kind: NameErrorKind::Unparseable,
        })?;

    trace!(locator, pattern = label, name = %name, "locator pattern matched");

    if !VALID_NAME.is_match(&name) {
        return Err(SpecIndexError::NameResolution {
            locator: locator.to_string(),
            kind: NameErrorKind::InvalidCharacters,
        });
    }

    Ok(name)
}

/// Resolve a locator into a shortname and series information.
///
/// When `fork_of` is given, the document is a fork of that shortname: its own
/// shortname becomes `<fork_of>-fork-<name>` and its series is derived from
/// `fork_of`.
pub fn resolve(locator: &str, fork_of: Option<&str>) -> Result<NameResolution> {
    let name = extract_name(locator)?;

    let (shortname, basename) = match fork_of {
        Some(base) => (format!("{base}-fork-{name}"), base.to_string()),
        None => (name.clone(), name),
    };

    let (series, version) = series::split_level(&basename, locator);

    Ok(NameResolution {
        shortname,
        series_shortname: series::modernize(&series),
        series_version: version,
    })
}
