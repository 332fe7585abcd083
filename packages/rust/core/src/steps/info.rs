//! Title, status, nightly/release versions, standing and short title.

use std::sync::LazyLock;

use regex::Regex;
use specindex_shared::{
    Nightly, NightlyOverride, Release, ReleaseOverride, Result, SpecEntry, SpecIndexError,
    Standing,
};

use super::{BuildStep, enrich_each};
use crate::collaborators::SpecInfo;
use crate::context::BuildContext;

/// Trailing level designation: `Level 4`, `Module Level 4`, `- Level 3`,
/// `Version 1.1`.
static LEVEL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*(?:[-–,]\s*)?(?:Module\s+)?(?:Level|Version)\s+(\d+(?:\.\d+)?)$")
        .unwrap()
});

const NOISE_SUFFIXES: &[&str] = &[" Module", " Specification", " Standard"];

/// Statuses that mark a document as no longer developed.
const DISCONTINUED_STATUSES: &[&str] = &["Discontinued Draft", "Retired"];

pub(crate) async fn run(
    step: &BuildStep,
    index: Vec<SpecEntry>,
    ctx: &BuildContext,
) -> Result<Vec<SpecEntry>> {
    enrich_each(step, index, ctx, restore, move |mut entry| async move {
        let raw = ctx.raw_for(&entry.url);
        let nightly_override = raw.and_then(|r| r.nightly.as_ref());
        let release_override = raw.and_then(|r| r.release.as_ref());

        let covered = entry.title.is_some()
            && nightly_override.is_some_and(|n| n.url.is_some() && n.status.is_some());
        let info = if covered {
            None
        } else {
            Some(ctx.collaborators().info.info(&entry).await?)
        };

        if let Some(info) = &info {
            if let Some(canonical) = info.canonical.as_deref() {
                if canonical != entry.shortname {
                    return Err(SpecIndexError::IdentityRedirect {
                        item: entry.shortname.clone(),
                        reported: canonical.to_string(),
                        source_name: info.source.to_string(),
                    });
                }
            }
        }

        apply(&mut entry, info, nightly_override, release_override);
        Ok(entry)
    })
    .await
}

fn apply(
    entry: &mut SpecEntry,
    info: Option<SpecInfo>,
    nightly_override: Option<&NightlyOverride>,
    release_override: Option<&ReleaseOverride>,
) {
    let (title, status, nightly, release) = match info {
        Some(i) => (Some(i.title), Some(i.status), Some(i.nightly), i.release),
        None => (None, None, None, None),
    };

    if entry.title.is_none() {
        entry.title = title;
    }
    entry.nightly = merge_nightly(nightly, nightly_override);
    entry.release = merge_release(release, release_override);

    if entry.standing.is_none() {
        let status = status.or_else(|| entry.nightly.as_ref().map(|n| n.status.clone()));
        entry.standing = status.as_deref().map(standing_for_status);
    }
    if entry.short_title.is_none() {
        entry.short_title = entry.title.as_deref().map(short_title);
    }
}

fn restore(entry: &mut SpecEntry, previous: &SpecEntry) {
    if entry.title.is_none() {
        entry.title = previous.title.clone();
    }
    if entry.short_title.is_none() {
        entry.short_title = previous.short_title.clone();
    }
    if entry.nightly.is_none() {
        entry.nightly = previous.nightly.clone();
    }
    if entry.release.is_none() {
        entry.release = previous.release.clone();
    }
    if entry.standing.is_none() {
        entry.standing = previous.standing;
    }
}

/// Apply partial overrides on top of fetched nightly info. Without fetched
/// info, the overrides must provide at least a URL and a status.
fn merge_nightly(base: Option<Nightly>, over: Option<&NightlyOverride>) -> Option<Nightly> {
    let Some(over) = over else {
        return base;
    };
    let mut nightly = match base {
        Some(nightly) => nightly,
        None => Nightly {
            url: over.url.clone()?,
            status: over.status.clone()?,
            ..Nightly::default()
        },
    };
    if let Some(url) = &over.url {
        nightly.url = url.clone();
    }
    if let Some(status) = &over.status {
        nightly.status = status.clone();
    }
    if let Some(filename) = &over.filename {
        nightly.filename = Some(filename.clone());
    }
    if let Some(repository) = &over.repository {
        nightly.repository = Some(repository.clone());
    }
    if let Some(alternate_urls) = &over.alternate_urls {
        nightly.alternate_urls = alternate_urls.clone();
    }
    Some(nightly)
}

fn merge_release(base: Option<Release>, over: Option<&ReleaseOverride>) -> Option<Release> {
    let Some(over) = over else {
        return base;
    };
    let mut release = match base {
        Some(release) => release,
        None => Release {
            url: over.url.clone()?,
            status: over.status.clone()?,
            filename: None,
        },
    };
    if let Some(url) = &over.url {
        release.url = url.clone();
    }
    if let Some(status) = &over.status {
        release.status = status.clone();
    }
    if let Some(filename) = &over.filename {
        release.filename = Some(filename.clone());
    }
    Some(release)
}

/// Standing implied by a maturity status.
pub fn standing_for_status(status: &str) -> Standing {
    if DISCONTINUED_STATUSES.contains(&status) {
        Standing::Discontinued
    } else {
        Standing::Good
    }
}

/// Compact form of a document title.
///
/// `CSS Color Module Level 4` → `CSS Color 4`, `Fetch Standard` → `Fetch`,
/// `Web Authentication: An API for ... - Level 3` → `Web Authentication 3`.
pub fn short_title(title: &str) -> String {
    let title = title.trim();
    let (base, level) = match LEVEL_SUFFIX.captures(title) {
        Some(c) => (c.get(1).map_or("", |m| m.as_str()), c.get(2).map(|m| m.as_str())),
        None => (title, None),
    };

    let mut base = match base.split_once(':') {
        Some((head, _)) if !head.trim().is_empty() => head.trim(),
        _ => base.trim(),
    };
    for suffix in NOISE_SUFFIXES {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped.trim_end();
        }
    }

    match level {
        Some(level) => format!("{base} {level}"),
        None => base.to_string(),
    }
}
