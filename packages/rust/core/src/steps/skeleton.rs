//! Identity assignment: raw list → linked skeleton index.

use std::collections::HashSet;

use specindex_naming::{NameResolution, resolve};
use specindex_shared::{RawSpec, Result, Series, SeriesComposition, SpecEntry, SpecIndexError};
use tracing::info;

use super::BuildStep;
use crate::context::BuildContext;

pub(crate) fn run(step: &BuildStep, ctx: &BuildContext) -> Result<Vec<SpecEntry>> {
    let mut entries = ctx
        .raw()
        .iter()
        .map(|raw| entry_from_raw(raw).map_err(|e| e.in_stage(step.name, Some(&raw.url))))
        .collect::<Result<Vec<_>>>()?;

    check_unique(&entries)?;
    specindex_series::relink(&mut entries);
    specindex_series::validate_series(&entries)?;

    let total = entries.len();
    if let Some(selection) = ctx.selection() {
        entries.retain(|e| selection.contains(&e.url));
    }

    info!(total, selected = entries.len(), "skeleton built");
    Ok(entries)
}

/// Identity of a raw item, overrides applied.
fn identity(raw: &RawSpec) -> Result<NameResolution> {
    let mut id = match (&raw.shortname, &raw.fork_of) {
        (Some(name), Some(base)) => {
            let base = resolve(base, None)?;
            NameResolution {
                shortname: name.clone(),
                ..base
            }
        }
        (Some(name), None) => resolve(name, None)?,
        (None, fork_of) => resolve(&raw.url, fork_of.as_deref())?,
    };

    if let Some(series) = &raw.series {
        if let Some(shortname) = &series.shortname {
            id.series_shortname = shortname.clone();
        }
        if let Some(version) = &series.version {
            id.series_version = Some(version.clone());
        }
    }
    Ok(id)
}

/// Build the skeleton entry of a raw item: identity plus every override
/// that replaces a whole field.
pub fn entry_from_raw(raw: &RawSpec) -> Result<SpecEntry> {
    let id = identity(raw)?;
    let series_composition = raw.series_composition.unwrap_or(if raw.fork_of.is_some() {
        SeriesComposition::Fork
    } else {
        SeriesComposition::Full
    });

    Ok(SpecEntry {
        url: raw.url.clone(),
        series: Series {
            shortname: id.series_shortname,
            version: id.series_version,
            current_specification: id.shortname.clone(),
            previous: None,
            next: None,
        },
        shortname: id.shortname,
        series_composition,
        fork_of: raw.fork_of.clone(),
        forks: vec![],
        force_current: raw.force_current,
        multipage: raw.multipage,
        title: raw.title.clone(),
        short_title: raw.short_title.clone(),
        organization: raw.organization.clone(),
        groups: raw.groups.clone().unwrap_or_default(),
        nightly: None,
        release: None,
        standing: raw.standing,
        categories: raw.categories.clone().unwrap_or_default(),
        tests: raw.tests.clone(),
    })
}

/// URLs and shortnames are unique across the index.
pub(crate) fn check_unique(entries: &[SpecEntry]) -> Result<()> {
    let mut urls = HashSet::new();
    let mut shortnames = HashSet::new();
    for entry in entries {
        if !urls.insert(entry.url.as_str()) {
            return Err(SpecIndexError::validation(format!(
                "duplicate url {}",
                entry.url
            )));
        }
        if !shortnames.insert(entry.shortname.as_str()) {
            return Err(SpecIndexError::validation(format!(
                "duplicate shortname {} ({})",
                entry.shortname, entry.url
            )));
        }
    }
    Ok(())
}
