//! Series graph algorithms.
//!
//! Entries sharing a `series.shortname` form a series, ordered by version.
//! Versions are compared as plain strings (a missing version counts as
//! `"0"`), so `"10"` sorts before `"9"`. Everything here is derived from a
//! full snapshot of the index and never maintained incrementally.

use std::collections::{BTreeMap, HashMap};

use specindex_shared::{Result, SeriesComposition, SpecEntry, SpecIndexError};
use tracing::{debug, instrument};

/// Neighbours of an entry within its series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// The current level of a series as seen from one of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentLevel {
    pub current_specification: String,
    pub force_current: bool,
}

fn same_series<'a>(
    entry: &'a SpecEntry,
    snapshot: &'a [SpecEntry],
) -> impl Iterator<Item = &'a SpecEntry> + 'a {
    snapshot
        .iter()
        .filter(move |s| s.series.shortname == entry.series.shortname)
}

/// Compute the previous and next levels of `entry` within `snapshot`.
///
/// Forks are excluded from the version chain and get no links.
pub fn link(entry: &SpecEntry, snapshot: &[SpecEntry]) -> Links {
    link_among(entry, same_series(entry, snapshot))
}

fn link_among<'a>(entry: &SpecEntry, members: impl Iterator<Item = &'a SpecEntry>) -> Links {
    if entry.series_composition == SeriesComposition::Fork {
        return Links::default();
    }

    let key = entry.version_key();
    let mut previous: Option<&SpecEntry> = None;
    let mut next: Option<&SpecEntry> = None;

    for member in members {
        if member.shortname == entry.shortname
            || member.series_composition == SeriesComposition::Fork
        {
            continue;
        }
        let version = member.version_key();
        if version < key && previous.is_none_or(|p| version > p.version_key()) {
            previous = Some(member);
        } else if version > key && next.is_none_or(|n| version < n.version_key()) {
            next = Some(member);
        }
    }

    Links {
        previous: previous.map(|p| p.shortname.clone()),
        next: next.map(|n| n.shortname.clone()),
    }
}

/// Determine the current level of the series `entry` belongs to.
///
/// Folds over the series starting from `entry`. A competitor replaces the
/// candidate when it is neither a fork nor a delta, the candidate is not
/// force-flagged, and the competitor is force-flagged, or the candidate is a
/// fork/delta, or the competitor has a greater version.
pub fn current_level(entry: &SpecEntry, snapshot: &[SpecEntry]) -> CurrentLevel {
    current_among(entry, same_series(entry, snapshot))
}

fn current_among<'a>(
    entry: &'a SpecEntry,
    members: impl Iterator<Item = &'a SpecEntry>,
) -> CurrentLevel {
    let current = members.fold(entry, |candidate, competitor| {
        let replaces = !competitor.series_composition.is_partial()
            && !candidate.force_current
            && (competitor.force_current
                || candidate.series_composition.is_partial()
                || competitor.version_key() > candidate.version_key());
        if replaces { competitor } else { candidate }
    });

    CurrentLevel {
        current_specification: current.shortname.clone(),
        force_current: current.force_current,
    }
}

/// Check the series invariants of a snapshot.
///
/// - a delta must have a `full` predecessor (lower version) in its series;
/// - at most one entry per series may be force-flagged current;
/// - a fork must point at an existing shortname.
pub fn validate_series(snapshot: &[SpecEntry]) -> Result<()> {
    let mut forced: HashMap<&str, &str> = HashMap::new();

    for entry in snapshot {
        if entry.series_composition == SeriesComposition::Delta {
            let has_full_predecessor = same_series(entry, snapshot).any(|s| {
                s.series_composition == SeriesComposition::Full
                    && s.version_key() < entry.version_key()
            });
            if !has_full_predecessor {
                return Err(SpecIndexError::graph(
                    &entry.series.shortname,
                    format!("delta {} has no full predecessor", entry.shortname),
                ));
            }
        }

        if entry.force_current {
            if let Some(other) = forced.insert(&entry.series.shortname, &entry.shortname) {
                return Err(SpecIndexError::graph(
                    &entry.series.shortname,
                    format!(
                        "both {other} and {} are flagged as current",
                        entry.shortname
                    ),
                ));
            }
        }

        if let Some(base) = &entry.fork_of {
            if !snapshot.iter().any(|s| &s.shortname == base) {
                return Err(SpecIndexError::graph(
                    &entry.series.shortname,
                    format!("{} is a fork of unknown {base}", entry.shortname),
                ));
            }
        }
    }

    Ok(())
}

/// Recompute previous/next links, current level and fork lists for every
/// entry of `snapshot`.
#[instrument(skip_all, fields(entries = snapshot.len()))]
pub fn relink(snapshot: &mut [SpecEntry]) {
    let mut by_series: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, entry) in snapshot.iter().enumerate() {
        by_series
            .entry(entry.series.shortname.as_str())
            .or_default()
            .push(i);
    }

    let view: &[SpecEntry] = snapshot;
    let computed: Vec<(Links, CurrentLevel)> = view
        .iter()
        .map(|entry| {
            let members = &by_series[entry.series.shortname.as_str()];
            (
                link_among(entry, members.iter().map(|&i| &view[i])),
                current_among(entry, members.iter().map(|&i| &view[i])),
            )
        })
        .collect();

    let mut forks: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in view {
        if let Some(base) = &entry.fork_of {
            forks
                .entry(base.clone())
                .or_default()
                .push(entry.shortname.clone());
        }
    }
    let series_count = by_series.len();

    for (entry, (links, current)) in snapshot.iter_mut().zip(computed) {
        entry.series.previous = links.previous;
        entry.series.next = links.next;
        entry.series.current_specification = current.current_specification;
        entry.forks = forks.remove(&entry.shortname).unwrap_or_default();
        entry.forks.sort();
    }

    debug!(series = series_count, "series links recomputed");
}
