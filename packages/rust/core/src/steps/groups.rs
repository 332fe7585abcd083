use specindex_shared::{Group, Result, SpecEntry};

use super::{BuildStep, enrich_each};
use crate::context::BuildContext;

pub(crate) async fn run(
    step: &BuildStep,
    index: Vec<SpecEntry>,
    ctx: &BuildContext,
) -> Result<Vec<SpecEntry>> {
    let mut index = enrich_each(step, index, ctx, restore, move |mut entry| async move {
        let has_groups = overridden_groups(ctx, &entry).is_some() || !entry.groups.is_empty();
        if entry.organization.is_some() && has_groups {
            return Ok(entry);
        }
        let affiliation = ctx.collaborators().groups.affiliation(&entry).await?;
        if entry.organization.is_none() {
            entry.organization = Some(affiliation.organization);
        }
        if !has_groups {
            entry.groups = affiliation.groups;
        }
        Ok(entry)
    })
    .await?;

    // An explicit list, even an empty one, beats anything computed or restored.
    for entry in &mut index {
        if let Some(groups) = overridden_groups(ctx, entry) {
            entry.groups = groups.to_vec();
        }
    }
    Ok(index)
}

fn overridden_groups<'a>(ctx: &'a BuildContext, entry: &SpecEntry) -> Option<&'a [Group]> {
    ctx.raw_for(&entry.url).and_then(|raw| raw.groups.as_deref())
}

fn restore(entry: &mut SpecEntry, previous: &SpecEntry) {
    if entry.organization.is_none() {
        entry.organization = previous.organization.clone();
    }
    if entry.groups.is_empty() {
        entry.groups = previous.groups.clone();
    }
}
