use specindex_shared::{Result, SpecEntry};

use super::{BuildStep, enrich_each};
use crate::context::BuildContext;

pub(crate) async fn run(
    step: &BuildStep,
    index: Vec<SpecEntry>,
    ctx: &BuildContext,
) -> Result<Vec<SpecEntry>> {
    enrich_each(step, index, ctx, restore, move |mut entry| async move {
        let needed = entry.nightly.as_ref().is_some_and(|n| n.repository.is_none());
        if !needed {
            return Ok(entry);
        }
        let repository = ctx.collaborators().repository.repository(&entry).await?;
        if let Some(nightly) = entry.nightly.as_mut() {
            nightly.repository = repository;
        }
        Ok(entry)
    })
    .await
}

fn restore(entry: &mut SpecEntry, previous: &SpecEntry) {
    let known = previous.nightly.as_ref().and_then(|n| n.repository.clone());
    if let Some(nightly) = entry.nightly.as_mut() {
        if nightly.repository.is_none() {
            nightly.repository = known;
        }
    }
}
