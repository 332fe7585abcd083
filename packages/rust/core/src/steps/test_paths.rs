use specindex_shared::{Result, SpecEntry};

use super::{BuildStep, enrich_each};
use crate::context::BuildContext;

pub(crate) async fn run(
    step: &BuildStep,
    index: Vec<SpecEntry>,
    ctx: &BuildContext,
) -> Result<Vec<SpecEntry>> {
    enrich_each(step, index, ctx, restore, move |mut entry| async move {
        if entry.tests.is_none() {
            entry.tests = ctx.collaborators().tests.tests(&entry).await?;
        }
        Ok(entry)
    })
    .await
}

fn restore(entry: &mut SpecEntry, previous: &SpecEntry) {
    if entry.tests.is_none() {
        entry.tests = previous.tests.clone();
    }
}
