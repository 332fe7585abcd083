use specindex_shared::{Result, SpecEntry};

use super::{BuildStep, enrich_each};
use crate::context::BuildContext;

pub(crate) async fn run(
    step: &BuildStep,
    index: Vec<SpecEntry>,
    ctx: &BuildContext,
) -> Result<Vec<SpecEntry>> {
    enrich_each(step, index, ctx, restore, move |mut entry| async move {
        let prober = &ctx.collaborators().filenames;

        if let Some(nightly) = entry.nightly.as_mut() {
            if nightly.filename.is_none() {
                nightly.filename = Some(prober.filename(&nightly.url).await?);
            }
        }
        if let Some(release) = entry.release.as_mut() {
            if release.filename.is_none() {
                release.filename = Some(prober.filename(&release.url).await?);
            }
        }
        Ok(entry)
    })
    .await
}

fn restore(entry: &mut SpecEntry, previous: &SpecEntry) {
    if let (Some(nightly), Some(prev)) = (entry.nightly.as_mut(), previous.nightly.as_ref()) {
        if nightly.filename.is_none() {
            nightly.filename = prev.filename.clone();
        }
    }
    if let (Some(release), Some(prev)) = (entry.release.as_mut(), previous.release.as_ref()) {
        if release.filename.is_none() {
            release.filename = prev.filename.clone();
        }
    }
}
