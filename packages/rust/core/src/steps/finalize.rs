//! Defaults, relink, sort and validate.

use specindex_shared::{Result, SpecEntry, Standing};
use tracing::debug;

use super::BuildStep;
use super::skeleton::check_unique;
use crate::context::BuildContext;

const DEFAULT_CATEGORY: &str = "browser";

pub(crate) fn run(
    step: &BuildStep,
    mut index: Vec<SpecEntry>,
    ctx: &BuildContext,
) -> Result<Vec<SpecEntry>> {
    for entry in &mut index {
        let overridden = ctx
            .raw_for(&entry.url)
            .is_some_and(|raw| raw.categories.is_some());
        if entry.categories.is_empty() && !overridden {
            entry.categories = vec![DEFAULT_CATEGORY.to_string()];
        }
        if entry.standing.is_none() {
            entry.standing = Some(Standing::Good);
        }
        ctx.progress().item_done(step.name, &entry.shortname);
    }

    // A partial index cannot be relinked on its own; the skeleton already
    // linked it against the whole list.
    if ctx.selection().is_none() {
        specindex_series::relink(&mut index);
        specindex_series::validate_series(&index)?;
    }

    index.sort_by(|a, b| a.url.cmp(&b.url));
    check_unique(&index)?;

    debug!(entries = index.len(), "index finalized");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::{StubSources, entry};
    use crate::steps::StepKind;
    use specindex_shared::RawSpec;

    #[test]
    fn applies_defaults_and_sorts() {
        let (_, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(vec![], collaborators);

        let mut tagged = entry("https://www.w3.org/TR/b/", "b");
        tagged.categories = vec!["browser".into(), "reffy".into()];
        tagged.standing = Some(Standing::Pending);
        let plain = entry("https://www.w3.org/TR/a/", "a");

        let out = run(StepKind::Finalize.step(), vec![tagged, plain], &ctx).unwrap();
        assert_eq!(out[0].url, "https://www.w3.org/TR/a/");
        assert_eq!(out[0].categories, vec!["browser"]);
        assert_eq!(out[0].standing, Some(Standing::Good));
        assert_eq!(out[1].categories, vec!["browser", "reffy"]);
        assert_eq!(out[1].standing, Some(Standing::Pending));
    }

    #[test]
    fn explicit_empty_categories_get_no_default() {
        let url = "https://www.w3.org/TR/bare/";
        let (_, collaborators) = StubSources::default().into_collaborators();
        let raw = RawSpec {
            categories: Some(vec![]),
            ..RawSpec::from_url(url)
        };
        let ctx = BuildContext::new(vec![raw], collaborators);

        let out = run(StepKind::Finalize.step(), vec![entry(url, "bare")], &ctx).unwrap();
        assert!(out[0].categories.is_empty());
    }

    #[test]
    fn relinks_whole_index() {
        let (_, collaborators) = StubSources::default().into_collaborators();
        let ctx = BuildContext::new(vec![], collaborators);

        let mut one = entry("https://drafts.csswg.org/css-grid-1/", "css-grid-1");
        one.series.shortname = "css-grid".into();
        one.series.version = Some("1".into());
        let mut two = entry("https://drafts.csswg.org/css-grid-2/", "css-grid-2");
        two.series.shortname = "css-grid".into();
        two.series.version = Some("2".into());

        let out = run(StepKind::Finalize.step(), vec![two, one], &ctx).unwrap();
        assert_eq!(out[0].series.next.as_deref(), Some("css-grid-2"));
        assert_eq!(out[1].series.previous.as_deref(), Some("css-grid-1"));
        assert_eq!(out[0].series.current_specification, "css-grid-2");
    }
}
