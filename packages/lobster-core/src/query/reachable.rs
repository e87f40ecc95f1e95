//! Transitive closure from one object

use super::{resolve_object_param, Page};
use crate::errors::{LobsterError, Result};
use crate::snapshot::Snapshot;

pub fn render(snapshot: &Snapshot, param: &str) -> Result<String> {
    if !snapshot.has_referrers() {
        return Err(LobsterError::query(
            "references were not computed for this snapshot",
        ));
    }
    let start = resolve_object_param(snapshot, param)?;
    let mut page = Page::new(&format!("Objects reachable from {}", snapshot.describe(start)));

    let set = snapshot.reachables_from(start);
    if let Some(excludes) = snapshot.excludes() {
        if !excludes.is_empty() {
            page.para(&format!(
                "{} excluded fields were not followed",
                excludes.len()
            ));
        }
    }
    page.para(&format!(
        "{} objects, {} bytes total (including the starting object)",
        set.objs.len() + 1,
        set.total_size
    ));

    for id in set.objs {
        page.thing_link(snapshot, id);
        page.text(&format!(" ({} bytes)", snapshot.size_of(id)));
        page.br();
    }
    Ok(page.finish())
}
