//! Reference summary for one class
//!
//! For all instances of a class, tallies which classes reference them and
//! which classes they reference, so a leaky type's neighborhood can be
//! explored one hop at a time.

use rustc_hash::FxHashMap;

use super::{resolve_class_param, Page};
use crate::errors::{LobsterError, Result};
use crate::snapshot::{ObjId, Snapshot, ThingKind};

pub fn render(snapshot: &Snapshot, param: &str) -> Result<String> {
    if !snapshot.has_referrers() {
        return Err(LobsterError::query(
            "references were not computed for this snapshot",
        ));
    }
    let class_id = resolve_class_param(snapshot, param)?;
    let name = snapshot
        .class(class_id)
        .map_or("?", |c| c.name.as_str())
        .to_string();
    let mut page = Page::new(&format!("References by type: {}", name));

    let mut referrers: FxHashMap<ObjId, usize> = FxHashMap::default();
    let mut referees: FxHashMap<ObjId, usize> = FxHashMap::default();
    for instance in snapshot.instances_of(class_id, false) {
        for &r in snapshot.referrers(instance) {
            if let Some(c) = class_of_for_tally(snapshot, r) {
                *referrers.entry(c).or_insert(0) += 1;
            }
        }
        if let Ok(outs) = snapshot.outgoing_refs(instance, None) {
            for out in outs {
                if let Some(c) = class_of_for_tally(snapshot, out) {
                    *referees.entry(c).or_insert(0) += 1;
                }
            }
        }
    }

    page.h2("Referrers by type");
    render_tally(&mut page, snapshot, referrers);
    page.h2("Referees by type");
    render_tally(&mut page, snapshot, referees);
    Ok(page.finish())
}

fn class_of_for_tally(snapshot: &Snapshot, id: ObjId) -> Option<ObjId> {
    match snapshot.thing(id).kind {
        // tallying every class under java.lang.Class would say nothing
        ThingKind::Class(_) => None,
        _ => snapshot.thing(id).class_of(),
    }
}

fn render_tally(page: &mut Page, snapshot: &Snapshot, tally: FxHashMap<ObjId, usize>) {
    let mut rows: Vec<(ObjId, usize)> = tally.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if rows.is_empty() {
        page.para("none");
        return;
    }
    page.raw("<table border=\"1\">\n<tr><th>Class</th><th>Count</th></tr>\n");
    for (class, count) in rows {
        page.raw("<tr><td>");
        let name = snapshot.class(class).map_or("?", |c| c.name.as_str());
        page.link(
            &format!("/refsByType/{}", snapshot.id_string(class)),
            name,
        );
        page.raw("</td><td>");
        page.text(&count.to_string());
        page.raw("</td></tr>\n");
    }
    page.raw("</table>\n");
}
