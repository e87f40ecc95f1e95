//! Objects pending finalization

use rustc_hash::FxHashMap;

use super::Page;
use crate::errors::Result;
use crate::snapshot::{ObjId, Snapshot};

pub fn render(snapshot: &Snapshot) -> Result<String> {
    let mut page = Page::new("Objects pending finalization");

    let objects = snapshot.finalizer_objects();
    page.para(&format!("{} objects on the finalizer queue", objects.len()));
    if objects.is_empty() {
        return Ok(page.finish());
    }

    let mut by_class: FxHashMap<Option<ObjId>, usize> = FxHashMap::default();
    for &obj in objects {
        *by_class.entry(snapshot.thing(obj).class_of()).or_insert(0) += 1;
    }
    let mut rows: Vec<(Option<ObjId>, usize)> = by_class.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    page.h2("Count by class");
    page.raw("<table border=\"1\">\n<tr><th>Class</th><th>Count</th></tr>\n");
    for (class, count) in rows {
        page.raw("<tr><td>");
        match class {
            Some(c) => page.thing_link(snapshot, c),
            None => page.text("<unresolved>"),
        }
        page.raw("</td><td>");
        page.text(&count.to_string());
        page.raw("</td></tr>\n");
    }
    page.raw("</table>\n");

    page.h2("Objects");
    for &obj in objects {
        page.thing_link(snapshot, obj);
        page.br();
    }
    Ok(page.finish())
}
