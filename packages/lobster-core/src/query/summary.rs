//! Landing page: dump totals and links into the other queries

use super::Page;
use crate::errors::Result;
use crate::snapshot::Snapshot;

pub fn render(snapshot: &Snapshot) -> Result<String> {
    let mut page = Page::new("Heap dump summary");

    let instances = snapshot.object_count() - snapshot.class_count();
    page.para(&format!(
        "{} classes, {} objects, {} GC roots",
        snapshot.class_count(),
        instances,
        snapshot.roots().len()
    ));
    if !snapshot.has_referrers() {
        page.para("References were not computed; root and referrer queries are unavailable.");
    }
    if snapshot.has_new_set() {
        page.para("A baseline dump was loaded; new objects are marked on every page.");
    }

    page.raw("<ul>\n<li>");
    page.link("/allClasses", "All classes (platform classes excluded)");
    page.raw("</li>\n<li>");
    page.link("/allClassesWithPlatform", "All classes, including platform");
    page.raw("</li>\n<li>");
    page.link("/histo", "Heap histogram");
    page.raw("</li>\n<li>");
    page.link("/finalizers", "Objects pending finalization");
    page.raw("</li>\n</ul>\n");

    Ok(page.finish())
}
