//! Instance listings for one class

use super::{resolve_class_param, Page};
use crate::errors::Result;
use crate::snapshot::Snapshot;

pub fn render(
    snapshot: &Snapshot,
    param: &str,
    include_subclasses: bool,
    new_only: bool,
) -> Result<String> {
    let class_id = resolve_class_param(snapshot, param)?;
    let name = snapshot
        .class(class_id)
        .map_or("?", |c| c.name.as_str())
        .to_string();
    let mut title = format!("Instances of {}", name);
    if include_subclasses {
        title.push_str(" (including subclasses)");
    }
    if new_only {
        title.push_str(" (new only)");
    }
    let mut page = Page::new(&title);

    let mut instances = snapshot.instances_of(class_id, include_subclasses);
    if new_only {
        instances.retain(|&i| snapshot.is_new(i));
    }
    instances.sort_by_key(|&i| snapshot.thing(i).heap_id);

    let total_size: u64 = instances.iter().map(|&i| snapshot.size_of(i)).sum();
    page.para(&format!(
        "{} instances, {} bytes shallow",
        instances.len(),
        total_size
    ));

    for id in instances {
        page.thing_link(snapshot, id);
        page.text(&format!(" ({} bytes)", snapshot.size_of(id)));
        page.br();
    }
    Ok(page.finish())
}
