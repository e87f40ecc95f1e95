//! Per-object page: fields or elements, allocation site, referrers

use super::class::render_value;
use super::{resolve_object_param, Page};
use crate::errors::Result;
use crate::snapshot::{Snapshot, ThingKind};

pub fn render(snapshot: &Snapshot, param: &str) -> Result<String> {
    let id = resolve_object_param(snapshot, param)?;
    let mut page = Page::new(&format!("Object at {}", snapshot.id_string(id)));

    page.raw("<p>");
    page.raw("Instance of ");
    match snapshot.thing(id).class_of() {
        Some(class) => page.thing_link(snapshot, class),
        None => page.text("an unresolved class"),
    }
    page.raw("</p>\n");
    page.para(&format!("Shallow size: {} bytes", snapshot.size_of(id)));

    if let Some(s) = snapshot.string_value(id) {
        page.h2("String value");
        page.para(&s);
    }

    match &snapshot.thing(id).kind {
        ThingKind::Class(_) => {
            // class pages carry the detail; just point there
            page.para("This object is a class.");
        }
        ThingKind::Instance(_) => {
            page.h2("Instance data members");
            if let Some(class) = snapshot.thing(id).class_of() {
                let fields = snapshot.fields_for_instance(class);
                let values = snapshot.instance_fields(id)?;
                for ((_, decl), value) in fields.iter().zip(values.iter()) {
                    page.text(&format!("{}: ", decl.name));
                    render_value(&mut page, snapshot, value);
                    page.br();
                }
            }
        }
        ThingKind::ObjArray(a) => {
            page.h2(&format!("Elements ({})", a.length));
            for (i, value) in snapshot.array_elements(id)?.iter().enumerate() {
                page.text(&format!("{}: ", i));
                render_value(&mut page, snapshot, value);
                page.br();
            }
        }
        ThingKind::PrimArray(a) => {
            page.h2(&format!("Elements ({} x {})", a.length, a.elem.descriptor()));
            let rendered: Vec<String> = snapshot
                .array_elements(id)?
                .iter()
                .map(|v| v.to_string())
                .collect();
            page.para(&rendered.join(", "));
        }
    }

    if let Some(trace) = snapshot.trace_of(id) {
        page.h2("Allocated at");
        for frame in &trace.frames {
            page.text(&format!(
                "{}.{} ({}, {})",
                frame.class_name,
                frame.method_name,
                frame.source_file,
                frame.line_string()
            ));
            page.br();
        }
    }

    if snapshot.has_referrers() {
        page.h2("References to this object");
        for &referrer in snapshot.referrers(id) {
            page.thing_link(snapshot, referrer);
            page.text(&format!(" : {}", snapshot.describe_reference_to(referrer, id)));
            page.br();
        }
        if let Some(root) = snapshot.root_of(id) {
            page.para(&format!("GC root: {}", root.description()));
        }

        page.h2("Other queries");
        page.link(
            &format!("/roots/{}", snapshot.id_string(id)),
            "Rootset references (excluding weak refs)",
        );
        page.br();
        page.link(
            &format!("/allRoots/{}", snapshot.id_string(id)),
            "Rootset references (including weak refs)",
        );
        page.br();
        page.link(
            &format!("/reachableFrom/{}", snapshot.id_string(id)),
            "Objects reachable from here",
        );
        page.br();
    }

    Ok(page.finish())
}
