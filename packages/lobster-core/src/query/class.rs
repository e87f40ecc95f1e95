//! Per-class page: hierarchy, fields, statics, instance links

use super::{resolve_class_param, Page};
use crate::errors::Result;
use crate::snapshot::{Snapshot, Value};

pub fn render(snapshot: &Snapshot, param: &str) -> Result<String> {
    let id = resolve_class_param(snapshot, param)?;
    let class = match snapshot.class(id) {
        Some(c) => c,
        None => return Err(crate::errors::LobsterError::not_found("not a class")),
    };
    let mut page = Page::new(&format!("Class {}", class.name));

    page.para(&format!("id: {}", snapshot.id_string(id)));
    if class.synthetic {
        page.para("(synthesized: this class was not present in the dump)");
    }

    page.h2("Superclass");
    match class.superclass {
        Some(sup) => page.thing_link(snapshot, sup),
        None => page.text("none"),
    }
    page.br();

    if !class.subclasses.is_empty() {
        page.h2("Subclasses");
        for &sub in &class.subclasses {
            page.thing_link(snapshot, sub);
            page.br();
        }
    }

    page.h2("Loader details");
    page.raw("ClassLoader: ");
    render_value(&mut page, snapshot, &class.loader);
    page.br();
    page.raw("Signers: ");
    render_value(&mut page, snapshot, &class.signers);
    page.br();
    page.raw("Protection domain: ");
    render_value(&mut page, snapshot, &class.protection_domain);
    page.br();

    page.h2("Instance data members");
    // superclass fields first, the order instance pages use
    for (decl_class, field) in snapshot.fields_for_instance(id) {
        let owner = snapshot.class(decl_class).map_or("?", |c| c.name.as_str());
        page.text(&format!(
            "{} {} (declared in {})",
            field.signature.descriptor(),
            field.name,
            owner
        ));
        page.br();
    }

    if !class.statics.is_empty() {
        page.h2("Static data members");
        for s in &class.statics {
            page.text(&format!("{}: ", s.field.name));
            render_value(&mut page, snapshot, &s.value);
            page.br();
        }
    }

    page.h2("Instances");
    let own = snapshot.instance_count(id, false);
    let all = snapshot.instance_count(id, true);
    page.link(
        &format!("/instances/{}", snapshot.id_string(id)),
        &format!("{} instances of this class", own),
    );
    page.br();
    page.link(
        &format!("/allInstances/{}", snapshot.id_string(id)),
        &format!("{} instances including subclasses", all),
    );
    page.br();
    page.para(&format!(
        "Total shallow size of instances: {} bytes",
        snapshot.total_instance_size(id)
    ));

    page.h2("Other queries");
    page.link(
        &format!("/refsByType/{}", snapshot.id_string(id)),
        "References summary by type",
    );
    page.br();
    if snapshot.has_referrers() {
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
    }

    Ok(page.finish())
}

pub(super) fn render_value(page: &mut Page, snapshot: &Snapshot, value: &Value) {
    match value {
        Value::Ref(id) => page.thing_link(snapshot, *id),
        other => page.text(&other.to_string()),
    }
}
