//! Rootset reference chains to one object
//!
//! Answers "why is this object alive": every path from a GC root down to
//! the target, grouped by root kind with the most interesting kinds first.

use super::{resolve_object_param, Page};
use crate::errors::{LobsterError, Result};
use crate::snapshot::{ReferenceChain, RootKind, Snapshot};

pub fn render(snapshot: &Snapshot, param: &str, include_weak: bool) -> Result<String> {
    if !snapshot.has_referrers() {
        return Err(LobsterError::query(
            "references were not computed for this snapshot",
        ));
    }
    let target = resolve_object_param(snapshot, param)?;
    let title = if include_weak {
        format!("Rootset references to {} (includes weak refs)", snapshot.describe(target))
    } else {
        format!("Rootset references to {} (excludes weak refs)", snapshot.describe(target))
    };
    let mut page = Page::new(&title);

    let chains = snapshot.rootset_references_to(target, include_weak);
    if chains.is_empty() {
        page.para("No references found from the root set.");
        return Ok(page.finish());
    }

    // group by kind, strongest first
    let mut kinds: Vec<RootKind> = chains
        .iter()
        .filter_map(|c| snapshot.root_of(c.obj()).map(|r| r.kind))
        .collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds.reverse();

    for kind in kinds {
        page.h2(&format!("{} references", kind.name()));
        for chain in chains.iter().filter(|c| {
            snapshot.root_of(c.obj()).map(|r| r.kind) == Some(kind)
        }) {
            render_chain(&mut page, snapshot, chain);
        }
    }
    Ok(page.finish())
}

fn render_chain(page: &mut Page, snapshot: &Snapshot, chain: &ReferenceChain) {
    if let Some(root) = snapshot.root_of(chain.obj()) {
        page.raw("<p>");
        page.text(&root.description());
        page.raw("</p>\n<ul>\n");
        for window in chain.objs.windows(2) {
            let (from, to) = (window[0], window[1]);
            page.raw("<li>");
            page.thing_link(snapshot, from);
            page.text(&format!(" : {} ", snapshot.describe_reference_to(from, to)));
            page.raw("&#8594; ");
            page.thing_link(snapshot, to);
            page.raw("</li>\n");
        }
        if chain.objs.len() == 1 {
            page.raw("<li>");
            page.thing_link(snapshot, chain.obj());
            page.text(" is directly rooted");
            page.raw("</li>\n");
        }
        page.raw("</ul>\n");
    }
}
