//! Query pages
//!
//! Each submodule renders one page of the browser UI as a plain HTML
//! string from an immutable snapshot. The server layer only routes and
//! wraps errors; everything the pages show is computed here, which keeps
//! them directly testable without HTTP plumbing.

pub mod all_classes;
pub mod class;
pub mod finalizers;
pub mod histogram;
pub mod instances;
pub mod object;
pub mod reachable;
pub mod refs_by_type;
pub mod roots;
pub mod summary;

pub use histogram::{histogram_entries, HistogramEntry, HistoSort};

use crate::errors::{LobsterError, Result};
use crate::snapshot::{ObjId, Snapshot, ThingKind};
use lobster_utils::{encode_html, parse_hex};

/// Resolve an object route parameter (a hex heap id)
pub fn resolve_object_param(snapshot: &Snapshot, param: &str) -> Result<ObjId> {
    let heap_id = parse_hex(param)
        .map_err(|e| LobsterError::query(format!("bad object id {:?}: {}", param, e)))?;
    snapshot
        .find_thing(heap_id)
        .ok_or_else(|| LobsterError::not_found(format!("no object with id {}", param)))
}

/// Resolve a class route parameter (a name, or a hex heap id)
pub fn resolve_class_param(snapshot: &Snapshot, param: &str) -> Result<ObjId> {
    snapshot
        .find_class(param)
        .ok_or_else(|| LobsterError::not_found(format!("no class {:?}", param)))
}

/// HTML page under construction
pub struct Page {
    buf: String,
}

impl Page {
    pub fn new(title: &str) -> Self {
        let mut buf = String::with_capacity(4096);
        buf.push_str("<!DOCTYPE html>\n<html>\n<head>\n<title>");
        buf.push_str(&encode_html(title));
        buf.push_str("</title>\n</head>\n<body>\n<h1>");
        buf.push_str(&encode_html(title));
        buf.push_str("</h1>\n");
        Self { buf }
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</body>\n</html>\n");
        self.buf
    }

    /// Append raw HTML
    pub fn raw(&mut self, html: &str) {
        self.buf.push_str(html);
    }

    /// Append escaped text
    pub fn text(&mut self, text: &str) {
        self.buf.push_str(&encode_html(text));
    }

    pub fn h2(&mut self, heading: &str) {
        self.buf.push_str("<h2>");
        self.text(heading);
        self.buf.push_str("</h2>\n");
    }

    pub fn para(&mut self, text: &str) {
        self.buf.push_str("<p>");
        self.text(text);
        self.buf.push_str("</p>\n");
    }

    pub fn br(&mut self) {
        self.buf.push_str("<br>\n");
    }

    /// Link to an arbitrary page with escaped label
    pub fn link(&mut self, href: &str, label: &str) {
        self.buf.push_str("<a href=\"");
        self.buf.push_str(&encode_html(href));
        self.buf.push_str("\">");
        self.text(label);
        self.buf.push_str("</a>");
    }

    /// Link to the page for a heap thing, labeled with its description
    pub fn thing_link(&mut self, snapshot: &Snapshot, id: ObjId) {
        let label = snapshot.describe(id);
        self.thing_link_labeled(snapshot, id, &label);
    }

    pub fn thing_link_labeled(&mut self, snapshot: &Snapshot, id: ObjId, label: &str) {
        let href = match snapshot.thing(id).kind {
            ThingKind::Class(_) => format!("/class/{}", snapshot.id_string(id)),
            _ => format!("/object/{}", snapshot.id_string(id)),
        };
        self.link(&href, label);
        if snapshot.has_new_set() && snapshot.is_new(id) {
            self.raw(" <b>[new]</b>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_escapes_title_and_text() {
        let mut page = Page::new("a<b>");
        page.para("1 < 2");
        let html = page.finish();
        assert!(html.contains("<title>a&lt;b&gt;</title>"));
        assert!(html.contains("1 &lt; 2"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_link_escapes_href() {
        let mut page = Page::new("t");
        page.link("/class/a\"b", "label");
        assert!(page.finish().contains("href=\"/class/a&quot;b\""));
    }
}
