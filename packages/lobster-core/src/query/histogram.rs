//! Heap histogram: per-class instance counts and shallow sizes
//!
//! Backs both the HTML page and the machine-readable JSON output the CLI
//! can emit without starting a server.

use serde::Serialize;

use super::Page;
use crate::errors::{LobsterError, Result};
use crate::snapshot::Snapshot;

/// One histogram row
#[derive(Debug, Clone, Serialize)]
pub struct HistogramEntry {
    pub class: String,
    pub count: usize,
    pub total_size: u64,
}

/// Histogram ordering, selected by route suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoSort {
    #[default]
    Size,
    Count,
    Class,
}

impl HistoSort {
    pub fn from_param(param: &str) -> Result<Self> {
        match param {
            "" | "size" => Ok(HistoSort::Size),
            "count" => Ok(HistoSort::Count),
            "class" => Ok(HistoSort::Class),
            other => Err(LobsterError::query(format!(
                "unknown histogram sort {:?}",
                other
            ))),
        }
    }
}

/// Rows for every class with at least one instance, plus empty classes
pub fn histogram_entries(snapshot: &Snapshot, sort: HistoSort) -> Vec<HistogramEntry> {
    let mut entries: Vec<HistogramEntry> = snapshot
        .classes()
        .map(|(name, id)| HistogramEntry {
            class: name.to_string(),
            count: snapshot.instance_count(id, false),
            total_size: snapshot.total_instance_size(id),
        })
        .collect();
    match sort {
        HistoSort::Size => entries.sort_by(|a, b| {
            b.total_size
                .cmp(&a.total_size)
                .then_with(|| a.class.cmp(&b.class))
        }),
        HistoSort::Count => entries.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| a.class.cmp(&b.class))
        }),
        HistoSort::Class => {} // classes() is already name-sorted
    }
    entries
}

pub fn render(snapshot: &Snapshot, sort: HistoSort) -> Result<String> {
    let mut page = Page::new("Heap histogram");

    page.raw("<p>Sort by ");
    page.link("/histo/size", "size");
    page.raw(" | ");
    page.link("/histo/count", "count");
    page.raw(" | ");
    page.link("/histo/class", "class name");
    page.raw("</p>\n");

    page.raw("<table border=\"1\">\n<tr><th>Class</th><th>Instance count</th><th>Total size</th></tr>\n");
    for entry in histogram_entries(snapshot, sort) {
        let id = match snapshot.find_class(&entry.class) {
            Some(id) => id,
            None => continue,
        };
        page.raw("<tr><td>");
        page.thing_link_labeled(snapshot, id, &entry.class);
        page.raw("</td><td>");
        page.text(&entry.count.to_string());
        page.raw("</td><td>");
        page.text(&entry.total_size.to_string());
        page.raw("</td></tr>\n");
    }
    page.raw("</table>\n");
    Ok(page.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_param() {
        assert_eq!(HistoSort::from_param("").unwrap(), HistoSort::Size);
        assert_eq!(HistoSort::from_param("count").unwrap(), HistoSort::Count);
        assert_eq!(HistoSort::from_param("class").unwrap(), HistoSort::Class);
        assert!(HistoSort::from_param("weight").is_err());
    }
}
