//! HTML entity escaping
//!
//! Class names, field names and string contents all flow into query pages;
//! everything user-controlled goes through `encode_html` first.

/// Escape the five significant HTML characters
pub fn encode_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
