//! Class listing, grouped by package

use super::Page;
use crate::errors::Result;
use crate::snapshot::Snapshot;

/// Packages hidden from the default listing
const PLATFORM_PREFIXES: &[&str] = &[
    "java.", "javax.", "jdk.", "sun.", "com.sun.", "com.oracle.", "org.w3c.", "org.xml.",
];

fn is_platform(name: &str) -> bool {
    PLATFORM_PREFIXES.iter().any(|p| name.starts_with(p))
}

pub fn render(snapshot: &Snapshot, include_platform: bool) -> Result<String> {
    let title = if include_platform {
        "All classes (including platform)"
    } else {
        "All classes (excluding platform)"
    };
    let mut page = Page::new(title);

    let mut last_package = None::<&str>;
    for (name, id) in snapshot.classes() {
        if !include_platform && is_platform(name) {
            continue;
        }
        let package = match name.rfind('.') {
            Some(dot) => &name[..dot],
            None if name.starts_with('[') => "<arrays>",
            None => "<default package>",
        };
        if last_package != Some(package) {
            page.h2(&format!("Package {}", package));
            last_package = Some(package);
        }
        page.thing_link_labeled(snapshot, id, name);
        page.br();
    }
    Ok(page.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_prefixes() {
        assert!(is_platform("java.lang.String"));
        assert!(is_platform("sun.misc.Unsafe"));
        assert!(!is_platform("com.example.Node"));
        assert!(!is_platform("[I"));
    }
}
