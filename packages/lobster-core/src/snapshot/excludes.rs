//! Field exclusion list for reachability walks
//!
//! A plain text file, one `fully.qualified.Class.fieldName` per line,
//! `#` comments and blank lines ignored. Excluded fields are not followed
//! when computing what an object keeps reachable.

use std::collections::HashSet;
use std::path::Path;

use crate::errors::{LobsterError, Result};

#[derive(Debug, Default)]
pub struct ReachableExcludes {
    entries: HashSet<String>,
}

impl ReachableExcludes {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LobsterError::config(format!("cannot read exclude file {}: {}", path.display(), e))
                .with_source(e)
        })?;
        Ok(Self::from_lines(text.lines()))
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = lines
            .into_iter()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    pub fn is_excluded(&self, class: &str, field: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.contains(&format!("{}.{}", class, field))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
