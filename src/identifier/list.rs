// Reference identifier lists: one identifier per line.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use super::canonical::Canonicalizer;

/// A reference list after canonicalization.
///
/// Entries that fail canonicalization are kept verbatim in `malformed` so
/// reports can show them. `collapsed` counts valid entries that turned out to
/// be a spelling of an identifier already in the set (e.g. the bare and URL
/// forms of the same DOI).
#[derive(Debug, Clone, Default, Serialize)]
pub struct CanonicalSet {
    pub identifiers: BTreeSet<String>,
    pub malformed: Vec<String>,
    pub collapsed: usize,
}

impl CanonicalSet {
    /// Canonicalize every raw entry.
    pub fn build<I, S>(canon: &Canonicalizer, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = CanonicalSet::default();
        for entry in raw {
            let entry = entry.as_ref();
            match canon.canonicalize(entry) {
                Ok(id) => {
                    if !set.identifiers.insert(id) {
                        set.collapsed += 1;
                    }
                }
                Err(e) => {
                    warn!(entry, error = %e, "Skipping malformed reference identifier");
                    set.malformed.push(entry.to_string());
                }
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Split a one-per-line identifier list, ignoring blank lines and `#` comments.
pub fn parse_identifier_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read an identifier list from disk.
pub fn read_identifier_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identifier list {}", path.display()))?;
    let entries = parse_identifier_list(&text);
    info!(path = %path.display(), entries = entries.len(), "Loaded identifier list");
    Ok(entries)
}

/// One identifier per line, sorted, newline-terminated.
pub fn format_identifier_list<'a>(identifiers: impl IntoIterator<Item = &'a str>) -> String {
    let sorted: BTreeSet<&str> = identifiers.into_iter().collect();
    sorted.into_iter().map(|id| format!("{id}\n")).collect()
}

/// Write identifiers in the format `read_identifier_file` reads.
pub fn write_identifier_file<'a>(
    path: &Path,
    identifiers: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    std::fs::write(path, format_identifier_list(identifiers))
        .with_context(|| format!("Failed to write identifier list {}", path.display()))
}
