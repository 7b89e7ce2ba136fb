// Multi-file ingest: several `.bib` exports, or directories of them, read
// into one bibliography.
//
// A directory contributes every `.bib` file directly inside it (not
// subdirectories), in file name order. Records keep the order of the paths
// as given, so "first record wins" in the corpus follows the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use super::parser::{read_file, ParsedBibliography};

/// Per-file ingest counts.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub entries: usize,
    pub skipped: usize,
}

/// Every file read, plus the merged bibliography.
#[derive(Debug, Default)]
pub struct SourceSet {
    pub files: Vec<SourceFile>,
    pub bibliography: ParsedBibliography,
}

/// Expand `paths` into the BibTeX files to read.
///
/// Files are taken as given whatever their extension. A directory without
/// any `.bib` file is an error, as is a path that doesn't exist.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = Vec::new();
            for entry in fs::read_dir(path)
                .with_context(|| format!("Cannot read directory {}", path.display()))?
            {
                let candidate = entry?.path();
                if candidate.is_file() && has_bib_extension(&candidate) {
                    found.push(candidate);
                }
            }
            if found.is_empty() {
                anyhow::bail!("No .bib files found in {}", path.display());
            }
            found.sort();
            files.extend(found);
        } else if path.exists() {
            if !has_bib_extension(path) {
                warn!(path = %path.display(), "File doesn't have a .bib extension, reading anyway");
            }
            files.push(path.clone());
        } else {
            anyhow::bail!("{} does not exist", path.display());
        }
    }

    Ok(files)
}

/// Read every file under `paths` into one bibliography.
pub fn read_paths(paths: &[PathBuf]) -> Result<SourceSet> {
    let mut set = SourceSet::default();

    for path in expand_paths(paths)? {
        let parsed = read_file(&path)?;
        set.files.push(SourceFile {
            path,
            entries: parsed.records.len(),
            skipped: parsed.skipped,
        });
        set.bibliography.skipped += parsed.skipped;
        set.bibliography.records.extend(parsed.records);
    }

    if set.files.len() > 1 {
        info!(
            files = set.files.len(),
            entries = set.bibliography.records.len(),
            skipped = set.bibliography.skipped,
            "Read BibTeX sources"
        );
    }

    Ok(set)
}

fn has_bib_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("bib"))
}
