// CSV exports for spreadsheets.
//
// Each export is a flat table with a header row. Identifiers are written as
// resolver URLs (`https://doi.org/...`) so they open from a spreadsheet;
// records without one get an empty cell.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::tfidf::{RecordTerms, TermStats};
use crate::corpus::Corpus;
use crate::pipeline::classify::ClassificationRun;
use crate::pipeline::validate::{ValidationReport, ValidationStatus};

const DOI_URL_PREFIX: &str = "https://doi.org/";

#[derive(Serialize)]
struct RecordRow<'a> {
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(rename = "Title")]
    title: &'a str,
}

#[derive(Serialize)]
struct ClassificationRow<'a> {
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Error")]
    error: String,
}

#[derive(Serialize)]
struct ValidationRow<'a> {
    #[serde(rename = "DOI")]
    doi: &'a str,
    #[serde(rename = "Valid")]
    valid: &'a str,
    #[serde(rename = "Title/Error")]
    detail: String,
}

#[derive(Serialize)]
struct TermRow<'a> {
    rank: usize,
    term: &'a str,
    doc_freq: usize,
    score: f64,
}

#[derive(Serialize)]
struct RecordTermRow<'a> {
    record: &'a str,
    rank: usize,
    term: &'a str,
    doc_freq: usize,
    score: f64,
}

/// Identifier as a resolver URL, or empty.
pub fn doi_url(identifier: Option<&str>) -> String {
    identifier
        .map(|id| format!("{DOI_URL_PREFIX}{id}"))
        .unwrap_or_default()
}

/// DOI and title of every record that has at least one of them.
pub fn records_csv(corpus: &Corpus) -> Result<String> {
    let rows = corpus
        .all_records()
        .filter(|r| r.identifier.is_some() || !r.title.is_empty())
        .map(|r| RecordRow {
            doi: doi_url(r.identifier.as_deref()),
            title: &r.title,
        });
    to_csv(rows)
}

/// One row per classified record: DOI, title, category, description.
pub fn classification_csv(run: &ClassificationRun, corpus: &Corpus) -> Result<String> {
    let rows = run.outcomes.iter().map(|outcome| {
        let record = corpus.get(outcome.position);
        ClassificationRow {
            doi: doi_url(record.and_then(|r| r.identifier.as_deref())),
            title: record.map(|r| r.title.as_str()).unwrap_or_default(),
            category: outcome.label.as_str(),
            description: outcome.description.as_deref().unwrap_or_default(),
            error: outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        }
    });
    to_csv(rows)
}

/// One row per checked identifier, then the malformed entries.
pub fn validation_csv(report: &ValidationReport) -> Result<String> {
    let checked = report.entries.iter().map(|entry| {
        let (valid, detail) = match &entry.status {
            ValidationStatus::Registered { title } => ("Yes", title.clone().unwrap_or_default()),
            ValidationStatus::Unregistered => ("No", "not registered".to_string()),
            ValidationStatus::Failed { error } => ("Unknown", error.to_string()),
        };
        ValidationRow {
            doi: &entry.identifier,
            valid,
            detail,
        }
    });
    let malformed = report.malformed.iter().map(|raw| ValidationRow {
        doi: raw,
        valid: "No",
        detail: "malformed identifier".to_string(),
    });
    to_csv(checked.chain(malformed))
}

/// The ranked corpus term table.
pub fn terms_csv(stats: &TermStats) -> Result<String> {
    let rows = stats.terms.iter().enumerate().map(|(i, t)| TermRow {
        rank: i + 1,
        term: &t.term,
        doc_freq: t.doc_freq,
        score: t.score,
    });
    to_csv(rows)
}

/// Per-record rankings, one row per (record, term).
pub fn record_terms_csv(rankings: &[RecordTerms]) -> Result<String> {
    let rows = rankings.iter().flat_map(|ranking| {
        ranking.terms.iter().enumerate().map(move |(i, t)| RecordTermRow {
            record: &ranking.record,
            rank: i + 1,
            term: &t.term,
            doc_freq: t.doc_freq,
            score: t.score,
        })
    });
    to_csv(rows)
}

/// Write an export produced by one of the functions above.
pub fn write_csv(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}

/// Header comes from the first row, so a table without rows is empty.
fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to encode CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {e}"))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}
