// Markdown report for a classification run.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use super::truncate_chars;
use crate::corpus::Corpus;
use crate::pipeline::classify::ClassificationRun;

/// Render the run as Markdown: summary, distribution, per-record table.
pub fn classification_report(run: &ClassificationRun, corpus: &Corpus) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Classification Report\n");
    let _ = writeln!(
        md,
        "Generated {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "- Records: {}", run.input_records);
    let _ = writeln!(md, "- Classified: {}", run.outcomes.len() - run.distribution.unclassified());
    let _ = writeln!(md, "- Unclassified: {}", run.distribution.unclassified());
    let _ = writeln!(md, "- Records with errors: {}", run.errored());
    let _ = writeln!(md, "- Failed batches: {} of {}", run.failed_batches, run.batches);
    if run.cancelled {
        let _ = writeln!(md, "- **Cancelled**: {} records not sent", run.skipped());
    }

    let _ = writeln!(md, "\n## Label Distribution\n");
    let _ = writeln!(md, "| Label | Count | Share |");
    let _ = writeln!(md, "|---|---:|---:|");
    for row in run.distribution.rows() {
        let label = if row.unclassified {
            format!("_{}_", row.label)
        } else {
            escape_cell(&row.label)
        };
        let _ = writeln!(md, "| {} | {} | {:.1}% |", label, row.count, row.percent);
    }

    let _ = writeln!(md, "\n## Records\n");
    let _ = writeln!(md, "| Record | Title | Label | Note |");
    let _ = writeln!(md, "|---|---|---|---|");
    for outcome in &run.outcomes {
        let title = corpus
            .get(outcome.position)
            .map(|r| truncate_chars(&r.title, 80))
            .unwrap_or_default();
        let note = match (&outcome.error, &outcome.description) {
            (Some(err), _) => err.to_string(),
            (None, Some(desc)) => desc.clone(),
            (None, None) => String::new(),
        };
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            escape_cell(&outcome.record),
            escape_cell(&title),
            escape_cell(outcome.label.as_str()),
            escape_cell(&note)
        );
    }

    md
}

/// Write the report to `path`.
pub fn write_classification_report(path: &Path, run: &ClassificationRun, corpus: &Corpus) -> Result<()> {
    std::fs::write(path, classification_report(run, corpus))
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
