// Colored terminal output for the review reports.
//
// Every table is followed by the counts of what was skipped, malformed or
// left unclassified; a report never drops items without saying so.

use colored::Colorize;

use super::truncate_chars;
use crate::analysis::overlap::OverlapResult;
use crate::analysis::tfidf::{RecordTerms, TermStats};
use crate::analysis::topics::TopicFrequency;
use crate::bibtex::SourceFile;
use crate::corpus::IngestStats;
use crate::pipeline::classify::ClassificationRun;
use crate::pipeline::distribution::LabelDistribution;
use crate::pipeline::resolve::{ResolutionReport, ResolutionStatus};
use crate::pipeline::validate::{ValidationReport, ValidationStatus};

/// Corpus ingest counts, with a line per file when several were read.
pub fn display_corpus_summary(stats: &IngestStats, files: &[SourceFile]) {
    println!("\n{}", "=== Corpus ===".bold());
    if files.len() > 1 {
        for file in files {
            println!(
                "  {:<40} {:>5} entries",
                file.path.display().to_string().dimmed(),
                file.entries
            );
        }
    }
    println!("  Records:              {}", stats.total);
    println!("  Distinct identifiers: {}", stats.indexed);
    println!("  Duplicate identifiers: {}", stats.duplicates);
    println!("  Without identifier:   {}", stats.without_identifier);
    println!("  Without title/abstract: {}", stats.without_text);

    if !stats.malformed.is_empty() {
        println!(
            "  {} {} malformed identifiers:",
            "!".yellow(),
            stats.malformed.len()
        );
        for m in &stats.malformed {
            println!("      #{:<5} {}", m.position, m.raw.dimmed());
        }
    }
    let skipped_entries: usize = files.iter().map(|f| f.skipped).sum();
    if skipped_entries > 0 {
        println!(
            "  {} {} entries could not be parsed and were skipped",
            "!".yellow(),
            skipped_entries
        );
    }
}

/// Ranked term-score table.
pub fn display_term_stats(stats: &TermStats) {
    println!(
        "\n{}",
        format!("=== Top Terms ({} records) ===", stats.corpus_size).bold()
    );

    if stats.terms.is_empty() {
        println!("  No terms within the document frequency bounds.");
    } else {
        println!(
            "  {:>4}  {:<28} {:>6}  {:>10}",
            "Rank".dimmed(),
            "Term".dimmed(),
            "DF".dimmed(),
            "Score".dimmed(),
        );
        println!("  {}", "-".repeat(54).dimmed());

        for (i, term) in stats.terms.iter().enumerate() {
            println!(
                "  {:>4}. {:<28} {:>6}  {:>10.4}",
                i + 1,
                term.term,
                term.doc_freq,
                term.score,
            );
        }
    }

    println!();
    println!(
        "  Vocabulary: {} terms, {} outside frequency bounds, {} records without terms",
        stats.vocabulary_size, stats.filtered_out, stats.empty_records
    );
}

/// Best terms of each record. Records without any are only counted.
pub fn display_record_terms(rankings: &[RecordTerms]) {
    println!("\n{}", "=== Terms per Record ===".bold());

    let mut without_terms = 0;
    for ranking in rankings {
        if ranking.terms.is_empty() {
            without_terms += 1;
            continue;
        }
        println!(
            "\n  {} {}",
            ranking.record.cyan(),
            truncate_chars(&ranking.title, 70)
        );
        let terms: Vec<String> = ranking
            .terms
            .iter()
            .map(|t| format!("{} ({:.3})", t.term, t.score))
            .collect();
        println!("      {}", terms.join(", "));
    }

    println!();
    println!("  Records without ranked terms: {without_terms}");
}

/// Overlap summary, optionally with the identifier lists.
pub fn display_overlap(result: &OverlapResult, verbose: bool) {
    println!("\n{}", "=== Reference Coverage ===".bold());
    println!("  Reference identifiers: {}", result.reference_total);
    println!("  Corpus identifiers:    {}", result.corpus_total);
    println!(
        "  Overlapping:           {} ({:.1}%)",
        result.overlap.len().to_string().green(),
        result.overlap_percent()
    );
    println!(
        "  Missing:               {} ({:.1}%)",
        result.missing.len().to_string().red(),
        result.missing_percent()
    );
    println!("  Malformed:             {}", result.malformed.len());
    if result.collapsed > 0 {
        println!("  Repeated in reference: {}", result.collapsed);
    }

    if verbose {
        print_id_list("Found in corpus", result.overlap.iter());
        print_id_list("Missing from corpus", result.missing.iter());
        print_id_list("Malformed reference entries", result.malformed.iter());
    }
}

fn print_id_list<'a>(heading: &str, ids: impl ExactSizeIterator<Item = &'a String>) {
    if ids.len() == 0 {
        return;
    }
    println!("\n  {}:", heading.bold());
    for id in ids {
        println!("    {id}");
    }
}

/// Topic frequency table.
pub fn display_topics(freq: &TopicFrequency, verbose: bool) {
    println!(
        "\n{}",
        format!("=== Topic Frequency ({} records) ===", freq.corpus_size).bold()
    );

    for topic in &freq.topics {
        let count = if topic.count == 0 {
            topic.count.to_string().dimmed()
        } else {
            topic.count.to_string().bold()
        };
        println!("  {:<40} {:>5}", topic.topic, count);
        if verbose && !topic.records.is_empty() {
            println!("      {}", topic.records.join(", ").dimmed());
        }
    }

    println!();
    println!("  Records matching no topic: {}", freq.unmatched_records);
}

/// Label distribution with the explicit unclassified row.
pub fn display_distribution(dist: &LabelDistribution) {
    println!(
        "\n{}",
        format!("=== Label Distribution ({} records) ===", dist.total()).bold()
    );

    for row in dist.rows() {
        let label = if row.unclassified {
            row.label.yellow().to_string()
        } else {
            row.label.clone()
        };
        println!("  {:<44} {:>5}  {:>5.1}%", label, row.count, row.percent);
    }
    println!("  {}", format!("{} distinct labels", dist.label_count()).dimmed());
}

/// Classification run summary.
pub fn display_classification(run: &ClassificationRun) {
    display_distribution(&run.distribution);

    println!();
    println!(
        "  Batches: {} sent, {} failed after retries",
        run.batches, run.failed_batches
    );
    println!(
        "  Unclassified: {} ({} with errors)",
        run.distribution.unclassified(),
        run.errored()
    );
    if run.cancelled {
        println!(
            "  {} Run cancelled: {} records were not sent",
            "!".red().bold(),
            run.skipped()
        );
    }
}

/// Identifier resolution results.
pub fn display_resolution(report: &ResolutionReport) {
    println!("\n{}", "=== Identifier Resolution ===".bold());

    for entry in &report.entries {
        let title = truncate_chars(&entry.title, 60);
        match &entry.status {
            ResolutionStatus::Resolved {
                identifier,
                confidence,
                ..
            } => println!(
                "  {} {:<62} {} ({:?})",
                "+".green(),
                title,
                identifier,
                confidence
            ),
            ResolutionStatus::NotFound => {
                println!("  {} {:<62} {}", "-".yellow(), title, "not found".dimmed())
            }
            ResolutionStatus::Failed { error } => {
                println!("  {} {:<62} {}", "!".red(), title, error.to_string().red())
            }
        }
    }

    println!();
    println!(
        "  Resolved: {}  Not found: {}  Failed: {}",
        report.resolved(),
        report.not_found(),
        report.failed()
    );
    println!(
        "  Already identified: {}  No title: {}",
        report.already_identified, report.skipped_no_title
    );
    if report.cancelled {
        println!(
            "  {} Run cancelled: {} records were not queried",
            "!".red().bold(),
            report.skipped_cancelled
        );
    }
}

/// Registry validation results.
pub fn display_validation(report: &ValidationReport, verbose: bool) {
    println!("\n{}", "=== Identifier Validation ===".bold());

    if verbose {
        for entry in &report.entries {
            match &entry.status {
                ValidationStatus::Registered { title } => println!(
                    "  {} {:<40} {}",
                    "+".green(),
                    entry.identifier,
                    truncate_chars(title.as_deref().unwrap_or("(no title)"), 60).dimmed()
                ),
                ValidationStatus::Unregistered => println!(
                    "  {} {:<40} {}",
                    "-".red(),
                    entry.identifier,
                    "not registered".red()
                ),
                ValidationStatus::Failed { error } => println!(
                    "  {} {:<40} {}",
                    "!".yellow(),
                    entry.identifier,
                    error.to_string().yellow()
                ),
            }
        }
        for raw in &report.malformed {
            println!("  {} {:<40} {}", "?".yellow(), raw, "malformed".dimmed());
        }
        println!();
    }

    println!(
        "  Registered:   {} ({:.1}%)",
        report.registered().to_string().green(),
        report.registered_percent()
    );
    println!("  Unregistered: {}", report.unregistered().to_string().red());
    println!("  Lookup failed: {}", report.failed());
    println!("  Malformed:    {}", report.malformed.len());
    if report.collapsed > 0 {
        println!("  Repeated:     {}", report.collapsed);
    }
    if report.cancelled {
        println!(
            "  {} Run cancelled: {} identifiers were not checked",
            "!".red().bold(),
            report.skipped_cancelled
        );
    }
}
