// Composition tests: verifying that the stages chain together correctly.
//
// These tests exercise the data flow between modules:
//   BibTeX -> Corpus -> {Term stats, Overlap, Topics, Classification} -> Reports
//   (terminal-free: Markdown, JSON and CSV)
// without any network calls (the oracle is an in-memory stub) and without
// filesystem side effects except report files written to the temp dir.

use async_trait::async_trait;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use bibsift::analysis::{overlap, tfidf, topics};
use bibsift::bibtex;
use bibsift::corpus::Corpus;
use bibsift::error::{ReviewError, ReviewResult};
use bibsift::identifier::list::{parse_identifier_list, CanonicalSet};
use bibsift::identifier::Canonicalizer;
use bibsift::oracle::{BatchItem, Resolution, RetryPolicy, ReviewOracle, Verdict};
use bibsift::output::{csv_export, markdown, write_json};
use bibsift::pipeline::classify::classify;
use bibsift::pipeline::RunOptions;
use bibsift::text::Stopwords;

const LIBRARY: &str = r#"
@article{a1,
  title = {Large Language Models in \textit{Introductory} Programming},
  abstract = {We examine how novices use large language models for programming help.},
  doi = {10.1145/1000.0001}
}
@article{a2,
  title = {Automated Feedback with Large Language Models},
  abstract = {Large language models generate feedback on programming assignments.},
  doi = {https://doi.org/10.1145/1000.0002}
}
@inproceedings{a3,
  title = {Pair Programming Revisited},
  abstract = {A study of pair programming in classrooms.},
  doi = {doi:10.1145/1000.0003}
}
@inproceedings{a2dup,
  title = {Automated Feedback with Large Language Models (extended)},
  doi = {10.1145/1000.0002}
}
@misc{nodoi,
  title = {Mystery Notes on Compilers}
}
@article{broken, title = }
"#;

const REFERENCE: &str = "# reviewers' list\n10.1145/1000.0001\nhttps://dx.doi.org/10.1145/1000.0003\n10.1145/9999.9999\nnot-a-doi\n";

/// Labels records by keyword; refuses anything mentioning "mystery".
struct KeywordOracle;

#[async_trait]
impl ReviewOracle for KeywordOracle {
    async fn resolve(&self, title: &str) -> ReviewResult<Resolution> {
        Err(ReviewError::NotFound(title.to_string()))
    }

    async fn classify(&self, batch: &[BatchItem]) -> ReviewResult<Vec<Verdict>> {
        Ok(batch
            .iter()
            .map(|item| {
                let title = item.title.to_lowercase();
                if title.contains("mystery") {
                    Verdict::unclassified(&item.id)
                } else if title.contains("language models") {
                    Verdict::labeled(&item.id, "AI in Education")
                } else {
                    Verdict::labeled(&item.id, "Pedagogy")
                }
            })
            .collect())
    }
}

fn load() -> (Corpus, usize) {
    let parsed = bibtex::parse(LIBRARY);
    let skipped = parsed.skipped;
    (Corpus::build(parsed.records, &Canonicalizer::default()), skipped)
}

fn quick_options(batch_size: usize) -> RunOptions {
    RunOptions {
        batch_size,
        retry: RetryPolicy::immediate(1),
        rate_limit_interval: Duration::ZERO,
        show_progress: false,
    }
}

// ============================================================
// Chain: BibTeX -> Corpus
// ============================================================

#[test]
fn bibliography_builds_deduplicated_corpus() {
    let (corpus, skipped) = load();
    assert_eq!(skipped, 1);
    assert_eq!(corpus.size(), 5);
    assert_eq!(corpus.stats().indexed, 3);
    assert_eq!(corpus.stats().duplicates, 1);
    assert_eq!(corpus.stats().without_identifier, 1);

    let first = corpus.lookup("10.1145/1000.0001").unwrap();
    assert_eq!(first.title, "Large Language Models in Programming");
    assert_eq!(first.key.as_deref(), Some("a1"));
}

// ============================================================
// Chain: Corpus -> Term stats
// ============================================================

#[test]
fn term_stats_over_parsed_corpus() {
    let (corpus, _) = load();
    let config = tfidf::TermStatsConfig {
        min_doc_freq: 2,
        max_doc_freq: tfidf::TermStatsConfig::max_doc_freq_from_ratio(0.8, corpus.size()),
        ..tfidf::TermStatsConfig::default()
    };
    let stop = Stopwords::from_words(["with", "for", "how", "use"]);
    let stats = tfidf::compute(&corpus, &config, &stop).unwrap();

    let terms: Vec<&str> = stats.terms.iter().map(|t| t.term.as_str()).collect();
    assert!(terms.contains(&"language"));
    assert!(terms.contains(&"models"));
    // Appears in one record only.
    assert!(!terms.contains(&"compilers"));
    // The markup command and its argument never reach the vocabulary.
    assert!(!terms.contains(&"textit"));
    assert!(!terms.contains(&"introductory"));
    for term in &stats.terms {
        assert!(term.doc_freq >= 2 && term.doc_freq <= 4);
    }
}

// ============================================================
// Chain: Reference list -> Overlap
// ============================================================

#[test]
fn reference_list_overlap() {
    let (corpus, _) = load();
    let canon = Canonicalizer::default();
    let reference = parse_identifier_list(REFERENCE);
    let result = overlap::compare(&reference, &corpus, &canon);

    assert_eq!(result.reference_total, 3);
    assert_eq!(result.overlap.len(), 2);
    assert_eq!(result.missing.len(), 1);
    assert_eq!(result.malformed, vec!["not-a-doi".to_string()]);
    assert!((result.overlap_percent() - 200.0 / 3.0).abs() < 1e-9);
}

#[test]
fn topics_over_parsed_corpus() {
    let (corpus, _) = load();
    let phrases = topics::parse_topics("large language models\npair programming\nquantum\n");
    let freq = topics::topic_frequency(&corpus, &phrases, false);

    assert_eq!(freq.topics[0].topic, "large language models");
    assert_eq!(freq.topics[0].count, 3);
    assert_eq!(freq.topics[1].count, 1);
    assert_eq!(freq.topics[2].count, 0);
    assert_eq!(freq.unmatched_records, 1);
}

// ============================================================
// Chain: Corpus -> Classification -> Reports
// ============================================================

#[tokio::test]
async fn classification_feeds_reports() {
    let (corpus, _) = load();
    let run = classify(&corpus, &KeywordOracle, &quick_options(2), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outcomes.len(), corpus.size());
    assert_eq!(run.distribution.count("AI in Education"), 3);
    assert_eq!(run.distribution.count("Pedagogy"), 1);
    assert_eq!(run.distribution.unclassified(), 1);
    assert_eq!(run.outcomes[3].record, "#3");
    assert_eq!(run.outcomes[4].record, "#4");

    let md = markdown::classification_report(&run, &corpus);
    assert!(md.contains("# Classification Report"));
    assert!(md.contains("| AI in Education | 3 | 60.0% |"));
    assert!(md.contains("| _unclassified_ | 1 | 20.0% |"));
    assert!(md.contains("Mystery Notes on Compilers"));

    let path = std::env::temp_dir().join("bibsift_composition_run.json");
    write_json(&path, &run).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 5);
    assert_eq!(json["outcomes"][4]["label"], "unclassified");
    let _ = std::fs::remove_file(&path);
}

fn read_csv(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[test]
fn records_export_as_csv() {
    let (corpus, _) = load();
    let (headers, rows) = read_csv(&csv_export::records_csv(&corpus).unwrap());

    assert_eq!(headers, vec!["DOI", "Title"]);
    assert_eq!(rows.len(), 5);
    assert_eq!(
        rows[0],
        vec![
            "https://doi.org/10.1145/1000.0001",
            "Large Language Models in Programming"
        ]
    );
    assert_eq!(rows[4], vec!["", "Mystery Notes on Compilers"]);
}

#[tokio::test]
async fn classification_exports_as_csv() {
    let (corpus, _) = load();
    let run = classify(&corpus, &KeywordOracle, &quick_options(3), &CancellationToken::new())
        .await
        .unwrap();
    let (headers, rows) = read_csv(&csv_export::classification_csv(&run, &corpus).unwrap());

    assert_eq!(headers, vec!["DOI", "Title", "Category", "Description", "Error"]);
    assert_eq!(rows.len(), corpus.size());
    assert_eq!(rows[0][0], "https://doi.org/10.1145/1000.0001");
    assert_eq!(rows[0][2], "AI in Education");
    assert_eq!(rows[2][2], "Pedagogy");
    assert_eq!(rows[4][0], "");
    assert_eq!(rows[4][2], "unclassified");
}

#[test]
fn per_record_terms_over_parsed_corpus() {
    let (corpus, _) = load();
    let config = tfidf::TermStatsConfig {
        top_n: Some(3),
        ..tfidf::TermStatsConfig::from_ratio(2, 0.8, corpus.size())
    };
    let stop = Stopwords::from_words(["with", "for", "how", "use"]);
    let rankings = tfidf::per_record(&corpus, &config, &stop).unwrap();

    assert_eq!(rankings.len(), corpus.size());
    assert_eq!(rankings[0].record, "10.1145/1000.0001");
    assert!(rankings.iter().all(|r| r.terms.len() <= 3));
    // Every term in the mystery record appears only there.
    assert!(rankings[4].terms.is_empty());

    let (headers, rows) = read_csv(&csv_export::record_terms_csv(&rankings).unwrap());
    assert_eq!(headers, vec!["record", "rank", "term", "doc_freq", "score"]);
    let total: usize = rankings.iter().map(|r| r.terms.len()).sum();
    assert_eq!(rows.len(), total);
}

#[tokio::test]
async fn filtered_classification_only_sends_reference_records() {
    let (corpus, _) = load();
    let canon = Canonicalizer::default();
    let reference = CanonicalSet::build(&canon, parse_identifier_list(REFERENCE));
    let restricted = corpus.restrict_to(&reference.identifiers);

    let run = classify(&restricted, &KeywordOracle, &quick_options(10), &CancellationToken::new())
        .await
        .unwrap();

    let records: Vec<&str> = run.outcomes.iter().map(|o| o.record.as_str()).collect();
    assert_eq!(records, vec!["10.1145/1000.0001", "10.1145/1000.0003"]);
    assert_eq!(run.distribution.count("Pedagogy"), 1);
}
