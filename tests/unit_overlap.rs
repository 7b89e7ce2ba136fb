// Unit tests for reference overlap and topic frequency.
//
// Both analyses read a built corpus; these tests cover the coverage
// arithmetic, malformed reference entries, and topic matching rules.

use bibsift::analysis::overlap::{compare, compare_canonical};
use bibsift::analysis::topics::{parse_topics, topic_frequency};
use bibsift::bibtex;
use bibsift::corpus::{Corpus, RawRecord};
use bibsift::identifier::list::CanonicalSet;
use bibsift::identifier::Canonicalizer;

fn three_record_corpus() -> Corpus {
    Corpus::build(
        vec![
            RawRecord::new().with_field("doi", "10.1/ABC"),
            RawRecord::new().with_field("doi", "https://doi.org/10.1/ABC"),
            RawRecord::new().with_field("doi", "10.1/xyz"),
        ],
        &Canonicalizer::default(),
    )
}

// ============================================================
// Overlap
// ============================================================

#[test]
fn half_of_reference_found() {
    let corpus = three_record_corpus();
    let result = compare(["10.1/abc", "10.1/missing"], &corpus, &Canonicalizer::default());

    assert_eq!(result.reference_total, 2);
    assert_eq!(result.corpus_total, 2);
    assert_eq!(result.overlap.iter().collect::<Vec<_>>(), vec!["10.1/abc"]);
    assert_eq!(result.missing.iter().collect::<Vec<_>>(), vec!["10.1/missing"]);
    assert!((result.overlap_percent() - 50.0).abs() < 1e-9);
    assert!((result.missing_percent() - 50.0).abs() < 1e-9);
    assert_eq!(format!("{:.1}", result.overlap_percent()), "50.0");
}

#[test]
fn reference_entries_are_canonicalized() {
    let corpus = three_record_corpus();
    let result = compare(
        ["https://dx.doi.org/10.1/XYZ", "doi:10.1/abc"],
        &corpus,
        &Canonicalizer::default(),
    );
    assert_eq!(result.overlap.len(), 2);
    assert!(result.missing.is_empty());
    assert!((result.overlap_percent() - 100.0).abs() < 1e-9);
}

#[test]
fn empty_reference_reports_zero_percent() {
    let corpus = three_record_corpus();
    let result = compare(Vec::<String>::new(), &corpus, &Canonicalizer::default());
    assert_eq!(result.reference_total, 0);
    assert!(result.overlap.is_empty());
    assert!(result.missing.is_empty());
    assert_eq!(result.overlap_percent(), 0.0);
    assert_eq!(result.missing_percent(), 0.0);
}

#[test]
fn malformed_entries_are_counted_not_matched() {
    let corpus = three_record_corpus();
    let result = compare(
        ["10.1/abc", "not-an-id", "", "https://example.com/10.1/xyz"],
        &corpus,
        &Canonicalizer::default(),
    );
    assert_eq!(result.malformed.len(), 3);
    assert_eq!(result.reference_total, 1);
    assert_eq!(result.overlap.len(), 1);
}

#[test]
fn overlap_plus_missing_is_distinct_valid_reference() {
    let corpus = three_record_corpus();
    let raw = [
        "10.1/abc",
        "10.1/ABC",
        "10.1/xyz",
        "10.1/one",
        "10.1/two",
        "junk",
        "10.1/two",
    ];
    let canon = Canonicalizer::default();
    let reference = CanonicalSet::build(&canon, raw);
    let result = compare_canonical(&reference, &corpus);

    assert_eq!(result.overlap.len() + result.missing.len(), result.reference_total);
    assert_eq!(
        result.reference_total + result.malformed.len() + result.collapsed,
        raw.len()
    );
    assert_eq!(result.collapsed, 2);
    assert!(result.overlap.is_disjoint(&result.missing));
}

#[test]
fn empty_corpus_misses_everything() {
    let corpus = Corpus::build(Vec::new(), &Canonicalizer::default());
    let result = compare(["10.1/a"], &corpus, &Canonicalizer::default());
    assert_eq!(result.corpus_total, 0);
    assert_eq!(result.missing.len(), 1);
    assert!((result.missing_percent() - 100.0).abs() < 1e-9);
}

// ============================================================
// Topic frequency
// ============================================================

fn topic_corpus() -> Corpus {
    Corpus::build(
        vec![
            RawRecord::new()
                .with_field("doi", "10.1/a")
                .with_field("title", "Large Language Models in CS1"),
            RawRecord::new()
                .with_field("doi", "10.1/b")
                .with_field("title", "Automated feedback")
                .with_field("abstract", "We use large language models for hints."),
            RawRecord::new().with_field("title", "Pair programming"),
        ],
        &Canonicalizer::default(),
    )
}

#[test]
fn topics_count_matching_records() {
    let corpus = topic_corpus();
    let topics = vec!["large language models".to_string(), "feedback".to_string()];
    let freq = topic_frequency(&corpus, &topics, false);

    assert_eq!(freq.corpus_size, 3);
    assert_eq!(freq.topics[0].topic, "large language models");
    assert_eq!(freq.topics[0].count, 2);
    assert_eq!(freq.topics[0].records, vec!["10.1/a", "10.1/b"]);
    assert_eq!(freq.topics[1].count, 1);
    assert_eq!(freq.unmatched_records, 1);
}

#[test]
fn case_sensitive_matching() {
    let corpus = topic_corpus();
    let topics = vec!["Large Language Models".to_string()];
    let freq = topic_frequency(&corpus, &topics, true);
    assert_eq!(freq.topics[0].count, 1);
}

#[test]
fn zero_count_topics_are_kept_and_ranked_last() {
    let corpus = topic_corpus();
    let topics = vec!["quantum".to_string(), "pair programming".to_string()];
    let freq = topic_frequency(&corpus, &topics, false);
    assert_eq!(freq.topics.len(), 2);
    assert_eq!(freq.topics[0].topic, "pair programming");
    assert_eq!(freq.topics[1].count, 0);
    assert_eq!(freq.topics[0].records, vec!["#2"]);
}

#[test]
fn brace_protected_titles_match_topics() {
    let parsed = bibtex::parse(
        r"@article{k1, title = {The {ChatGPT} Effect on \textbf{\emph{Novice}} Programmers}, doi = {10.1/c}}",
    );
    let corpus = Corpus::build(parsed.records, &Canonicalizer::default());
    assert_eq!(corpus.lookup("10.1/c").unwrap().title, "The ChatGPT Effect on Programmers");

    let topics = vec!["chatgpt effect".to_string()];
    let freq = topic_frequency(&corpus, &topics, false);
    assert_eq!(freq.topics[0].count, 1);
    assert_eq!(freq.topics[0].records, vec!["10.1/c"]);
}

#[test]
fn topic_list_skips_blanks_and_repeats() {
    let topics = parse_topics("  feedback \n\nfeedback\nLLM\n");
    assert_eq!(topics, vec!["feedback", "LLM"]);
}
