// Corpus-level TF-IDF term statistics.
//
// Each record (title + abstract) is one document. For every retained term we
// count its document frequency (records containing it at least once) and its
// total occurrences across the corpus. Terms outside the configured document
// frequency bounds are dropped, and the survivors are scored as
//
//   score = (total occurrences) * ln(corpus size / document frequency)
//
// A term present in every record scores 0.0. Ranking is by score descending,
// ties broken alphabetically, so output is fully deterministic.
//
// `per_record` ranks each record's own terms by term frequency within the
// record times the same idf factor, for reading one paper's vocabulary.
//
// Counting is split into per-partition accumulators that are merged at the
// end. All counts are integers, so the merge order can't change the result.

use std::collections::{HashMap, HashSet};
use std::thread;

use serde::Serialize;
use tracing::{debug, info};

use crate::corpus::{Corpus, Record};
use crate::error::{ReviewError, ReviewResult};
use crate::text::{tokenize, Stopwords, DEFAULT_MIN_TERM_LEN};

/// Corpora at least this large are counted on several threads.
const PARALLEL_THRESHOLD: usize = 2048;

/// Bounds and limits for a term statistics run.
#[derive(Debug, Clone)]
pub struct TermStatsConfig {
    /// Drop terms found in fewer records than this.
    pub min_doc_freq: usize,
    /// Drop terms found in more records than this.
    pub max_doc_freq: usize,
    /// Tokens shorter than this (in chars) are discarded before counting.
    pub min_term_len: usize,
    /// Keep only the best N terms. `None` keeps everything.
    pub top_n: Option<usize>,
}

impl Default for TermStatsConfig {
    fn default() -> Self {
        Self {
            min_doc_freq: 1,
            max_doc_freq: usize::MAX,
            min_term_len: DEFAULT_MIN_TERM_LEN,
            top_n: None,
        }
    }
}

impl TermStatsConfig {
    /// Upper bound as a share of the corpus, e.g. 0.8 drops terms found in
    /// more than 80% of records. Rounds down.
    pub fn max_doc_freq_from_ratio(ratio: f64, corpus_size: usize) -> usize {
        (ratio.clamp(0.0, 1.0) * corpus_size as f64).floor() as usize
    }

    /// Bounds with the ceiling taken from a corpus share.
    ///
    /// The ceiling never drops below `min_doc_freq`: a corpus too small for
    /// the ratio gets a short (possibly empty) table, not inverted bounds.
    pub fn from_ratio(min_doc_freq: usize, max_doc_freq_ratio: f64, corpus_size: usize) -> Self {
        Self {
            min_doc_freq,
            max_doc_freq: Self::max_doc_freq_from_ratio(max_doc_freq_ratio, corpus_size)
                .max(min_doc_freq),
            ..Self::default()
        }
    }
}

/// One ranked term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermScore {
    pub term: String,
    pub doc_freq: usize,
    pub score: f64,
}

/// Ranked term table plus the counts a report needs to explain it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TermStats {
    pub terms: Vec<TermScore>,
    pub corpus_size: usize,
    /// Distinct terms seen before document frequency filtering.
    pub vocabulary_size: usize,
    /// Terms dropped for falling outside the document frequency bounds.
    pub filtered_out: usize,
    /// Records that contributed no terms at all.
    pub empty_records: usize,
}

/// Per-partition counts.
#[derive(Debug, Default)]
struct TermCounts {
    doc_freq: HashMap<String, usize>,
    occurrences: HashMap<String, usize>,
    empty_records: usize,
}

impl TermCounts {
    fn add_record(&mut self, record: &Record, min_len: usize, stopwords: &Stopwords) {
        let text = record.text();
        let mut seen: HashSet<String> = HashSet::new();

        for term in tokenize(&text, min_len).filter(|t| !stopwords.contains(t)) {
            *self.occurrences.entry(term.clone()).or_insert(0) += 1;
            seen.insert(term);
        }

        if seen.is_empty() {
            self.empty_records += 1;
        }
        for term in seen {
            *self.doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    fn merge(mut self, other: TermCounts) -> TermCounts {
        for (term, n) in other.doc_freq {
            *self.doc_freq.entry(term).or_insert(0) += n;
        }
        for (term, n) in other.occurrences {
            *self.occurrences.entry(term).or_insert(0) += n;
        }
        self.empty_records += other.empty_records;
        self
    }
}

/// Compute ranked term statistics over a corpus.
///
/// An empty corpus yields empty statistics whatever the bounds. Otherwise
/// `min_doc_freq > max_doc_freq` is a configuration error.
pub fn compute(
    corpus: &Corpus,
    config: &TermStatsConfig,
    stopwords: &Stopwords,
) -> ReviewResult<TermStats> {
    let corpus_size = corpus.size();
    if corpus_size == 0 {
        return Ok(TermStats::default());
    }
    check_bounds(config)?;

    let counts = count_terms(corpus, config.min_term_len, stopwords);
    let vocabulary_size = counts.doc_freq.len();

    let mut terms: Vec<TermScore> = counts
        .doc_freq
        .iter()
        .filter(|(_, df)| (config.min_doc_freq..=config.max_doc_freq).contains(*df))
        .map(|(term, &df)| {
            let occurrences = counts.occurrences.get(term).copied().unwrap_or(0);
            TermScore {
                term: term.clone(),
                doc_freq: df,
                score: occurrences as f64 * idf(corpus_size, df),
            }
        })
        .collect();

    let filtered_out = vocabulary_size - terms.len();

    terms.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    if let Some(n) = config.top_n {
        terms.truncate(n);
    }

    info!(
        records = corpus_size,
        vocabulary = vocabulary_size,
        kept = terms.len(),
        filtered_out,
        "Computed term statistics"
    );

    Ok(TermStats {
        terms,
        corpus_size,
        vocabulary_size,
        filtered_out,
        empty_records: counts.empty_records,
    })
}

/// One record's best terms.
#[derive(Debug, Clone, Serialize)]
pub struct RecordTerms {
    /// `Corpus::record_ref`: identifier, or `#<position>`.
    pub record: String,
    pub position: usize,
    pub title: String,
    pub terms: Vec<TermScore>,
}

/// Rank the terms of each record on its own.
///
/// A term's score in a record is its share of the record's retained tokens
/// times `ln(N / df)`. Only terms inside the document frequency bounds are
/// ranked; `config.top_n` limits each record's list. Every record gets an
/// entry, in corpus order, even when its list is empty.
pub fn per_record(
    corpus: &Corpus,
    config: &TermStatsConfig,
    stopwords: &Stopwords,
) -> ReviewResult<Vec<RecordTerms>> {
    let corpus_size = corpus.size();
    if corpus_size == 0 {
        return Ok(Vec::new());
    }
    check_bounds(config)?;

    let doc_freq = count_terms(corpus, config.min_term_len, stopwords).doc_freq;
    let in_bounds = |df: usize| (config.min_doc_freq..=config.max_doc_freq).contains(&df);

    let rankings: Vec<RecordTerms> = corpus
        .all_records()
        .enumerate()
        .map(|(position, record)| {
            let text = record.text();
            let mut counts: HashMap<String, usize> = HashMap::new();
            let mut total = 0usize;
            for term in tokenize(&text, config.min_term_len).filter(|t| !stopwords.contains(t)) {
                *counts.entry(term).or_insert(0) += 1;
                total += 1;
            }

            let mut terms: Vec<TermScore> = counts
                .into_iter()
                .filter_map(|(term, n)| {
                    let df = doc_freq.get(&term).copied().filter(|&df| in_bounds(df))?;
                    Some(TermScore {
                        score: n as f64 / total as f64 * idf(corpus_size, df),
                        doc_freq: df,
                        term,
                    })
                })
                .collect();
            terms.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
            if let Some(n) = config.top_n {
                terms.truncate(n);
            }

            RecordTerms {
                record: corpus.record_ref(position),
                position,
                title: record.title.clone(),
                terms,
            }
        })
        .collect();

    debug!(records = rankings.len(), "Ranked terms per record");
    Ok(rankings)
}

fn check_bounds(config: &TermStatsConfig) -> ReviewResult<()> {
    if config.min_doc_freq > config.max_doc_freq {
        return Err(ReviewError::InvalidConfig(format!(
            "min_doc_freq ({}) exceeds max_doc_freq ({})",
            config.min_doc_freq, config.max_doc_freq
        )));
    }
    Ok(())
}

/// Document frequency of every term, without bounds or ranking.
pub fn document_frequencies(
    corpus: &Corpus,
    min_term_len: usize,
    stopwords: &Stopwords,
) -> HashMap<String, usize> {
    count_terms(corpus, min_term_len, stopwords).doc_freq
}

/// `ln(N / df)`, with `df == N` (and the degenerate `df == 0`) yielding zero.
fn idf(corpus_size: usize, doc_freq: usize) -> f64 {
    if doc_freq == 0 || doc_freq >= corpus_size {
        0.0
    } else {
        (corpus_size as f64 / doc_freq as f64).ln()
    }
}

fn count_terms(corpus: &Corpus, min_len: usize, stopwords: &Stopwords) -> TermCounts {
    let records: Vec<&Record> = corpus.all_records().collect();

    let workers = thread::available_parallelism().map_or(1, |n| n.get());
    if records.len() < PARALLEL_THRESHOLD || workers < 2 {
        return count_partition(&records, min_len, stopwords);
    }

    let chunk_size = records.len().div_ceil(workers);
    debug!(workers, chunk_size, "Counting terms in parallel partitions");

    thread::scope(|scope| {
        let handles: Vec<_> = records
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || count_partition(chunk, min_len, stopwords)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .fold(TermCounts::default(), TermCounts::merge)
    })
}

fn count_partition(records: &[&Record], min_len: usize, stopwords: &Stopwords) -> TermCounts {
    let mut counts = TermCounts::default();
    for record in records {
        counts.add_record(record, min_len, stopwords);
    }
    counts
}
