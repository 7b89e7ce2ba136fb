// Reference-list coverage against a corpus.
//
// Answers "how many of the papers we expected did the search actually
// return?". Reference identifiers are canonicalized the same way the corpus
// was, so a bare DOI in the list matches a URL-wrapped DOI in the export.
// Entries that aren't identifiers at all are reported as malformed; they are
// neither matched nor counted as missing.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::corpus::Corpus;
use crate::identifier::list::CanonicalSet;
use crate::identifier::Canonicalizer;

/// Coverage of a reference list by a corpus.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverlapResult {
    /// Distinct valid reference identifiers.
    pub reference_total: usize,
    /// Distinct identifiers indexed in the corpus.
    pub corpus_total: usize,
    pub overlap: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Reference entries that failed canonicalization, verbatim.
    pub malformed: Vec<String>,
    /// Valid reference entries that repeated an identifier already listed.
    pub collapsed: usize,
}

impl OverlapResult {
    /// Share of the reference list found in the corpus, in percent.
    pub fn overlap_percent(&self) -> f64 {
        percent(self.overlap.len(), self.reference_total)
    }

    /// Share of the reference list absent from the corpus, in percent.
    pub fn missing_percent(&self) -> f64 {
        percent(self.missing.len(), self.reference_total)
    }
}

/// `part / whole` as a percentage; zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Compare raw reference identifiers against the corpus index.
pub fn compare<I, S>(reference: I, corpus: &Corpus, canon: &Canonicalizer) -> OverlapResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let reference = CanonicalSet::build(canon, reference);
    compare_canonical(&reference, corpus)
}

/// Compare an already canonicalized reference set against the corpus index.
pub fn compare_canonical(reference: &CanonicalSet, corpus: &Corpus) -> OverlapResult {
    let (overlap, missing): (BTreeSet<String>, BTreeSet<String>) = reference
        .identifiers
        .iter()
        .cloned()
        .partition(|id| corpus.contains(id));

    let result = OverlapResult {
        reference_total: reference.len(),
        corpus_total: corpus.stats().indexed,
        overlap,
        missing,
        malformed: reference.malformed.clone(),
        collapsed: reference.collapsed,
    };

    info!(
        reference = result.reference_total,
        corpus = result.corpus_total,
        overlap = result.overlap.len(),
        missing = result.missing.len(),
        malformed = result.malformed.len(),
        "Compared reference identifiers"
    );

    result
}
