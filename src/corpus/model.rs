// The in-memory corpus: every ingested record in source order, plus an index
// from canonical identifier to the first record that carried it.
//
// Duplicate identifiers are common in a systematic review: the same paper
// comes back from several databases, once with a bare DOI and once wrapped in
// a resolver URL. The first record wins the index slot. Later duplicates stay
// in the record sequence (their text still counts for term statistics) but
// are never reachable by identifier.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use super::record::{RawRecord, Record, ABSTRACT_FIELD, IDENTIFIER_FIELDS, TITLE_FIELDS};
use crate::error::{ReviewError, ReviewResult};
use crate::identifier::Canonicalizer;
use crate::text::normalize;

/// An identifier field that failed canonicalization during ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedIdentifier {
    /// Position of the record in the corpus sequence.
    pub position: usize,
    pub raw: String,
}

/// What happened while building the corpus. Reports print these counts next
/// to their results so nothing is dropped silently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub total: usize,
    pub indexed: usize,
    /// Records whose identifier was already indexed by an earlier record.
    pub duplicates: usize,
    pub without_identifier: usize,
    pub without_text: usize,
    pub malformed: Vec<MalformedIdentifier>,
}

/// Read-only record store keyed by canonical identifier.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<Record>,
    index: HashMap<String, usize>,
    stats: IngestStats,
}

impl Corpus {
    /// Build a corpus from raw records.
    ///
    /// Identifiers are canonicalized; titles and abstracts are normalized.
    /// A malformed identifier doesn't drop the record, it just leaves it
    /// without one and is counted in `stats().malformed`.
    pub fn build<I>(raw_records: I, canon: &Canonicalizer) -> Self
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut corpus = Corpus::default();

        for raw in raw_records {
            let position = corpus.records.len();

            let identifier = match raw.first_field(IDENTIFIER_FIELDS) {
                Some(value) => match canon.canonicalize(value) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        debug!(position, error = %e, "Record has a malformed identifier");
                        corpus.stats.malformed.push(MalformedIdentifier {
                            position,
                            raw: value.to_string(),
                        });
                        None
                    }
                },
                None => None,
            };

            let title = normalize(raw.first_field(TITLE_FIELDS).unwrap_or_default());
            let abstract_text = normalize(raw.field(ABSTRACT_FIELD).unwrap_or_default());
            let key = raw.key.clone();

            corpus.push(Record {
                identifier,
                key,
                title,
                abstract_text,
                raw_fields: raw.into_fields(),
            });
        }

        info!(
            records = corpus.stats.total,
            indexed = corpus.stats.indexed,
            duplicates = corpus.stats.duplicates,
            malformed = corpus.stats.malformed.len(),
            "Built corpus"
        );

        corpus
    }

    /// Append a cleaned record, updating the index and counters.
    fn push(&mut self, record: Record) {
        let position = self.records.len();
        self.stats.total += 1;

        if !record.has_text() {
            self.stats.without_text += 1;
        }

        match &record.identifier {
            Some(id) => {
                if self.index.contains_key(id) {
                    debug!(identifier = %id, position, "Duplicate identifier, keeping first record");
                    self.stats.duplicates += 1;
                } else {
                    self.index.insert(id.clone(), position);
                    self.stats.indexed += 1;
                }
            }
            None => self.stats.without_identifier += 1,
        }

        self.records.push(record);
    }

    /// Every record in source order, duplicates included.
    pub fn all_records(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// The record that owns `identifier` in the index.
    ///
    /// `identifier` must already be canonical.
    pub fn lookup(&self, identifier: &str) -> ReviewResult<&Record> {
        self.index
            .get(identifier)
            .map(|&pos| &self.records[pos])
            .ok_or_else(|| ReviewError::NotFound(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Number of records, duplicates included.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Canonical identifiers in the index (one per distinct identifier).
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    /// Stable reference for the record at `position`: its identifier when it
    /// owns the index slot, otherwise `#<position>`. Unique within a corpus.
    pub fn record_ref(&self, position: usize) -> String {
        match self.records.get(position).and_then(|r| r.identifier.as_ref()) {
            Some(id) if self.index.get(id) == Some(&position) => id.clone(),
            _ => format!("#{position}"),
        }
    }

    /// A new corpus holding only the indexed records whose identifier is in
    /// `keep`, in source order.
    pub fn restrict_to(&self, keep: &BTreeSet<String>) -> Corpus {
        let mut positions: Vec<usize> = keep
            .iter()
            .filter_map(|id| self.index.get(id).copied())
            .collect();
        positions.sort_unstable();

        let mut restricted = Corpus::default();
        for pos in positions {
            restricted.push(self.records[pos].clone());
        }

        info!(
            kept = restricted.size(),
            requested = keep.len(),
            "Restricted corpus to reference identifiers"
        );
        restricted
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.all_records()
    }
}
