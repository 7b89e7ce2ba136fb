// Topic frequency: how many records mention each phrase of a topic list.
//
// Matching is substring containment on the normalized title + abstract,
// case-insensitive by default. Each record counts at most once per topic.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::corpus::Corpus;

/// Records matching one topic phrase.
#[derive(Debug, Clone, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
    /// `Corpus::record_ref` of every matching record, in corpus order.
    pub records: Vec<String>,
}

/// Topic table for a corpus.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicFrequency {
    /// Ranked by count descending, then topic.
    pub topics: Vec<TopicCount>,
    pub corpus_size: usize,
    /// Records that matched no topic at all.
    pub unmatched_records: usize,
}

/// Count records mentioning each topic.
pub fn topic_frequency(corpus: &Corpus, topics: &[String], case_sensitive: bool) -> TopicFrequency {
    let needles: Vec<String> = topics
        .iter()
        .map(|t| if case_sensitive { t.clone() } else { t.to_lowercase() })
        .collect();

    let mut counts: Vec<TopicCount> = topics
        .iter()
        .map(|topic| TopicCount {
            topic: topic.clone(),
            count: 0,
            records: Vec::new(),
        })
        .collect();
    let mut unmatched_records = 0;

    for (position, record) in corpus.all_records().enumerate() {
        let text = record.text();
        let haystack = if case_sensitive { text } else { text.to_lowercase() };

        let mut matched = false;
        for (needle, count) in needles.iter().zip(counts.iter_mut()) {
            if !needle.is_empty() && haystack.contains(needle.as_str()) {
                count.count += 1;
                count.records.push(corpus.record_ref(position));
                matched = true;
            }
        }
        if !matched {
            unmatched_records += 1;
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));

    info!(
        topics = counts.len(),
        records = corpus.size(),
        unmatched = unmatched_records,
        "Computed topic frequency"
    );

    TopicFrequency {
        topics: counts,
        corpus_size: corpus.size(),
        unmatched_records,
    }
}

/// Read a topic list, one phrase per line, blank lines ignored.
pub fn read_topics_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read topics file {}", path.display()))?;
    Ok(parse_topics(&text))
}

pub fn parse_topics(text: &str) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !topics.iter().any(|t| t == line) {
            topics.push(line.to_string());
        }
    }
    topics
}
