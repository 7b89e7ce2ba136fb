// Identifier resolution for records that arrived without one.
//
// Some sources export entries with no DOI. For each such record we ask the
// oracle to resolve the title, one paced call at a time under the same retry
// policy as classification. Returned identifiers are canonicalized before
// they're reported; one that doesn't canonicalize counts as a failure.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{progress_bar, RunOptions};
use crate::corpus::Corpus;
use crate::error::ReviewError;
use crate::identifier::Canonicalizer;
use crate::oracle::{Confidence, Pacer, ReviewOracle};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved {
        identifier: String,
        confidence: Confidence,
        matched_title: Option<String>,
    },
    NotFound,
    Failed {
        error: ReviewError,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionEntry {
    pub position: usize,
    pub key: Option<String>,
    pub title: String,
    pub status: ResolutionStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub entries: Vec<ResolutionEntry>,
    /// Records that had an identifier and were not queried.
    pub already_identified: usize,
    /// Records without an identifier and without a title to search for.
    pub skipped_no_title: usize,
    /// Records not queried because the run was cancelled.
    pub skipped_cancelled: usize,
    pub cancelled: bool,
}

impl ResolutionReport {
    pub fn resolved(&self) -> usize {
        self.count(|s| matches!(s, ResolutionStatus::Resolved { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|s| matches!(s, ResolutionStatus::NotFound))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ResolutionStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ResolutionStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Resolve identifiers for every record that lacks one.
///
/// `options.batch_size` is not used; titles are resolved one by one.
pub async fn resolve_missing(
    corpus: &Corpus,
    oracle: &dyn ReviewOracle,
    canon: &Canonicalizer,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> ResolutionReport {
    let mut report = ResolutionReport::default();

    let pending: Vec<(usize, &crate::corpus::Record)> = corpus
        .all_records()
        .enumerate()
        .filter(|(_, record)| {
            if record.identifier.is_some() {
                report.already_identified += 1;
                false
            } else if record.title.is_empty() {
                report.skipped_no_title += 1;
                false
            } else {
                true
            }
        })
        .collect();

    info!(
        pending = pending.len(),
        already_identified = report.already_identified,
        "Resolving missing identifiers"
    );

    let mut pacer = Pacer::new(options.rate_limit_interval);
    let pb = progress_bar(pending.len(), "Resolving", options.show_progress);

    for (done, &(position, record)) in pending.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            report.skipped_cancelled = pending.len() - done;
            warn!(remaining = report.skipped_cancelled, "Resolution cancelled");
            break;
        }

        let title = record.title.as_str();
        let what = format!("resolve #{position}");
        let result = options
            .retry
            .run(&mut pacer, &what, || oracle.resolve(title))
            .await;

        let status = match result {
            Ok(resolution) => match canon.canonicalize(&resolution.identifier) {
                Ok(identifier) => ResolutionStatus::Resolved {
                    identifier,
                    confidence: resolution.confidence,
                    matched_title: resolution.matched_title,
                },
                Err(error) => ResolutionStatus::Failed { error },
            },
            Err(ReviewError::NotFound(_)) => ResolutionStatus::NotFound,
            Err(error) => ResolutionStatus::Failed { error },
        };

        report.entries.push(ResolutionEntry {
            position,
            key: record.key.clone(),
            title: record.title.clone(),
            status,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        resolved = report.resolved(),
        not_found = report.not_found(),
        failed = report.failed(),
        "Resolution run finished"
    );

    report
}
