// Batch classification of corpus records through a ReviewOracle.
//
// Records are cut into consecutive batches of at most `batch_size`, in corpus
// order. Each batch is one paced oracle call under the run's retry policy.
//
// Failure handling, from coarse to fine:
// - a batch that keeps failing (outage, unparseable answer, verdicts that
//   don't line up with the batch) gets every record marked unclassified with
//   the error attached, and the run moves on to the next batch;
// - a verdict without a label marks only that record unclassified;
// - cancellation is checked before each batch; once seen, no more oracle
//   calls are made and the outcomes so far are returned.
//
// Outcomes come back in corpus order, one per processed record.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::distribution::{LabelDistribution, UNCLASSIFIED};
use super::{progress_bar, RunOptions};
use crate::corpus::Corpus;
use crate::error::{ReviewError, ReviewResult};
use crate::oracle::{BatchItem, Pacer, ReviewOracle, Verdict};

/// A record's label, or the explicit unclassified marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Assigned(String),
    Unclassified,
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Assigned(name) => name,
            Label::Unclassified => UNCLASSIFIED,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Label::Unclassified)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result for one record.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationOutcome {
    /// `Corpus::record_ref`: identifier, or `#<position>`.
    pub record: String,
    pub position: usize,
    pub label: Label,
    pub description: Option<String>,
    /// Set only when the record's batch failed for good.
    pub error: Option<ReviewError>,
}

/// Everything a classification run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRun {
    pub outcomes: Vec<ClassificationOutcome>,
    pub distribution: LabelDistribution,
    /// Records in the corpus handed to the run.
    pub input_records: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub cancelled: bool,
}

impl ClassificationRun {
    /// Records never sent because the run was cancelled.
    pub fn skipped(&self) -> usize {
        self.input_records - self.outcomes.len()
    }

    /// Records that ended up with an error attached.
    pub fn errored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Classify every record of `corpus`.
///
/// Only a zero `batch_size` fails the run; oracle trouble is recorded per
/// record.
pub async fn classify(
    corpus: &Corpus,
    oracle: &dyn ReviewOracle,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> ReviewResult<ClassificationRun> {
    if options.batch_size == 0 {
        return Err(ReviewError::InvalidConfig(
            "batch_size must be at least 1".to_string(),
        ));
    }

    let items: Vec<BatchItem> = corpus
        .all_records()
        .enumerate()
        .map(|(position, record)| BatchItem {
            id: corpus.record_ref(position),
            title: record.title.clone(),
            abstract_text: record.abstract_text.clone(),
        })
        .collect();

    let total_batches = items.len().div_ceil(options.batch_size);
    info!(
        records = items.len(),
        batches = total_batches,
        batch_size = options.batch_size,
        "Starting classification run"
    );

    let mut pacer = Pacer::new(options.rate_limit_interval);
    let pb = progress_bar(items.len(), "Classifying", options.show_progress);

    let mut outcomes: Vec<ClassificationOutcome> = Vec::with_capacity(items.len());
    let mut batches = 0;
    let mut failed_batches = 0;
    let mut cancelled = false;

    for (batch_no, chunk) in items.chunks(options.batch_size).enumerate() {
        if cancel.is_cancelled() {
            warn!(
                completed_batches = batch_no,
                remaining_records = items.len() - outcomes.len(),
                "Classification cancelled"
            );
            cancelled = true;
            break;
        }

        let first_position = outcomes.len();
        let what = format!("batch {}/{}", batch_no + 1, total_batches);

        let result = options
            .retry
            .run(&mut pacer, &what, || async move {
                let verdicts = oracle.classify(chunk).await?;
                align_verdicts(chunk, verdicts)
            })
            .await;
        batches += 1;

        match result {
            Ok(verdicts) => {
                for (offset, (item, verdict)) in chunk.iter().zip(verdicts).enumerate() {
                    let label = match verdict.label {
                        Some(name) => Label::Assigned(name),
                        None => Label::Unclassified,
                    };
                    outcomes.push(ClassificationOutcome {
                        record: item.id.clone(),
                        position: first_position + offset,
                        label,
                        description: verdict.description,
                        error: None,
                    });
                }
            }
            Err(err) => {
                failed_batches += 1;
                warn!(batch = %what, records = chunk.len(), error = %err, "Batch failed, marking unclassified");
                for (offset, item) in chunk.iter().enumerate() {
                    outcomes.push(ClassificationOutcome {
                        record: item.id.clone(),
                        position: first_position + offset,
                        label: Label::Unclassified,
                        description: None,
                        error: Some(err.clone()),
                    });
                }
            }
        }

        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let distribution = LabelDistribution::from_outcomes(&outcomes);

    info!(
        classified = outcomes.len() - distribution.unclassified(),
        unclassified = distribution.unclassified(),
        failed_batches,
        cancelled,
        "Classification run finished"
    );

    Ok(ClassificationRun {
        outcomes,
        distribution,
        input_records: items.len(),
        batches,
        failed_batches,
        cancelled,
    })
}

/// Put verdicts into batch order with blank labels normalized to `None`.
///
/// A missing, duplicated or unknown id means the answer can't be trusted for
/// this batch: that's a malformed response.
fn align_verdicts(batch: &[BatchItem], verdicts: Vec<Verdict>) -> ReviewResult<Vec<Verdict>> {
    if verdicts.len() != batch.len() {
        return Err(ReviewError::MalformedResponse(format!(
            "expected {} verdicts, got {}",
            batch.len(),
            verdicts.len()
        )));
    }

    let mut by_id: HashMap<String, Verdict> = HashMap::with_capacity(verdicts.len());
    for verdict in verdicts {
        let id = verdict.id.clone();
        if by_id.insert(id.clone(), verdict).is_some() {
            return Err(ReviewError::MalformedResponse(format!(
                "duplicate verdict for {id}"
            )));
        }
    }

    batch
        .iter()
        .map(|item| {
            let mut verdict = by_id.remove(&item.id).ok_or_else(|| {
                ReviewError::MalformedResponse(format!("no verdict for {}", item.id))
            })?;
            verdict.label = verdict
                .label
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty());
            Ok(verdict)
        })
        .collect()
}
