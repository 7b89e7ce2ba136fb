// Identifier validation against a registry.
//
// Each distinct canonical identifier is looked up once, one paced call at a
// time under the run's retry policy. Entries that don't canonicalize are
// reported as malformed without a call. A registry miss is `Unregistered`;
// any other failure that survives the retries is `Failed` and is kept apart
// from the verdicts so an outage never reads as "invalid".

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{progress_bar, RunOptions};
use crate::error::ReviewError;
use crate::identifier::list::CanonicalSet;
use crate::oracle::{IdentifierRegistry, Pacer};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationStatus {
    Registered { title: Option<String> },
    Unregistered,
    Failed { error: ReviewError },
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationEntry {
    pub identifier: String,
    pub status: ValidationStatus,
}

impl ValidationEntry {
    pub fn is_registered(&self) -> bool {
        matches!(self.status, ValidationStatus::Registered { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Checked identifiers in canonical order.
    pub entries: Vec<ValidationEntry>,
    /// Entries that failed canonicalization, verbatim. Never sent.
    pub malformed: Vec<String>,
    /// Repeated spellings of an identifier already checked.
    pub collapsed: usize,
    /// Identifiers not checked because the run was cancelled.
    pub skipped_cancelled: usize,
    pub cancelled: bool,
}

impl ValidationReport {
    pub fn registered(&self) -> usize {
        self.entries.iter().filter(|e| e.is_registered()).count()
    }

    pub fn unregistered(&self) -> usize {
        self.count(|s| matches!(s, ValidationStatus::Unregistered))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ValidationStatus::Failed { .. }))
    }

    /// Share of checked identifiers that are registered, 0 when none were.
    pub fn registered_percent(&self) -> f64 {
        if self.entries.is_empty() {
            0.0
        } else {
            self.registered() as f64 / self.entries.len() as f64 * 100.0
        }
    }

    fn count(&self, pred: impl Fn(&ValidationStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Check every identifier of `set` against `registry`.
pub async fn validate_identifiers(
    set: &CanonicalSet,
    registry: &dyn IdentifierRegistry,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> ValidationReport {
    let mut report = ValidationReport {
        malformed: set.malformed.clone(),
        collapsed: set.collapsed,
        ..ValidationReport::default()
    };

    info!(
        identifiers = set.len(),
        malformed = set.malformed.len(),
        "Validating identifiers"
    );

    let mut pacer = Pacer::new(options.rate_limit_interval);
    let pb = progress_bar(set.len(), "Validating", options.show_progress);

    for (done, identifier) in set.identifiers.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            report.skipped_cancelled = set.len() - done;
            warn!(remaining = report.skipped_cancelled, "Validation cancelled");
            break;
        }

        let what = format!("lookup {identifier}");
        let status = match options
            .retry
            .run(&mut pacer, &what, || registry.registered_title(identifier))
            .await
        {
            Ok(title) => ValidationStatus::Registered { title },
            Err(ReviewError::NotFound(_)) => ValidationStatus::Unregistered,
            Err(error) => ValidationStatus::Failed { error },
        };

        report.entries.push(ValidationEntry {
            identifier: identifier.clone(),
            status,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        registered = report.registered(),
        unregistered = report.unregistered(),
        failed = report.failed(),
        "Validation run finished"
    );

    report
}
