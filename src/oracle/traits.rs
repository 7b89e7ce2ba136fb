// Oracle capability trait: the swap-ready abstraction over external services.
//
// The pipeline only ever talks to a ReviewOracle. The production oracle
// combines Crossref (title -> DOI) and a chat-completions classifier; tests
// plug in scripted in-memory oracles. Pacing and retries are the pipeline's
// job, never the oracle's: an implementation makes exactly one attempt per
// call and reports what happened.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReviewResult;

/// One record as handed to the classifier.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    /// `Corpus::record_ref` of the record: identifier, or `#<position>`.
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// The classifier's answer for one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: String,
    /// `None` when the oracle explicitly could not classify this item.
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Verdict {
    pub fn labeled(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            description: None,
        }
    }

    pub fn unclassified(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            description: None,
        }
    }
}

/// How closely a resolved identifier's title matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    /// One title contains the other (case-insensitive).
    Exact,
    /// Best-ranked candidate, titles differ.
    Partial,
}

/// A title resolved to an identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// As returned by the service; the pipeline canonicalizes it.
    pub identifier: String,
    pub matched_title: Option<String>,
    pub confidence: Confidence,
}

/// External services the review pipeline depends on.
///
/// Failures come back as `ReviewError`: `NotFound` for a clean miss,
/// `ServiceUnavailable` for transient trouble, `MalformedResponse` when the
/// service answered with something unusable.
#[async_trait]
pub trait ReviewOracle: Send + Sync {
    /// Find the identifier of the work with this title.
    async fn resolve(&self, title: &str) -> ReviewResult<Resolution>;

    /// Classify a batch, returning one verdict per item.
    async fn classify(&self, batch: &[BatchItem]) -> ReviewResult<Vec<Verdict>>;
}

/// A registry that can say whether an identifier is registered.
///
/// Kept apart from `ReviewOracle`: validation is its own run with its own
/// subcommand, and stubs for classification never need to answer it.
#[async_trait]
pub trait IdentifierRegistry: Send + Sync {
    /// Title of the work registered under a canonical `identifier` (`None`
    /// when the registry has no title for it). `NotFound` when nothing is
    /// registered under it.
    async fn registered_title(&self, identifier: &str) -> ReviewResult<Option<String>>;
}
