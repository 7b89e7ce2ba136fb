// Error taxonomy shared by the corpus, analysis, and oracle layers.
//
// Identifier and text errors are local: the caller skips or flags the
// offending record. Oracle errors are recovered at batch granularity by the
// classification pipeline. Only configuration errors are fatal to a run.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ReviewError {
    /// Input could not be read as an identifier (empty, wrong shape, or
    /// wrapped in an unrecognized resolver prefix).
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Lookup miss. Not an error state for the run.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external oracle failed transiently (timeout, rate limit, 5xx).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The oracle answered, but not in a shape we can map onto the batch.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Terminal for a batch; recorded per record.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReviewError {
    /// Whether the retry policy should try the same request again.
    ///
    /// A malformed response is treated like an outage: the next attempt may
    /// well come back clean.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReviewError::ServiceUnavailable(_) | ReviewError::MalformedResponse(_)
        )
    }
}

pub type ReviewResult<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ReviewError::ServiceUnavailable("429".into()).is_transient());
        assert!(ReviewError::MalformedResponse("not json".into()).is_transient());
        assert!(!ReviewError::NotFound("x".into()).is_transient());
        assert!(!ReviewError::InvalidConfig("batch_size".into()).is_transient());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = ReviewError::RetriesExhausted {
            attempts: 4,
            last_error: "boom".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "RetriesExhausted");
        assert_eq!(json["detail"]["attempts"], 4);
    }
}
