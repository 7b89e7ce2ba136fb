// The production oracle: Crossref for resolution, a chat-completions model
// for classification, plus the HTTP error mapping both clients share.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::crossref::CrossrefClient;
use super::openai::OpenAiClassifier;
use super::traits::{BatchItem, Resolution, ReviewOracle, Verdict};
use crate::error::{ReviewError, ReviewResult};

/// User-Agent sent to every service.
pub const USER_AGENT: &str = concat!("bibsift/", env!("CARGO_PKG_VERSION"));

/// Network-backed oracle.
pub struct HttpOracle {
    resolver: CrossrefClient,
    classifier: Option<OpenAiClassifier>,
}

impl HttpOracle {
    pub fn new(resolver: CrossrefClient, classifier: Option<OpenAiClassifier>) -> Self {
        Self {
            resolver,
            classifier,
        }
    }
}

#[async_trait]
impl ReviewOracle for HttpOracle {
    async fn resolve(&self, title: &str) -> ReviewResult<Resolution> {
        self.resolver.resolve(title).await
    }

    async fn classify(&self, batch: &[BatchItem]) -> ReviewResult<Vec<Verdict>> {
        match &self.classifier {
            Some(classifier) => classifier.classify(batch).await,
            None => Err(ReviewError::InvalidConfig(
                "no classifier configured (set OPENAI_API_KEY)".to_string(),
            )),
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn status_error(service: &str, status: StatusCode, body: &str) -> ReviewError {
    let detail = format!("{service} returned {status}: {}", crate::output::truncate_chars(body, 200));
    match status {
        StatusCode::NOT_FOUND => ReviewError::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ReviewError::InvalidConfig(detail),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            ReviewError::ServiceUnavailable(detail)
        }
        s if s.is_server_error() => ReviewError::ServiceUnavailable(detail),
        _ => ReviewError::MalformedResponse(detail),
    }
}

/// Map a transport-level reqwest failure onto the error taxonomy.
pub fn transport_error(service: &str, err: reqwest::Error) -> ReviewError {
    if err.is_decode() {
        ReviewError::MalformedResponse(format!("{service} response could not be decoded: {err}"))
    } else {
        ReviewError::ServiceUnavailable(format!("{service} request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error("x", StatusCode::NOT_FOUND, ""),
            ReviewError::NotFound(_)
        ));
        assert!(status_error("x", StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(status_error("x", StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(matches!(
            status_error("x", StatusCode::UNAUTHORIZED, ""),
            ReviewError::InvalidConfig(_)
        ));
    }
}
