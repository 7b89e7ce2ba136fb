// Crossref REST API client: title to DOI resolution and DOI lookups.
//
// Resolution uses the bibliographic query on `/works`, asks for the top five
// candidates sorted by relevance, and takes the first one that carries a
// DOI. A lookup fetches `/works/{doi}`; a 404 means the DOI isn't registered
// with Crossref. Crossref
// asks polite clients to identify themselves with a mailto in the
// User-Agent, so one is added when configured.
//
// API docs: https://api.crossref.org/swagger-ui/index.html

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::time::Duration;
use tracing::debug;

use super::http::{status_error, transport_error, USER_AGENT};
use super::traits::{Confidence, IdentifierRegistry, Resolution};
use crate::error::{ReviewError, ReviewResult};

pub const DEFAULT_CROSSREF_URL: &str = "https://api.crossref.org";

/// Candidates requested per query.
const ROWS: &str = "5";

pub struct CrossrefClient {
    client: Client,
    base_url: String,
}

impl CrossrefClient {
    /// Create a client for `base_url`, optionally announcing a contact address.
    pub fn new(base_url: &str, mailto: Option<&str>) -> ReviewResult<Self> {
        let user_agent = match mailto {
            Some(mail) if !mail.is_empty() => format!("{USER_AGENT} (mailto:{mail})"),
            _ => USER_AGENT.to_string(),
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReviewError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a title to the best-matching work's DOI.
    pub async fn resolve(&self, title: &str) -> ReviewResult<Resolution> {
        let url = format!("{}/works", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query.bibliographic", title),
                ("rows", ROWS),
                ("sort", "score"),
                ("select", "DOI,title,score"),
            ])
            .send()
            .await
            .map_err(|e| transport_error("Crossref", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Crossref", status, &body));
        }

        let body: WorksResponse = response
            .json()
            .await
            .map_err(|e| transport_error("Crossref", e))?;

        debug!(
            query = crate::output::truncate_chars(title, 60),
            candidates = body.message.items.len(),
            "Crossref search"
        );

        best_match(title, &body.message.items)
            .ok_or_else(|| ReviewError::NotFound(format!("no Crossref match for {title:?}")))
    }
}

impl CrossrefClient {
    /// URL of the work record for `doi`, with the DOI as one encoded path
    /// segment.
    pub fn work_url(&self, doi: &str) -> ReviewResult<Url> {
        let mut url = Url::parse(&format!("{}/works", self.base_url))
            .map_err(|e| ReviewError::InvalidConfig(format!("Bad Crossref URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ReviewError::InvalidConfig(format!("Bad Crossref URL: {}", self.base_url)))?
            .push(doi);
        Ok(url)
    }

    /// Fetch the work registered under `doi`.
    pub async fn work(&self, doi: &str) -> ReviewResult<Work> {
        let response = self
            .client
            .get(self.work_url(doi)?)
            .send()
            .await
            .map_err(|e| transport_error("Crossref", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Crossref", status, &body));
        }

        let body: WorkResponse = response
            .json()
            .await
            .map_err(|e| transport_error("Crossref", e))?;
        debug!(doi, "Crossref work lookup");
        Ok(body.message)
    }
}

#[async_trait]
impl IdentifierRegistry for CrossrefClient {
    async fn registered_title(&self, identifier: &str) -> ReviewResult<Option<String>> {
        let work = self.work(identifier).await?;
        Ok(work.title.into_iter().find(|t| !t.trim().is_empty()))
    }
}

/// Pick the first candidate with a DOI and grade the title match.
pub fn best_match(query: &str, works: &[Work]) -> Option<Resolution> {
    let work = works.iter().find(|w| !w.doi.trim().is_empty())?;
    let matched_title = work.title.first().cloned();

    let confidence = match &matched_title {
        Some(found) if titles_match(query, found) => Confidence::Exact,
        _ => Confidence::Partial,
    };

    Some(Resolution {
        identifier: work.doi.clone(),
        matched_title,
        confidence,
    })
}

/// Case- and whitespace-insensitive containment either way.
fn titles_match(a: &str, b: &str) -> bool {
    let a = squash(a);
    let b = squash(b);
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

fn squash(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// --- Crossref response types ---

#[derive(Debug, Deserialize)]
pub struct WorksResponse {
    pub message: WorksMessage,
}

/// Response of `/works/{doi}`.
#[derive(Debug, Deserialize)]
pub struct WorkResponse {
    pub message: Work,
}

#[derive(Debug, Deserialize)]
pub struct WorksMessage {
    #[serde(default)]
    pub items: Vec<Work>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Work {
    #[serde(rename = "DOI", default)]
    pub doi: String,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
}
