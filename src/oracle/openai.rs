// Chat-completions batch classifier.
//
// One request per batch. The model gets every item's id, title and abstract
// and is asked for a JSON object `{"results": [{"id", "category",
// "description"}]}`. A null, empty or "unknown" category means the model
// couldn't place that item; the pipeline marks it unclassified. Checking that
// the verdicts cover the batch is the pipeline's job.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::debug;

use super::http::{status_error, transport_error, USER_AGENT};
use super::traits::{BatchItem, Verdict};
use crate::error::{ReviewError, ReviewResult};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are an expert computer science researcher who categorizes \
papers and summarizes their contributions concisely.";

/// Category strings treated as "could not classify".
const UNKNOWN_CATEGORIES: &[&str] = &["unknown", "unknown category", "n/a", "none"];

pub struct OpenAiClassifier {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> ReviewResult<Self> {
        if api_key.is_empty() {
            return Err(ReviewError::InvalidConfig("OpenAI API key is empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ReviewError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub async fn classify(&self, batch: &[BatchItem]) -> ReviewResult<Vec<Verdict>> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(batch)?,
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("OpenAI", status, &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error("OpenAI", e))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReviewError::MalformedResponse("OpenAI returned no content".to_string()))?;

        debug!(items = batch.len(), response_chars = content.len(), "Classified batch");

        parse_verdicts(&content)
    }
}

/// The user prompt for one batch.
pub fn build_prompt(batch: &[BatchItem]) -> ReviewResult<String> {
    let papers = serde_json::to_string_pretty(batch)
        .map_err(|e| ReviewError::InvalidConfig(format!("Failed to encode batch: {e}")))?;

    Ok(format!(
        "For each paper below, based on its title and abstract, provide:\n\
         1. category: a specific computer science subject area (e.g. \"Machine Learning\", \
         \"Software Engineering\", \"Human-Computer Interaction\", \"Computer Security\", \
         \"Computing Education\").\n\
         2. description: one or two sentences on what the paper did and its main contribution.\n\
         If a paper cannot be categorized, use null for its category.\n\n\
         Respond with a JSON object of the form \
         {{\"results\": [{{\"id\": \"...\", \"category\": \"...\", \"description\": \"...\"}}]}} \
         with exactly one result per paper, using each paper's id unchanged.\n\n\
         Papers:\n{papers}"
    ))
}

/// Parse the model's JSON answer into verdicts.
///
/// Tolerates a Markdown code fence around the JSON.
pub fn parse_verdicts(content: &str) -> ReviewResult<Vec<Verdict>> {
    let json = strip_code_fence(content);
    let parsed: ClassificationPayload = serde_json::from_str(json)
        .map_err(|e| ReviewError::MalformedResponse(format!("classifier output is not valid JSON: {e}")))?;

    Ok(parsed
        .results
        .into_iter()
        .map(|r| Verdict {
            id: r.id,
            label: clean_category(r.category),
            description: r.description.filter(|d| !d.trim().is_empty()),
        })
        .collect())
}

fn clean_category(category: Option<String>) -> Option<String> {
    let category = category?.trim().to_string();
    let lowered = category.to_lowercase();
    if category.is_empty() || UNKNOWN_CATEGORIES.contains(&lowered.as_str()) {
        None
    } else {
        Some(category)
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

// --- Chat completions request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    results: Vec<PayloadEntry>,
}

#[derive(Debug, Deserialize)]
struct PayloadEntry {
    id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}
