use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use tokio::time::Duration;

use crate::identifier::{Canonicalizer, DEFAULT_PREFIXES};
use crate::oracle::crossref::DEFAULT_CROSSREF_URL;
use crate::oracle::openai::{DEFAULT_MODEL, DEFAULT_OPENAI_URL};
use crate::oracle::RetryPolicy;
use crate::pipeline::RunOptions;

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded automatically at
/// startup via dotenvy. Command-line flags override the run defaults here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key for the chat-completions classifier. Only `classify` needs it.
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub openai_model: String,
    pub crossref_api_url: String,
    /// Contact address for Crossref's polite pool (optional).
    pub crossref_mailto: Option<String>,
    /// Resolver prefixes stripped from identifiers (BIBSIFT_DOI_PREFIXES,
    /// comma-separated). Replaces the default list when set.
    pub doi_prefixes: Vec<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub rate_limit_interval: Duration,
    pub base_backoff: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the OpenAI key, which is checked by
    /// `require_openai` only when classification is requested.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let doi_prefixes = match get("BIBSIFT_DOI_PREFIXES") {
            Some(list) => list
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            None => DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        };

        let batch_size: usize = parse_var(&get, "BIBSIFT_BATCH_SIZE", 10)?;
        if batch_size == 0 {
            anyhow::bail!("BIBSIFT_BATCH_SIZE must be at least 1");
        }

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_api_url: get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            openai_model: get("BIBSIFT_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            crossref_api_url: get("CROSSREF_API_URL")
                .unwrap_or_else(|| DEFAULT_CROSSREF_URL.to_string()),
            crossref_mailto: get("CROSSREF_MAILTO"),
            doi_prefixes,
            batch_size,
            max_retries: parse_var(&get, "BIBSIFT_MAX_RETRIES", 3)?,
            rate_limit_interval: Duration::from_millis(parse_var(
                &get,
                "BIBSIFT_RATE_INTERVAL_MS",
                1000,
            )?),
            base_backoff: Duration::from_millis(parse_var(&get, "BIBSIFT_BACKOFF_MS", 2000)?),
        })
    }

    /// Check that the OpenAI API key is configured.
    /// Call this before any operation that needs classification.
    pub fn require_openai(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file.\n\
                 Example: OPENAI_API_KEY=sk-..."
            );
        }
        Ok(())
    }

    /// Canonicalizer recognizing the configured prefixes.
    pub fn canonicalizer(&self) -> Canonicalizer {
        Canonicalizer::new(&self.doi_prefixes)
    }

    /// Run defaults from configuration.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            batch_size: self.batch_size,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_backoff: self.base_backoff,
                ..RetryPolicy::default()
            },
            rate_limit_interval: self.rate_limit_interval,
            show_progress: true,
        }
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_limit_interval, Duration::from_millis(1000));
        assert_eq!(config.doi_prefixes.len(), DEFAULT_PREFIXES.len());
        assert!(config.require_openai().is_err());
    }

    #[test]
    fn prefix_override_replaces_defaults() {
        let config = from_map(&[("BIBSIFT_DOI_PREFIXES", "https://doi.org/, doi:")]).unwrap();
        let canon = config.canonicalizer();
        assert_eq!(canon.prefixes().len(), 2);
        assert!(canon.canonicalize("http://dx.doi.org/10.1/abc").is_err());
        assert_eq!(canon.canonicalize("doi:10.1/ABC").unwrap(), "10.1/abc");
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = from_map(&[("BIBSIFT_MAX_RETRIES", "lots")]).unwrap_err();
        assert!(err.to_string().contains("BIBSIFT_MAX_RETRIES"));
    }

    #[test]
    fn zero_batch_size_rejected() {
        assert!(from_map(&[("BIBSIFT_BATCH_SIZE", "0")]).is_err());
    }
}
