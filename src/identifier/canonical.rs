// DOI canonicalization.
//
// Bibliographic exports disagree on how they write a DOI: bare
// (`10.1145/3287324.3287506`), wrapped in a resolver URL
// (`https://doi.org/10.1145/...`, `http://dx.doi.org/...`), or tagged
// (`doi:10.1145/...`). The canonical form is the bare DOI, lower-cased,
// with surrounding whitespace trimmed.
//
// The set of recognized resolver prefixes is configuration. Anything wrapped
// in a prefix we don't know fails the shape check and is rejected rather
// than guessed at.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::{ReviewError, ReviewResult};

/// Resolver prefixes recognized when no override is configured.
pub const DEFAULT_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "dx.doi.org/",
    "doi:",
];

/// `10.<registrant>[.<sub>...]/<suffix>` with a non-empty, whitespace-free suffix.
static DOI_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.[0-9]+(\.[0-9]+)*/\S+$").expect("valid DOI regex"));

/// Normalizes identifier strings to their comparable canonical form.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    /// Recognized prefixes, longest first so a more specific prefix wins.
    prefixes: Vec<String>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIXES.iter().copied())
    }
}

impl Canonicalizer {
    /// Build a canonicalizer recognizing exactly the given prefixes.
    ///
    /// Prefix matching is ASCII case-insensitive. Blank entries are ignored.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();
        Self { prefixes }
    }

    /// The recognized prefixes, longest first.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Canonicalize one identifier.
    ///
    /// Strips at most one recognized prefix, trims, lower-cases, then checks
    /// the `prefix/suffix` DOI shape. Idempotent on its own output.
    pub fn canonicalize(&self, raw: &str) -> ReviewResult<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReviewError::InvalidIdentifier(raw.to_string()));
        }

        let bare = self.strip_prefix(trimmed).trim();
        let canonical = bare.to_lowercase();

        if DOI_SHAPE.is_match(&canonical) {
            Ok(canonical)
        } else {
            Err(ReviewError::InvalidIdentifier(raw.to_string()))
        }
    }

    /// Whether `candidate` is already in canonical form.
    pub fn is_canonical(&self, candidate: &str) -> bool {
        self.canonicalize(candidate)
            .map(|c| c == candidate)
            .unwrap_or(false)
    }

    fn strip_prefix<'a>(&self, text: &'a str) -> &'a str {
        for prefix in &self.prefixes {
            // `get` keeps us on a char boundary when the input is non-ASCII.
            if let Some(head) = text.get(..prefix.len()) {
                if head.eq_ignore_ascii_case(prefix) {
                    return &text[prefix.len()..];
                }
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_each_default_prefix() {
        let canon = Canonicalizer::default();
        for prefix in DEFAULT_PREFIXES {
            let raw = format!("{prefix}10.1145/3287324.3287506");
            assert_eq!(
                canon.canonicalize(&raw).unwrap(),
                "10.1145/3287324.3287506",
                "prefix {prefix}"
            );
        }
    }

    #[test]
    fn longer_prefix_wins() {
        let canon = Canonicalizer::new(["doi.org/", "https://doi.org/"]);
        assert_eq!(canon.prefixes()[0], "https://doi.org/");
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        let canon = Canonicalizer::default();
        assert!(canon.canonicalize("ünïcode/ßtuff").is_err());
    }
}
