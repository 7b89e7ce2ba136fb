// Tokenizer and stopword set for term statistics.

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

/// Tokens shorter than this are discarded.
pub const DEFAULT_MIN_TERM_LEN: usize = 3;

/// Split text into lower-case alphabetic terms of at least `min_len` chars.
///
/// Anything that isn't alphabetic is a separator, so `LLM-based` yields
/// `llm` and `based`, and digits never appear in a term.
pub fn tokenize(text: &str, min_len: usize) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(move |word| !word.is_empty() && word.chars().count() >= min_len)
        .map(str::to_lowercase)
}

/// A set of terms excluded from term statistics.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// An empty stopword set.
    pub fn none() -> Self {
        Self::default()
    }

    /// The English list from the `stop-words` crate.
    pub fn english() -> Self {
        let words: Vec<String> = get(LANGUAGE::English);
        Self::from_words(words)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(words);
        set
    }

    /// Add more words (lower-cased, trimmed, blanks ignored).
    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() {
                self.words.insert(word);
            }
        }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(term)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
