// Record types: the raw form handed over by a reader and the cleaned form
// stored in the corpus.

use std::collections::HashMap;

use serde::Serialize;

/// Field names checked, in order, for the record's identifier.
pub const IDENTIFIER_FIELDS: &[&str] = &["doi"];

/// Field names checked, in order, for the record's title.
pub const TITLE_FIELDS: &[&str] = &["title", "booktitle"];

pub const ABSTRACT_FIELD: &str = "abstract";

/// One bibliographic entry as supplied by a reader, before any cleaning.
///
/// Field names are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    /// Citation key (`@article{key, ...}`), when the source has one.
    pub key: Option<String>,
    /// Entry type (`article`, `inproceedings`, ...), lower-cased.
    pub entry_type: Option<String>,
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.trim().to_lowercase(), value.into());
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_lowercase()).map(String::as_str)
    }

    /// First non-blank value among `names`.
    pub fn first_field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.field(name))
            .find(|value| !value.trim().is_empty())
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> HashMap<String, String> {
        self.fields
    }
}

/// A cleaned record stored in the corpus.
///
/// `identifier`, when present, is always canonical. Records are not mutated
/// after the corpus is built.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub identifier: Option<String>,
    pub key: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip)]
    pub raw_fields: HashMap<String, String>,
}

impl Record {
    /// Title and abstract joined for term analysis.
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.abstract_text.is_empty()) {
            (false, false) => format!("{} {}", self.title, self.abstract_text),
            (false, true) => self.title.clone(),
            (true, false) => self.abstract_text.clone(),
            (true, true) => String::new(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.title.is_empty() || !self.abstract_text.is_empty()
    }
}
