// bibsift: review tooling for bibliographic corpora
//
// This is the library root. Each module corresponds to one stage of a
// literature review: reading entries, canonicalizing identifiers, building
// the corpus, analyzing its text, and classifying it through an oracle.

pub mod analysis;
pub mod bibtex;
pub mod config;
pub mod corpus;
pub mod error;
pub mod identifier;
pub mod oracle;
pub mod output;
pub mod pipeline;
pub mod text;
