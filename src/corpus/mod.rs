// Corpus model: raw records in, canonical read-only store out.

pub mod model;
pub mod record;

pub use model::{Corpus, IngestStats, MalformedIdentifier};
pub use record::{RawRecord, Record};
