// External oracles: trait-based abstraction over identifier resolution,
// classification and registry lookups, plus the pacing and retry machinery the pipeline wraps
// around every call.

pub mod crossref;
pub mod http;
pub mod openai;
pub mod pacer;
pub mod retry;
pub mod traits;

pub use pacer::Pacer;
pub use retry::RetryPolicy;
pub use traits::{BatchItem, Confidence, IdentifierRegistry, Resolution, ReviewOracle, Verdict};
