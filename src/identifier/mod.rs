// Identifier handling: DOI canonicalization and reference lists.
//
// Every identifier that enters the corpus or a comparison passes through the
// Canonicalizer first, so equality checks downstream are plain string
// equality on the canonical form.

pub mod canonical;
pub mod list;

pub use canonical::{Canonicalizer, DEFAULT_PREFIXES};
