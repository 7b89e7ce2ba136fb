// Free-text handling: markup stripping, tokenization, stopwords.

pub mod normalize;
pub mod tokenize;

pub use normalize::normalize;
pub use tokenize::{tokenize, Stopwords, DEFAULT_MIN_TERM_LEN};
