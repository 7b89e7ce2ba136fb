// Corpus analyses: term statistics, reference overlap, topic frequency.
//
// All three read a built Corpus and nothing else; they are pure and
// independent of one another.

pub mod overlap;
pub mod tfidf;
pub mod topics;
