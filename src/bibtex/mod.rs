// BibTeX ingest: turns `.bib` exports into raw records for the corpus.

pub mod parser;
pub mod sources;

pub use parser::{parse, read_file, ParsedBibliography};
pub use sources::{expand_paths, read_paths, SourceFile, SourceSet};
