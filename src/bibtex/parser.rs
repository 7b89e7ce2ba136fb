// Brace-aware BibTeX reader.
//
// Handles the subset real database exports use: `@type{key, field = {...}}`
// or `@type(key, ...)`, values in braces (nested braces kept verbatim), in
// quotes, bare words or numbers, and `#` concatenation. `@comment`,
// `@string` and `@preamble` blocks are skipped. String macros are not
// expanded; a bare `jan` stays `jan`.
//
// A broken entry is skipped and counted. Scanning resumes at the next `@`,
// so one bad entry never costs the rest of the file. An `@` not followed by
// an entry type and an opening delimiter is plain text and is not counted.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::corpus::RawRecord;

/// Entries read from one BibTeX source.
#[derive(Debug, Default)]
pub struct ParsedBibliography {
    pub records: Vec<RawRecord>,
    /// Entries that could not be parsed.
    pub skipped: usize,
}

/// Parse BibTeX text into raw records.
pub fn parse(text: &str) -> ParsedBibliography {
    let chars: Vec<char> = text.chars().collect();
    let mut cur = Cursor { chars: &chars, pos: 0 };
    let mut parsed = ParsedBibliography::default();

    while let Some(at) = cur.find('@') {
        cur.pos = at + 1;
        if !cur.at_entry_start() {
            // Free text between entries, e.g. an email address.
            continue;
        }
        match parse_entry(&mut cur) {
            Ok(Some(record)) => parsed.records.push(record),
            Ok(None) => {}
            Err(reason) => {
                warn!(offset = at, reason = %reason, "Skipping malformed BibTeX entry");
                parsed.skipped += 1;
                cur.pos = at + 1;
            }
        }
    }

    parsed
}

/// Read and parse a `.bib` file. Invalid UTF-8 is replaced, not fatal.
pub fn read_file(path: &Path) -> Result<ParsedBibliography> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read BibTeX file {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let parsed = parse(&text);

    info!(
        path = %path.display(),
        entries = parsed.records.len(),
        skipped = parsed.skipped,
        "Parsed BibTeX file"
    );

    Ok(parsed)
}

fn parse_entry(cur: &mut Cursor<'_>) -> Result<Option<RawRecord>, String> {
    let entry_type = cur
        .take_while(|c| c.is_ascii_alphanumeric() || c == '_')
        .to_lowercase();
    if entry_type.is_empty() {
        return Err("missing entry type".to_string());
    }

    cur.skip_ws();
    let close = match cur.next() {
        Some('{') => '}',
        Some('(') => ')',
        other => return Err(format!("expected '{{' after @{entry_type}, found {other:?}")),
    };
    let open = if close == '}' { '{' } else { '(' };

    if matches!(entry_type.as_str(), "comment" | "string" | "preamble") {
        cur.skip_balanced(open, close)?;
        return Ok(None);
    }

    cur.skip_ws();
    let key = cur.take_while(|c| c != ',' && c != close && !c.is_whitespace());

    let mut record = RawRecord::new();
    record.entry_type = Some(entry_type);
    if !key.is_empty() {
        record.key = Some(key);
    }

    loop {
        cur.skip_ws();
        match cur.peek() {
            None => return Err("unterminated entry".to_string()),
            Some(c) if c == close => {
                cur.pos += 1;
                return Ok(Some(record));
            }
            Some(',') => {
                cur.pos += 1;
                continue;
            }
            Some(_) => {}
        }

        let name = cur.take_while(|c| c.is_ascii_alphanumeric() || "_-:.".contains(c));
        if name.is_empty() {
            return Err(format!("unexpected character {:?} in field list", cur.peek()));
        }

        cur.skip_ws();
        if cur.next() != Some('=') {
            return Err(format!("expected '=' after field {name}"));
        }

        let value = parse_value(cur)?;
        record.set_field(&name, value.trim());
    }
}

fn parse_value(cur: &mut Cursor<'_>) -> Result<String, String> {
    let mut value = String::new();
    loop {
        cur.skip_ws();
        match cur.peek() {
            Some('{') => {
                cur.pos += 1;
                value.push_str(&cur.braced()?);
            }
            Some('"') => {
                cur.pos += 1;
                value.push_str(&cur.quoted()?);
            }
            Some(c) if c.is_alphanumeric() => {
                value.push_str(&cur.take_while(|c| c.is_alphanumeric() || "_-:.+/".contains(c)));
            }
            other => return Err(format!("expected field value, found {other:?}")),
        }

        cur.skip_ws();
        if cur.peek() == Some('#') {
            cur.pos += 1;
            continue;
        }
        return Ok(value);
    }
}

struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn find(&self, target: char) -> Option<usize> {
        self.chars[self.pos.min(self.chars.len())..]
            .iter()
            .position(|&c| c == target)
            .map(|offset| self.pos + offset)
    }

    /// Whether an entry type followed by `{` or `(` starts here.
    fn at_entry_start(&self) -> bool {
        let mut i = self.pos;
        while self.chars.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
            i += 1;
        }
        if i == self.pos {
            return false;
        }
        while self.chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        matches!(self.chars.get(i), Some('{') | Some('('))
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Skip to the delimiter closing an already-opened block.
    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), String> {
        let mut depth = 1usize;
        while let Some(c) = self.next() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err("unterminated block".to_string())
    }

    /// Contents of a `{...}` value whose opening brace was consumed.
    fn braced(&mut self) -> Result<String, String> {
        let mut out = String::new();
        let mut depth = 1usize;
        while let Some(c) = self.next() {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(escaped) = self.next() {
                        out.push(escaped);
                    }
                }
                '{' => {
                    depth += 1;
                    out.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        Err("unterminated braced value".to_string())
    }

    /// Contents of a `"..."` value whose opening quote was consumed.
    fn quoted(&mut self) -> Result<String, String> {
        let mut out = String::new();
        let mut depth = 0usize;
        while let Some(c) = self.next() {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(escaped) = self.next() {
                        out.push(escaped);
                    }
                }
                '{' => {
                    depth += 1;
                    out.push(c);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    out.push(c);
                }
                '"' if depth == 0 => return Ok(out),
                _ => out.push(c),
            }
        }
        Err("unterminated quoted value".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_braces_are_kept() {
        let parsed = parse("@article{k, title = {The {ChatGPT} effect}}");
        assert_eq!(parsed.records[0].field("title"), Some("The {ChatGPT} effect"));
    }

    #[test]
    fn concatenation_joins_parts() {
        let parsed = parse(r#"@misc{k, note = "part one " # {part two}}"#);
        assert_eq!(parsed.records[0].field("note"), Some("part one part two"));
    }

    #[test]
    fn parenthesized_entries() {
        let parsed = parse("@book(k, year = 2020)");
        assert_eq!(parsed.records[0].field("year"), Some("2020"));
    }
}
