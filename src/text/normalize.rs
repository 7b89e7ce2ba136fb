// Text normalizer for titles and abstracts.
//
// BibTeX exports carry LaTeX residue: `\textit{...}`, `\emph{...}`, bare
// commands like `\LaTeX`, case-protecting braces like `{ChatGPT}`, escaped
// punctuation like `\&`. Commands are dropped together with their braced
// argument, innermost first, so nested markup goes in full. Protecting
// braces are unwrapped, keeping their text. Plain prose only ever has its
// whitespace collapsed.

use std::sync::LazyLock;

use regex_lite::Regex;

/// `\command{arg}` whose argument holds no further braces, optionally
/// starred and with one `[opt]` argument.
static COMMAND_WITH_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[a-zA-Z]+\*?(\[[^\]]*\])?\{[^{}]*\}").expect("valid command regex")
});

/// A brace group that is not a command argument: `{ChatGPT}`.
static PROTECTED_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^a-zA-Z*\]\\])\{([^{}]*)\}").expect("valid brace group regex")
});

static BARE_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+\*?").expect("valid bare command regex"));

/// `\&`, `\%`, `\_` and friends.
static ESCAPED_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([^a-zA-Z\s])").expect("valid escape regex"));

/// Strip markup commands and collapse whitespace.
pub fn normalize(text: &str) -> String {
    if !text.contains(['\\', '{', '}']) {
        return collapse_whitespace(text);
    }

    let text = strip_groups(text);
    let text = BARE_COMMAND.replace_all(&text, "");
    let text = drop_unescaped_braces(&text);
    let text = ESCAPED_SYMBOL.replace_all(&text, "$1");
    collapse_whitespace(&text)
}

/// Remove commands with arguments and unwrap protecting braces until
/// neither changes the text. Every pass shortens it, so this ends.
fn strip_groups(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = {
            let stripped = COMMAND_WITH_ARG.replace_all(&current, "");
            PROTECTED_GROUP.replace_all(&stripped, "$1$2").into_owned()
        };
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Unbalanced leftovers. `\{` and `\}` are kept for unescaping.
fn drop_unescaped_braces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        if !escaped && (c == '{' || c == '}') {
            continue;
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_command_with_argument() {
        assert_eq!(
            normalize(r"Teaching with \textit{generative} models"),
            "Teaching with models"
        );
    }

    #[test]
    fn removes_bare_commands() {
        assert_eq!(normalize(r"Typesetting in \LaTeX today"), "Typesetting in today");
    }

    #[test]
    fn unescapes_symbols() {
        assert_eq!(normalize(r"Research \& Practice"), "Research & Practice");
    }

    #[test]
    fn optional_argument_form() {
        assert_eq!(normalize(r"a \cite[p.~3]{smith} b"), "a b");
    }

    #[test]
    fn nested_commands_are_removed_whole() {
        assert_eq!(
            normalize(r"\textbf{\emph{Bold}} claims about tutors"),
            "claims about tutors"
        );
    }

    #[test]
    fn protecting_braces_keep_their_text() {
        assert_eq!(normalize("The {ChatGPT} effect"), "The ChatGPT effect");
        assert_eq!(normalize("{{LLM}s} in {CS1}"), "LLMs in CS1");
    }

    #[test]
    fn command_around_protected_text() {
        assert_eq!(normalize(r"Using \textit{The {GPT} model} well"), "Using well");
    }

    #[test]
    fn stray_braces_are_dropped() {
        assert_eq!(normalize("unbalanced } brace {here"), "unbalanced brace here");
        assert_eq!(normalize(r"set \{a\} notation"), "set {a} notation");
    }

    #[test]
    fn plain_prose_only_loses_extra_whitespace() {
        assert_eq!(
            normalize("  Large language   models\n in CS1 \t courses "),
            "Large language models in CS1 courses"
        );
    }
}
