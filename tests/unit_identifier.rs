// Unit tests for identifier canonicalization and reference lists.
//
// Covers the recognized prefix forms, idempotence, rejection of input
// without DOI structure, and the collapsing/malformed bookkeeping of
// CanonicalSet.

use bibsift::error::ReviewError;
use bibsift::identifier::list::{parse_identifier_list, CanonicalSet};
use bibsift::identifier::{Canonicalizer, DEFAULT_PREFIXES};

// ============================================================
// Canonicalizer: accepted forms
// ============================================================

#[test]
fn bare_identifier_is_lowercased_and_trimmed() {
    let canon = Canonicalizer::default();
    assert_eq!(canon.canonicalize("  10.1145/ABC.123 \n").unwrap(), "10.1145/abc.123");
}

#[test]
fn url_prefixed_forms_reduce_to_bare_form() {
    let canon = Canonicalizer::default();
    for raw in [
        "https://doi.org/10.1/ABC",
        "http://doi.org/10.1/ABC",
        "https://dx.doi.org/10.1/ABC",
        "http://dx.doi.org/10.1/ABC",
        "doi.org/10.1/ABC",
        "doi:10.1/ABC",
        "HTTPS://DOI.ORG/10.1/abc",
    ] {
        assert_eq!(canon.canonicalize(raw).unwrap(), "10.1/abc", "input {raw}");
    }
}

#[test]
fn only_the_prefix_is_stripped() {
    let canon = Canonicalizer::default();
    // A suffix containing something prefix-like stays intact.
    assert_eq!(
        canon.canonicalize("https://doi.org/10.1/doi.org/x").unwrap(),
        "10.1/doi.org/x"
    );
}

#[test]
fn canonicalization_is_idempotent() {
    let canon = Canonicalizer::default();
    for raw in [
        "10.1/ABC",
        "https://doi.org/10.1109/5.771073",
        "doi:10.1000/XYZ-(2020)_01",
        "  http://dx.doi.org/10.48550/arXiv.2301.00001 ",
    ] {
        let once = canon.canonicalize(raw).unwrap();
        let twice = canon.canonicalize(&once).unwrap();
        assert_eq!(once, twice);
        assert!(canon.is_canonical(&once));
    }
}

// ============================================================
// Canonicalizer: rejected input
// ============================================================

#[test]
fn empty_and_blank_input_is_invalid() {
    let canon = Canonicalizer::default();
    assert!(matches!(canon.canonicalize(""), Err(ReviewError::InvalidIdentifier(_))));
    assert!(matches!(canon.canonicalize("   "), Err(ReviewError::InvalidIdentifier(_))));
}

#[test]
fn input_without_doi_shape_is_invalid() {
    let canon = Canonicalizer::default();
    for raw in ["not a doi", "10.1", "10.1/", "11.1/abc", "abc/def", "10.1/a b"] {
        assert!(
            matches!(canon.canonicalize(raw), Err(ReviewError::InvalidIdentifier(_))),
            "input {raw}"
        );
    }
}

#[test]
fn unrecognized_prefix_is_invalid() {
    let canon = Canonicalizer::default();
    assert!(canon.canonicalize("https://example.org/10.1/abc").is_err());
}

#[test]
fn custom_prefix_set_is_exact() {
    let canon = Canonicalizer::new(["https://doi.org/"]);
    assert_eq!(canon.canonicalize("https://doi.org/10.1/a").unwrap(), "10.1/a");
    assert!(canon.canonicalize("doi:10.1/a").is_err());
}

#[test]
fn default_prefixes_are_sorted_longest_first() {
    let canon = Canonicalizer::default();
    assert_eq!(canon.prefixes().len(), DEFAULT_PREFIXES.len());
    let lens: Vec<usize> = canon.prefixes().iter().map(|p| p.len()).collect();
    assert!(lens.windows(2).all(|w| w[0] >= w[1]));
}

// ============================================================
// Reference lists
// ============================================================

#[test]
fn list_parsing_skips_blanks_and_comments() {
    let text = "# exported 2024\n10.1/a\n\n   \nhttps://doi.org/10.1/B\n# done\n";
    assert_eq!(parse_identifier_list(text), vec!["10.1/a", "https://doi.org/10.1/B"]);
}

#[test]
fn canonical_set_collapses_and_flags() {
    let canon = Canonicalizer::default();
    let set = CanonicalSet::build(
        &canon,
        ["10.1/A", "https://doi.org/10.1/a", "10.1/b", "garbage"],
    );
    assert_eq!(set.len(), 2);
    assert_eq!(set.collapsed, 1);
    assert_eq!(set.malformed, vec!["garbage".to_string()]);
    assert!(set.identifiers.contains("10.1/a"));
}
