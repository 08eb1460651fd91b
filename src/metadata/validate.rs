//! Field validators for plugin manifests.
//!
//! Explicit per-field checks composed into one validation pass; every
//! offending field ends up in the aggregated [`ValidationErrors`] instead
//! of aborting at the first failure.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEX_RE: Regex = Regex::new(r"^[0-9a-fA-F]+$").expect("hex regex is valid");
    static ref ALPHANUMERIC_RE: Regex =
        Regex::new(r"^[0-9a-zA-Z]+$").expect("alphanumeric regex is valid");
    static ref URL_RE: Regex = Regex::new(r"^https?://\S+$").expect("url regex is valid");
}

/// Non-empty string of hex digits.
pub fn is_hex(s: &str) -> bool {
    HEX_RE.is_match(s)
}

/// Non-empty string of ASCII letters and digits.
pub fn is_alphanumeric(s: &str) -> bool {
    ALPHANUMERIC_RE.is_match(s)
}

/// http(s) URL shape; no full RFC 3986 validation.
pub fn is_url(s: &str) -> bool {
    URL_RE.is_match(s)
}

/// Normalize a comma-separated tag string into an ordered, deduplicated
/// list of trimmed, lower-cased tags. `None` and `""` both yield an empty
/// list.
pub fn parse_tags(input: Option<&str>) -> Vec<String> {
    let mut tags = Vec::new();
    for raw in input.unwrap_or_default().split(',') {
        let tag = raw.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
