//! Heuristic kind detection for errors raised outside tagguard
//!
//! Errors we create carry an explicit [`ErrorKind`]. Errors surfaced by
//! third-party clients only give us text, and their exact taxonomies vary,
//! so this module maps message text to a kind by case-insensitive substring
//! match. It is approximate and only used at that boundary.

use aho_corasick::AhoCorasick;
use std::sync::OnceLock;
use tagguard_core::{Error, ErrorKind};

/// Patterns in priority order: when several match, the earliest entry wins.
const PATTERNS: &[(&str, ErrorKind)] = &[
    ("throttl", ErrorKind::Throttling),
    ("too many requests", ErrorKind::Throttling),
    ("rate exceeded", ErrorKind::Throttling),
    ("timed out", ErrorKind::Timeout),
    ("timeout", ErrorKind::Timeout),
    ("unavailable", ErrorKind::Unavailable),
    ("internal", ErrorKind::InternalService),
    ("service error", ErrorKind::InternalService),
    ("econnreset", ErrorKind::Network),
    ("socket hang up", ErrorKind::Network),
    ("network", ErrorKind::Network),
    ("connection", ErrorKind::Connection),
];

fn matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(PATTERNS.iter().map(|(pattern, _)| *pattern))
            .expect("static error patterns are valid")
    })
}

/// Best-effort kind for an external error message
pub fn classify_external_message(message: &str) -> ErrorKind {
    matcher()
        .find_overlapping_iter(message)
        .map(|m| m.pattern().as_usize())
        .min()
        .map(|index| PATTERNS[index].1)
        .unwrap_or(ErrorKind::Other)
}

/// Wrap an external error message as a processing error with a detected kind
pub fn external_error(message: impl Into<String>) -> Error {
    let message = message.into();
    let kind = classify_external_message(&message);
    Error::processing(kind, message)
}
