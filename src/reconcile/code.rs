// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Topup code extraction from free-text transfer descriptions.
//!
//! ## Pattern Grammar
//!
//! ```text
//! code       = prefix sep? suffix
//! prefix     = configured code prefix, matched case-insensitively,
//!              starting at a word boundary
//! sep        = "-" | "_" | " "          (at most one)
//! suffix     = 2 to 10 characters of [A-Za-z0-9]; longer runs are
//!              capped at ten characters
//! normalized = UPPERCASE(prefix) "-" UPPERCASE(suffix)
//! ```
//!
//! The first occurrence that yields a valid suffix wins. Descriptions with
//! no code are a normal outcome, not an error: banks prepend and append
//! arbitrary text around whatever the payer typed.

const MIN_SUFFIX: usize = 2;
const MAX_SUFFIX: usize = 10;

/// Scan `text` for a topup code with the given prefix.
///
/// Returns the normalized `PREFIX-SUFFIX` form of the first match.
pub fn extract_code(text: &str, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    let haystack = text.to_ascii_uppercase();
    let needle = prefix.to_ascii_uppercase();
    let bytes = haystack.as_bytes();

    for (start, _) in haystack.match_indices(&needle) {
        // The prefix must start a token, not continue one
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }

        let mut pos = start + needle.len();
        if pos < bytes.len() && matches!(bytes[pos], b'-' | b'_' | b' ') {
            pos += 1;
        }

        let suffix_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() && pos - suffix_start < MAX_SUFFIX
        {
            pos += 1;
        }

        let suffix_len = pos - suffix_start;
        if suffix_len >= MIN_SUFFIX {
            let suffix = &haystack[suffix_start..pos];
            return Some(format!("{needle}-{suffix}"));
        }
    }
    None
}
