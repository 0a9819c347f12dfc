use std::fmt;

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Minimum length of a trimmed key before a query may be submitted.
pub const MIN_QUERY_LEN: usize = 4;

/// How the ends of a normalized name are trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Used while the user is typing: leading whitespace is dropped, but a single
    /// trailing space survives so the next word can be started.
    Editing,
    /// Used at submission: both ends are trimmed.
    Final,
}

/// Canonical search key: `A`-`Z` and single spaces only, no diacritics.
///
/// In `TrimMode::Final` the key never starts or ends with a space. An
/// `Editing` key may carry one trailing space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize raw user input into a search key.
///
/// Decomposes to NFD and drops combining marks ("É" becomes "E"), deletes every
/// character that is neither an ASCII letter nor whitespace, collapses each
/// whitespace run into a single space, trims according to `mode`, and
/// upper-cases. Total over all inputs.
pub fn normalize_name(raw: &str, mode: TrimMode) -> NormalizedKey {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphabetic() {
            // Leading whitespace never makes it into the key.
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c.to_ascii_uppercase());
        } else if c.is_whitespace() {
            pending_space = true;
        }
        // Anything else is deleted outright, so it cannot split a whitespace run.
    }

    if pending_space && mode == TrimMode::Editing && !out.is_empty() {
        out.push(' ');
    }

    NormalizedKey(out)
}

/// Keystroke variant: keeps at most one trailing space.
pub fn normalize_for_editing(raw: &str) -> NormalizedKey {
    normalize_name(raw, TrimMode::Editing)
}

/// Submission variant: fully trimmed.
pub fn normalize_final(raw: &str) -> NormalizedKey {
    normalize_name(raw, TrimMode::Final)
}

/// A key can be submitted once its trimmed form reaches `MIN_QUERY_LEN` characters.
pub fn is_submittable(key: &str) -> bool {
    key.trim().chars().count() >= MIN_QUERY_LEN
}
