//! URL slugs derived from human-readable names.
//!
//! Slugs are computed once, when an entity is first constructed, and never
//! rewritten afterwards. Uniqueness against existing rows is resolved by
//! [`disambiguate`], which is pure: the caller supplies the slugs already taken.

use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

pub const POST_SLUG_MAX: usize = 200;
pub const TAG_SLUG_MAX: usize = 50;
pub const CATEGORY_SLUG_MAX: usize = 100;
pub const MODEL_SLUG_MAX: usize = 200;

/// Lowercase ASCII slug: keeps `[a-z0-9_-]`, turns whitespace and hyphen runs
/// into a single `-`, and trims `-`/`_` from both ends. Text is NFKD-decomposed
/// first so accented letters keep their base letter; whatever is still
/// non-ASCII afterwards is dropped.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.nfkd().filter(char::is_ascii) {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_sep = true;
        }
    }
    out.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// [`slugify`] cut to at most `max_len` characters, falling back to
/// `fallback` when nothing URL-safe remains.
pub fn bounded(text: &str, max_len: usize, fallback: &str) -> String {
    let slug = truncate(&slugify(text), max_len);
    if slug.is_empty() {
        truncate(fallback, max_len)
    } else {
        slug
    }
}

fn truncate(slug: &str, max_len: usize) -> String {
    // slugs are pure ASCII so byte slicing is safe
    let cut = &slug[..slug.len().min(max_len)];
    cut.trim_end_matches(|c| c == '-' || c == '_').to_string()
}

/// Longest `-N` suffix [`disambiguate`] can append (`-` plus the digits of `u64::MAX`).
const MAX_SUFFIX_LEN: usize = 21;

/// A prefix shared by `base` and every candidate [`disambiguate`] may produce
/// for it. Fetching the slugs that start with it gives a complete `taken` set.
pub fn candidate_prefix(base: &str, max_len: usize) -> String {
    if base.len() + MAX_SUFFIX_LEN <= max_len {
        format!("{base}-")
    } else {
        truncate(base, max_len.saturating_sub(MAX_SUFFIX_LEN))
    }
}

/// Returns `base` when it is free, otherwise the first free `base-N` for
/// `N >= 2`, shortening `base` so the result stays within `max_len`.
pub fn disambiguate(base: &str, taken: &HashSet<String>, max_len: usize) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n: u64 = 2;
    loop {
        let suffix = format!("-{n}");
        let stem = truncate(base, max_len.saturating_sub(suffix.len()));
        let candidate = format!("{stem}{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
