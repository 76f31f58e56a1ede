//! Conversation title normalization

use crate::core::string::truncate;

/// Title used when the title model fails or answers with nothing
pub const FALLBACK_TITLE: &str = "New Conversation";

/// Maximum title length in bytes, ellipsis included
pub const MAX_TITLE_LEN: usize = 50;

/// Clean a raw title-model answer
///
/// Only the first non-empty line is kept, surrounding quotes are stripped
/// and the result is capped at [`MAX_TITLE_LEN`].
pub fn clean_title(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let line = line.strip_prefix("Title:").unwrap_or(line).trim();
    let title = line.trim_matches(|c| c == '"' || c == '\'').trim();
    if title.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    truncate(title, MAX_TITLE_LEN)
}
