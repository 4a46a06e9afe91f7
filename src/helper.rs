use chrono::{DateTime, Local, Utc};
use textwrap::{Options, WordSplitter};

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Returns `existing` with `add` appended and every tag in `remove` dropped.
///
/// Removal ignores case. Duplicates among the added tags are kept.
pub fn edit_tags(existing: &[String], add: &[String], remove: &[String]) -> Vec<String> {
    existing
        .iter()
        .chain(add)
        .filter(|tag| !remove.iter().any(|r| r.eq_ignore_ascii_case(tag)))
        .cloned()
        .collect()
}

/// Current terminal width, 80 when it cannot be determined
pub fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

/// Wraps `text` to `width` display columns. Existing line breaks are kept
/// and words longer than a line are never split.
pub fn wrap_text(text: &str, width: usize) -> String {
    let options = Options::new(width.max(1))
        .break_words(false)
        .word_splitter(WordSplitter::NoHyphenation);
    textwrap::fill(text, options)
}

/// Short local time, e.g. `14:05`
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

/// Local date and time, e.g. `2025-03-01 14:05`
pub fn format_datetime(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
