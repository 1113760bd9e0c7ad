//! Small text and clock helpers.

const MAX_MESSAGE_CHARS: usize = 180;

/// Trimmed copy of `value`, or `None` when nothing but whitespace is left.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Key for natural identifiers compared ignoring case (emails, department names).
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Trim and cap a message before it lands in a sync report.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(MAX_MESSAGE_CHARS).collect()
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
