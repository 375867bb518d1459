use chrono::{DateTime, Datelike, Utc};

/// Three-digit, zero-padded sequence number (`7` -> `"007"`). Longer numbers
/// are kept whole.
pub fn sequence_suffix(sequence: usize) -> String {
    format!("{sequence:03}")
}

pub fn sequence_id(prefix: &str, sequence: usize) -> String {
    format!("{prefix}{}", sequence_suffix(sequence))
}

pub fn backup_prefix(now: DateTime<Utc>) -> String {
    format!("BKP-{}-", now.year())
}
