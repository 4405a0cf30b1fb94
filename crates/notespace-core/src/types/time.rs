//! Timestamp helpers.
//!
//! All persisted timestamps use RFC 3339 in UTC with millisecond precision
//! and a `Z` suffix, so string ordering matches chronological ordering.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::AppError;

/// Current UTC time as an RFC 3339 string with a `Z` suffix.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_iso(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::validation(format!("malformed timestamp '{raw}': {e}")))
}
