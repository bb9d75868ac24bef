//! Shared error plumbing.
//!
//! Every domain error exposes a grepable code and a retryable flag through
//! [`ErrorCode`]. The HTTP boundary uses both when shaping error bodies.

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Current wall-clock time as an RFC 3339 string.
#[must_use]
pub fn now_rfc3339() -> String {
    format_rfc3339(time::OffsetDateTime::now_utc())
}

/// Format a timestamp as RFC 3339, falling back to Unix seconds.
#[must_use]
pub fn format_rfc3339(ts: time::OffsetDateTime) -> String {
    ts.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}
