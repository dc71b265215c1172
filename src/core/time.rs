use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Milliseconds since the Unix epoch, the timestamp unit of stored results.
pub(crate) fn now_millis() -> i64 {
    millis_of(OffsetDateTime::now_utc())
}

pub(crate) fn millis_of(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn format_millis(millis: i64) -> String {
    match OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000) {
        Ok(value) => format_offset(value),
        Err(_) => millis.to_string(),
    }
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}
