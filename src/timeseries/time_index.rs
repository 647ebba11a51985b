use crate::error::NsrdbError;
use crate::types::location::Year;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parses one encoded timestamp into a timezone-naive datetime.
///
/// Offsets are dropped and the wall-clock time is kept, so `2020-06-01 12:00:00-07:00`
/// becomes `2020-06-01 12:00:00`. Accepts a space or `T` separator, optional fractional
/// seconds, an optional offset (`Z`, `+00:00`, `+0000`) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let normalized = match trimmed.split_once(' ') {
        Some((date, time)) => format!("{}T{}", date, time.trim_start()),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.naive_local());
    }
    if let Ok(naive) = normalized.parse::<NaiveDateTime>() {
        return Some(naive);
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Decodes a dataset's time index, failing on the first entry that cannot be parsed.
pub fn decode_time_index<S: AsRef<str>>(
    year: Year,
    raw: &[S],
) -> Result<Vec<NaiveDateTime>, NsrdbError> {
    raw.iter()
        .enumerate()
        .map(|(position, value)| {
            parse_timestamp(value.as_ref()).ok_or_else(|| NsrdbError::Decode {
                year,
                position,
                value: value.as_ref().to_string(),
            })
        })
        .collect()
}
