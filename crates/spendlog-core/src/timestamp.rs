//! Timestamp parsing and the millisecond, UTC storage representation.

use time::{
    error::ComponentRange, format_description::well_known::Rfc3339, macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

use crate::validation::ValidationError;

/// Current time at storage precision.
pub fn now() -> OffsetDateTime {
    truncate_to_millis(OffsetDateTime::now_utc())
}

/// Normalizes to UTC and drops everything below the millisecond.
pub fn truncate_to_millis(t: OffsetDateTime) -> OffsetDateTime {
    let t = t.to_offset(UtcOffset::UTC);
    t.replace_millisecond(t.millisecond()).unwrap_or(t)
}

pub fn to_unix_millis(t: OffsetDateTime) -> i64 {
    t.unix_timestamp() * 1000 + i64::from(t.millisecond())
}

pub fn from_unix_millis(millis: i64) -> Result<OffsetDateTime, ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
}

/// Accepts RFC 3339, an offset-less date-time (read as UTC) or a bare
/// date (midnight UTC).
pub fn parse(field: &'static str, value: &str) -> Result<OffsetDateTime, ValidationError> {
    let value = value.trim();

    if let Ok(t) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(truncate_to_millis(t));
    }

    let date_time = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(t) = PrimitiveDateTime::parse(value, date_time) {
        return Ok(truncate_to_millis(t.assume_utc()));
    }

    if let Ok(d) = Date::parse(value, format_description!("[year]-[month]-[day]")) {
        return Ok(d.midnight().assume_utc());
    }

    Err(ValidationError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_parse_rfc3339_normalizes_offset() {
        let t = parse("occurredAt", "2024-03-01T12:00:00.250+02:00").unwrap();
        assert_eq!(t, datetime!(2024-03-01 10:00:00.25 UTC));
        assert_eq!(t.offset(), UtcOffset::UTC);
    }

    #[test]
    fn test_parse_without_offset_is_utc() {
        assert_eq!(
            parse("dateFrom", "2024-03-01T08:15:00").unwrap(),
            datetime!(2024-03-01 08:15:00 UTC)
        );
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        assert_eq!(
            parse("dateTo", "2024-03-01").unwrap(),
            datetime!(2024-03-01 00:00:00 UTC)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            parse("dateTo", "last tuesday"),
            Err(ValidationError::InvalidTimestamp {
                field: "dateTo",
                value: "last tuesday".to_string(),
            })
        );
        assert!(parse("dateTo", "2024-13-01").is_err());
    }

    #[test]
    fn test_truncates_sub_millisecond_precision() {
        let t = parse("occurredAt", "2024-03-01T12:00:00.123456789Z").unwrap();
        assert_eq!(t, datetime!(2024-03-01 12:00:00.123 UTC));
    }

    #[test]
    fn test_unix_millis_round_trip_before_epoch() {
        let t = datetime!(1969-12-31 23:59:59.5 UTC);
        assert_eq!(to_unix_millis(t), -500);
        assert_eq!(from_unix_millis(-500).unwrap(), t);
    }
}
