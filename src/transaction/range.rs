//! Validated date ranges for querying transactions.

use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};
use time_tz::Tz;

use crate::{
    Error,
    timezone::{end_of_day, start_of_day},
};

/// A span of time to query, with `from <= to`.
///
/// Whether `to` is included depends on the query. Deserializing goes through
/// [DateRange::new], so a reversed range is rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    #[serde(with = "time::serde::rfc3339")]
    from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    to: OffsetDateTime,
}

#[derive(Deserialize)]
struct RawDateRange {
    #[serde(with = "time::serde::rfc3339")]
    from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    to: OffsetDateTime,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = Error;

    fn try_from(value: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(value.from, value.to)
    }
}

impl DateRange {
    /// Create a date range.
    ///
    /// # Errors
    /// Returns an [Error::InvalidRange] if `from` is later than `to`.
    pub fn new(from: OffsetDateTime, to: OffsetDateTime) -> Result<Self, Error> {
        if from > to {
            return Err(Error::InvalidRange(format!("{from} is later than {to}")));
        }

        Ok(Self { from, to })
    }

    /// Parse a date range from two strings.
    ///
    /// Each bound is either an RFC 3339 timestamp, e.g. "2024-03-01T00:00:00Z",
    /// or a calendar date, e.g. "2024-03-01". Dates are expanded to the start
    /// of the day for `from` and the end of the day for `to`, in `timezone`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidRange] if either bound cannot be parsed or
    /// `from` is later than `to`.
    pub fn parse(from: &str, to: &str, timezone: &Tz) -> Result<Self, Error> {
        let from = parse_bound(from, timezone, start_of_day)?;
        let to = parse_bound(to, timezone, end_of_day)?;

        Self::new(from, to)
    }

    /// The start of the range.
    pub fn from(&self) -> OffsetDateTime {
        self.from
    }

    /// The end of the range.
    pub fn to(&self) -> OffsetDateTime {
        self.to
    }
}

fn parse_bound(
    text: &str,
    timezone: &Tz,
    expand_date: fn(&Tz, Date) -> OffsetDateTime,
) -> Result<OffsetDateTime, Error> {
    let text = text.trim();

    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(date_time);
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map(|date| expand_date(timezone, date))
        .map_err(|error| {
            Error::InvalidRange(format!("could not parse \"{text}\" as a date: {error}"))
        })
}

#[cfg(test)]
mod date_range_tests {
    use time::macros::datetime;

    use super::DateRange;
    use crate::{
        Error,
        timezone::{REFERENCE_TIMEZONE, get_timezone},
    };

    #[test]
    fn new_fails_when_from_is_after_to() {
        let result = DateRange::new(
            datetime!(2024-03-02 00:00 UTC),
            datetime!(2024-03-01 00:00 UTC),
        );

        assert!(matches!(result, Err(Error::InvalidRange(_))));
    }

    #[test]
    fn new_accepts_empty_range() {
        let instant = datetime!(2024-03-01 00:00 UTC);

        assert!(DateRange::new(instant, instant).is_ok());
    }

    #[test]
    fn parse_accepts_timestamps() {
        let timezone = get_timezone(REFERENCE_TIMEZONE).unwrap();

        let range =
            DateRange::parse("2024-03-01T00:00:00Z", "2024-03-31T00:00:00+11:00", timezone)
                .unwrap();

        assert_eq!(range.from(), datetime!(2024-03-01 00:00 UTC));
        assert_eq!(range.to(), datetime!(2024-03-30 13:00 UTC));
    }

    #[test]
    fn parse_expands_dates_to_whole_local_days() {
        let timezone = get_timezone(REFERENCE_TIMEZONE).unwrap();

        let range = DateRange::parse("2024-03-01", "2024-03-31", timezone).unwrap();

        assert_eq!(range.from(), datetime!(2024-02-29 13:00 UTC));
        assert_eq!(range.to(), datetime!(2024-03-31 12:59:59.999 UTC));
    }

    #[test]
    fn parse_rejects_garbage() {
        let timezone = get_timezone(REFERENCE_TIMEZONE).unwrap();

        let result = DateRange::parse("yesterday", "2024-03-31", timezone);

        assert!(matches!(result, Err(Error::InvalidRange(_))));
    }

    #[test]
    fn parse_rejects_reversed_dates() {
        let timezone = get_timezone(REFERENCE_TIMEZONE).unwrap();

        let result = DateRange::parse("2024-04-01", "2024-03-31", timezone);

        assert!(matches!(result, Err(Error::InvalidRange(_))));
    }

    #[test]
    fn deserializing_rejects_reversed_range() {
        let json = r#"{"from":"2024-02-01T00:00:00Z","to":"2024-01-01T00:00:00Z"}"#;

        let result = serde_json::from_str::<DateRange>(json);

        assert!(result.is_err());
    }

    #[test]
    fn serde_keeps_valid_range() {
        let range = DateRange::new(
            datetime!(2024-01-01 00:00 UTC),
            datetime!(2024-02-01 00:00 UTC),
        )
        .unwrap();

        let json = serde_json::to_string(&range).unwrap();

        assert_eq!(serde_json::from_str::<DateRange>(&json).unwrap(), range);
    }
}
