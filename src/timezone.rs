//! Conversions between UTC instants and the reference timezone.

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, macros::time};
use time_tz::{Offset, PrimitiveDateTimeExt, TimeZone, Tz};

use crate::Error;

/// The canonical name of the timezone that calendar periods are evaluated in.
pub const REFERENCE_TIMEZONE: &str = "Australia/Melbourne";

/// Look up a timezone by its canonical name, e.g. "Australia/Melbourne".
///
/// # Errors
/// Returns [Error::InvalidTimezone] if the name is not in the timezone database.
pub fn get_timezone(canonical_timezone: &str) -> Result<&'static Tz, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))
}

/// The UTC offset of `timezone` at the instant `date_time`.
pub fn get_offset_at(timezone: &Tz, date_time: OffsetDateTime) -> UtcOffset {
    timezone.get_offset_utc(&date_time).to_utc()
}

/// Express `date_time` as wall-clock time in `timezone`.
///
/// The instant is unchanged, only the offset differs. Daylight saving is
/// resolved for the instant itself, so two instants either side of a
/// transition get different offsets.
pub fn to_local(timezone: &Tz, date_time: OffsetDateTime) -> OffsetDateTime {
    date_time.to_offset(get_offset_at(timezone, date_time))
}

/// The first instant of `date` in `timezone`.
pub fn start_of_day(timezone: &Tz, date: Date) -> OffsetDateTime {
    assume_local(timezone, PrimitiveDateTime::new(date, Time::MIDNIGHT))
}

/// The last millisecond of `date` in `timezone`.
pub fn end_of_day(timezone: &Tz, date: Date) -> OffsetDateTime {
    assume_local(timezone, PrimitiveDateTime::new(date, time!(23:59:59.999)))
}

/// Attach the offset `timezone` has at the wall-clock time `local`.
///
/// Ambiguous wall-clock times (the repeated hour when daylight saving ends)
/// resolve to the earlier instant. Wall-clock times skipped by daylight saving
/// fall back to the standard offset of the day.
fn assume_local(timezone: &Tz, local: PrimitiveDateTime) -> OffsetDateTime {
    match local.assume_timezone(timezone).take_first() {
        Some(date_time) => date_time,
        None => {
            let noon = local.replace_time(time!(12:00));
            let offset = get_offset_at(timezone, noon.assume_utc());
            local.assume_offset(offset)
        }
    }
}
