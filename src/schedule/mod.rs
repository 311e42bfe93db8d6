//! Schedule evaluation.
//!
//! Pure time arithmetic over the per-user schedule settings: effective
//! times, the due-now window, auto-mode nearest-action selection, and the
//! display-only projection onto calendar dates.

mod evaluator;

pub use evaluator::{
    parse_minutes, AttendanceAction, ConfigError, EffectiveSchedule, ScheduleDisplay,
    DUE_TOLERANCE_MINUTES,
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Fallback zone when a user's timezone setting does not parse.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

/// Current wall-clock time in the user's configured timezone.
///
/// An unparseable zone name is a preference problem, not corrupt data, so
/// it degrades to the default zone with a warning instead of failing.
pub fn zoned_now(tz_name: &str) -> DateTime<Tz> {
    let tz: Tz = match tz_name.parse() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unknown timezone {:?}, falling back to {}", tz_name, DEFAULT_TIMEZONE);
            DEFAULT_TIMEZONE
        }
    };
    Utc::now().with_timezone(&tz)
}

/// Minutes since local midnight for a zoned instant.
pub fn minutes_of_day(now: &DateTime<Tz>) -> i32 {
    use chrono::Timelike;
    (now.hour() * 60 + now.minute()) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_timezone_falls_back() {
        let now = zoned_now("Not/AZone");
        assert_eq!(now.timezone(), DEFAULT_TIMEZONE);
    }

    #[test]
    fn known_timezone_is_used() {
        let now = zoned_now("Asia/Tokyo");
        assert_eq!(now.timezone(), chrono_tz::Asia::Tokyo);
        let m = minutes_of_day(&now);
        assert!((0..1440).contains(&m));
    }
}
