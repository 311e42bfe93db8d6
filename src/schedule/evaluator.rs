//! Effective-time arithmetic and due-now evaluation.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::settings::UserSettings;

/// How far from an effective time an action still counts as due.
pub const DUE_TOLERANCE_MINUTES: i32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid time string {0:?}: expected \"HH:MM\"")]
    InvalidTime(String),

    #[error("Settings not found for user {0}")]
    SettingsNotFound(String),
}

/// The two portal actions a schedule can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
}

/// Parse "HH:MM" into minutes since midnight.
///
/// Malformed input is a settings-store contract violation and fails fast.
pub fn parse_minutes(raw: &str) -> Result<i32, ConfigError> {
    let invalid = || ConfigError::InvalidTime(raw.to_string());
    let (hours, minutes) = raw.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.trim().parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.trim().parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Effective check-in/check-out times in raw minutes since midnight.
///
/// The sums carry the signed delay and may fall outside [0, 1440);
/// comparisons against "now" use the raw values consistently, and only
/// display code normalizes modulo 1440.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSchedule {
    pub check_in: i32,
    pub check_out: i32,
}

impl EffectiveSchedule {
    pub fn from_settings(settings: &UserSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            check_in: parse_minutes(&settings.check_in_time)? + settings.check_in_delay,
            check_out: parse_minutes(&settings.check_out_time)? + settings.check_out_delay,
        })
    }

    fn effective(&self, action: AttendanceAction) -> i32 {
        match action {
            AttendanceAction::CheckIn => self.check_in,
            AttendanceAction::CheckOut => self.check_out,
        }
    }

    /// Whether `action` is due at `now_minutes` (within the tolerance window).
    pub fn is_due(&self, action: AttendanceAction, now_minutes: i32) -> bool {
        (now_minutes - self.effective(action)).abs() <= DUE_TOLERANCE_MINUTES
    }

    /// First due action at `now_minutes`, check-in taking precedence so a
    /// fleet tick executes at most one action per user.
    pub fn due_now(&self, now_minutes: i32) -> Option<AttendanceAction> {
        if self.is_due(AttendanceAction::CheckIn, now_minutes) {
            Some(AttendanceAction::CheckIn)
        } else if self.is_due(AttendanceAction::CheckOut, now_minutes) {
            Some(AttendanceAction::CheckOut)
        } else {
            None
        }
    }

    /// Auto mode: the action whose effective time is nearer to now.
    /// Exact ties resolve to check-out (long-standing observed behavior).
    pub fn nearest_action(&self, now_minutes: i32) -> AttendanceAction {
        let diff_in = (now_minutes - self.check_in).abs();
        let diff_out = (now_minutes - self.check_out).abs();
        if diff_in < diff_out {
            AttendanceAction::CheckIn
        } else {
            AttendanceAction::CheckOut
        }
    }

    /// Project the effective times onto calendar timestamps for display.
    /// When both times are already past, the next check-in rolls to the
    /// following day. Display only; due-now decisions never use this.
    pub fn display_times(&self, now: NaiveDateTime) -> ScheduleDisplay {
        let check_in = project(now, self.check_in);
        let check_out = project(now, self.check_out);
        let next_check_in = if now > check_in && now > check_out {
            check_in + Duration::days(1)
        } else {
            check_in
        };
        ScheduleDisplay {
            next_check_in,
            next_check_out: check_out,
        }
    }
}

/// Human-facing projection of today's effective schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDisplay {
    pub next_check_in: NaiveDateTime,
    pub next_check_out: NaiveDateTime,
}

fn project(now: NaiveDateTime, raw_minutes: i32) -> NaiveDateTime {
    let day_offset = raw_minutes.div_euclid(1440);
    let minutes = raw_minutes.rem_euclid(1440);
    let time = NaiveTime::from_hms_opt(minutes as u32 / 60, minutes as u32 % 60, 0)
        .unwrap_or(NaiveTime::MIN);
    now.date().and_time(time) + Duration::days(day_offset as i64)
}
