//! Off-day calendar checks.
//!
//! Decides whether a date is a personal annual-leave day or a public
//! holiday by reading ICS feeds. Every fetch/parse failure is fail-open:
//! a calendar outage must never block attendance automation, so errors
//! are logged and treated as "not an off day".

mod ics;

pub use ics::{parse_events, parse_ical_date, IcsEvent};

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{info, warn};

use crate::settings::UserSettings;

/// Korean national holiday feed used for the public-holiday check.
pub const PUBLIC_HOLIDAY_FEED_URL: &str =
    "https://calendar.google.com/calendar/ical/ko.south_korea%23holiday%40group.v.calendar.google.com/public/basic.ics";

/// Placeholder for holiday events without a SUMMARY.
const UNNAMED_HOLIDAY: &str = "이름 없는 공휴일";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OffDayKind {
    AnnualLeave,
    PublicHoliday,
}

/// Why a date is not a workday.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffDayInfo {
    pub kind: OffDayKind,
    pub name: String,
}

/// Annual-leave and public-holiday lookups over ICS feeds.
pub struct OffDayCalendar {
    client: reqwest::Client,
    holiday_feed_url: String,
}

impl OffDayCalendar {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            holiday_feed_url: PUBLIC_HOLIDAY_FEED_URL.to_string(),
        }
    }

    /// Override the public-holiday feed (tests, other regions).
    pub fn with_holiday_feed(mut self, url: impl Into<String>) -> Self {
        self.holiday_feed_url = url.into();
        self
    }

    /// Whether `today` is an off day for this user. Personal leave is
    /// checked first and wins over a public holiday on the same date.
    pub async fn is_off_day(&self, settings: &UserSettings, today: NaiveDate) -> Option<OffDayInfo> {
        let leave_url = settings.annual_leave_calendar_url.trim();
        if leave_url.is_empty() || settings.annual_leave_keyword.is_empty() {
            info!("Annual leave calendar not configured, skipping leave check");
        } else if let Some(events) = self.fetch_events(leave_url).await {
            if let Some(name) = annual_leave_match(&events, &settings.annual_leave_keyword, today) {
                info!("Today ({}) is an annual leave day: {}", today, name);
                return Some(OffDayInfo {
                    kind: OffDayKind::AnnualLeave,
                    name,
                });
            }
        }

        if let Some(events) = self.fetch_events(&self.holiday_feed_url).await {
            if let Some(name) = public_holiday_match(&events, today) {
                info!("Today ({}) is a public holiday: {}", today, name);
                return Some(OffDayInfo {
                    kind: OffDayKind::PublicHoliday,
                    name,
                });
            }
        }

        None
    }

    /// Whether `today` is a day the automation should run: no off-day
    /// match, and with `weekdays_only` not a Saturday or Sunday.
    pub async fn is_workday(&self, settings: &UserSettings, today: NaiveDate) -> bool {
        if let Some(off) = self.is_off_day(settings, today).await {
            info!("Today is an off day: {:?} - {}", off.kind, off.name);
            return false;
        }
        if settings.weekdays_only && is_weekend(today.weekday()) {
            info!("Today ({}) is a weekend, not a workday", today);
            return false;
        }
        true
    }

    async fn fetch_events(&self, url: &str) -> Option<Vec<IcsEvent>> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Calendar fetch failed for {}: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Calendar fetch for {} returned {}", url, response.status());
            return None;
        }
        match response.text().await {
            Ok(body) => Some(parse_events(&body)),
            Err(e) => {
                warn!("Calendar body read failed for {}: {}", url, e);
                None
            }
        }
    }
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// First event starting `today` whose summary contains the keyword
/// (case-sensitive substring match).
pub fn annual_leave_match(events: &[IcsEvent], keyword: &str, today: NaiveDate) -> Option<String> {
    events.iter().find_map(|event| {
        let summary = event.summary.as_deref()?;
        (event.start == Some(today) && summary.contains(keyword)).then(|| summary.to_string())
    })
}

/// First event starting `today`, summary content irrelevant.
pub fn public_holiday_match(events: &[IcsEvent], today: NaiveDate) -> Option<String> {
    events.iter().find_map(|event| {
        (event.start == Some(today))
            .then(|| event.summary.clone().unwrap_or_else(|| UNNAMED_HOLIDAY.to_string()))
    })
}
