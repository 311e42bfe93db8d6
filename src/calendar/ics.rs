//! Minimal ICS feed parsing.
//!
//! Only what the off-day checks need: VEVENT blocks with SUMMARY and
//! DTSTART, with long-line folding support. Start values are normalized
//! to a calendar date; time-of-day is irrelevant for off-day matching.

use chrono::{DateTime, NaiveDate};

/// One parsed VEVENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsEvent {
    pub summary: Option<String>,
    pub start: Option<NaiveDate>,
}

#[derive(Clone, Copy, PartialEq)]
enum Prop {
    Summary,
    Start,
    Other,
}

/// Parse every VEVENT in an ICS document.
pub fn parse_events(data: &str) -> Vec<IcsEvent> {
    let mut events = Vec::new();
    let mut in_event = false;
    let mut summary_raw: Option<String> = None;
    let mut start_raw: Option<String> = None;
    let mut last_prop = Prop::Other;

    for line in data.lines() {
        let line = line.trim_end_matches('\r');

        if line.starts_with("BEGIN:VEVENT") {
            in_event = true;
            summary_raw = None;
            start_raw = None;
            last_prop = Prop::Other;
            continue;
        }
        if line.starts_with("END:VEVENT") {
            if in_event {
                events.push(IcsEvent {
                    summary: summary_raw.take(),
                    start: start_raw.take().as_deref().and_then(parse_ical_date),
                });
            }
            in_event = false;
            continue;
        }
        if !in_event {
            continue;
        }

        // Folded continuation lines belong to the previous property.
        if line.starts_with(' ') || line.starts_with('\t') {
            let continuation = &line[1..];
            match last_prop {
                Prop::Summary => {
                    if let Some(s) = summary_raw.as_mut() {
                        s.push_str(continuation);
                    }
                }
                Prop::Start => {
                    if let Some(s) = start_raw.as_mut() {
                        s.push_str(continuation);
                    }
                }
                Prop::Other => {}
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            last_prop = Prop::Other;
            continue;
        };
        // Parameters like "DTSTART;VALUE=DATE" hang off the key.
        let name = key.split(';').next().unwrap_or(key);
        match name {
            "SUMMARY" => {
                summary_raw = Some(value.to_string());
                last_prop = Prop::Summary;
            }
            "DTSTART" => {
                start_raw = Some(value.to_string());
                last_prop = Prop::Start;
            }
            _ => last_prop = Prop::Other,
        }
    }

    events
}

/// Normalize a DTSTART value to a calendar date.
///
/// Supports the compact UTC timestamp form `yyyyMMddTHHmmssZ`, the
/// date-only form `yyyyMMdd`, and RFC 3339 / `%Y-%m-%d` fallbacks.
pub fn parse_ical_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    let is_utc_stamp = raw.len() == 16
        && raw.as_bytes()[8] == b'T'
        && raw.ends_with('Z')
        && raw[..8].bytes().all(|b| b.is_ascii_digit())
        && raw[9..15].bytes().all(|b| b.is_ascii_digit());
    if is_utc_stamp {
        return NaiveDate::parse_from_str(&raw[..8], "%Y%m%d").ok();
    }

    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(raw, "%Y%m%d").ok();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
