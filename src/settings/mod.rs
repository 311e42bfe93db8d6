//! User settings model and settings-store contract.
//!
//! Settings are owned by the external settings service; this crate only
//! reads them. Every evaluation re-reads from the store so that updates
//! take effect on the next pass without any in-process cache.

mod store;

pub use store::{JsonSettingsStore, MemorySettingsStore, SettingsStore, StoreError};

/// Message language for notifications and outcome messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Ko,
    Ja,
}

impl Default for Lang {
    fn default() -> Self {
        Lang::Ko
    }
}

/// Per-user attendance automation settings.
///
/// Delay values are added to the configured time-of-day in minutes: a
/// negative delay moves the effective time earlier, a positive one later.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    /// Portal login credentials. Empty strings mean "log in manually".
    #[serde(default)]
    pub portal_email: String,
    #[serde(default)]
    pub portal_password: String,
    /// Schedule ("HH:MM" clock times plus signed minute offsets).
    pub check_in_time: String,
    pub check_out_time: String,
    #[serde(default)]
    pub check_in_delay: i32,
    #[serde(default)]
    pub check_out_delay: i32,
    pub weekdays_only: bool,
    pub scheduler_enabled: bool,
    /// Suppresses the actual toggle click while exercising the full flow.
    #[serde(default)]
    pub test_mode: bool,
    /// IANA timezone name the schedule times are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub message_language: Lang,
    /// Telegram notification target; both must be set to enable delivery.
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,
    /// Personal leave calendar (ICS feed). Blank disables the leave check.
    #[serde(default)]
    pub annual_leave_calendar_url: String,
    #[serde(default = "default_leave_keyword")]
    pub annual_leave_keyword: String,
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

fn default_leave_keyword() -> String {
    "연차".to_string()
}

impl UserSettings {
    /// Default settings for a new user.
    pub fn defaults(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            portal_email: String::new(),
            portal_password: String::new(),
            check_in_time: "09:00".to_string(),
            check_out_time: "18:00".to_string(),
            check_in_delay: -10,
            check_out_delay: 5,
            weekdays_only: true,
            scheduler_enabled: true,
            test_mode: false,
            timezone: default_timezone(),
            message_language: Lang::default(),
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
            annual_leave_calendar_url: String::new(),
            annual_leave_keyword: default_leave_keyword(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.portal_email.is_empty() && !self.portal_password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = UserSettings::defaults("u1");
        assert_eq!(s.check_in_time, "09:00");
        assert_eq!(s.check_out_time, "18:00");
        assert_eq!(s.check_in_delay, -10);
        assert_eq!(s.check_out_delay, 5);
        assert!(s.weekdays_only);
        assert!(s.scheduler_enabled);
        assert_eq!(s.timezone, "Asia/Seoul");
        assert_eq!(s.annual_leave_keyword, "연차");
        assert_eq!(s.message_language, Lang::Ko);
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let json = r#"{
            "userId": "u1",
            "checkInTime": "08:30",
            "checkOutTime": "17:30",
            "weekdaysOnly": false,
            "schedulerEnabled": true,
            "messageLanguage": "ja"
        }"#;
        let s: UserSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.user_id, "u1");
        assert_eq!(s.check_in_delay, 0);
        assert_eq!(s.timezone, "Asia/Seoul");
        assert_eq!(s.message_language, Lang::Ja);
        assert!(!s.test_mode);
    }
}
