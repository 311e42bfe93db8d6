//! One-shot attendance action orchestration.
//!
//! Wraps a single check-in/check-out in the full lifecycle: workday
//! gate, browser launch, login, state machine, teardown. Every path
//! funnels into an [`ActionOutcome`] so callers never see a raw error.

use std::sync::Arc;

use tracing::{error, info, warn};

use chrono::NaiveDate;

use crate::browser::{PageLauncher, PortalPage};
use crate::calendar::OffDayCalendar;
use crate::messages::{MessageCatalog, MessageKey};
use crate::notify::{sink_for_settings, NotificationSink};
use crate::schedule::{minutes_of_day, zoned_now, AttendanceAction, ConfigError, EffectiveSchedule};
use crate::settings::UserSettings;

use super::driver::{AttendanceDriver, PortalConfig};
use super::ActionOutcome;

pub struct AttendanceOrchestrator {
    settings: UserSettings,
    launcher: Arc<dyn PageLauncher>,
    driver: AttendanceDriver,
    calendar: OffDayCalendar,
    catalog: MessageCatalog,
    notifier: Arc<dyn NotificationSink>,
    today_override: Option<NaiveDate>,
}

impl AttendanceOrchestrator {
    /// Build an orchestrator for one user. Notifications go to the
    /// user's Telegram bot, or to the log when no bot is configured.
    pub fn new(
        settings: UserSettings,
        launcher: Arc<dyn PageLauncher>,
        client: reqwest::Client,
    ) -> Self {
        let notifier = sink_for_settings(client.clone(), &settings);
        let catalog = MessageCatalog::new(settings.message_language);
        let driver = AttendanceDriver::new(
            PortalConfig::default(),
            settings.clone(),
            notifier.clone(),
        );
        Self {
            settings,
            launcher,
            driver,
            calendar: OffDayCalendar::new(client),
            catalog,
            notifier,
            today_override: None,
        }
    }

    /// Override the public-holiday feed (tests, other regions).
    pub fn with_holiday_feed(mut self, url: impl Into<String>) -> Self {
        self.calendar = self.calendar.with_holiday_feed(url);
        self
    }

    /// Replace the notification channel.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.driver.notifier = notifier.clone();
        self.notifier = notifier;
        self
    }

    /// Pin the workday gate's date instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today_override = Some(today);
        self
    }

    /// Run one action end to end, including the workday gate.
    pub async fn execute(&self, action: AttendanceAction) -> ActionOutcome {
        info!(
            "Starting {:?} for user {}",
            action, self.settings.user_id
        );

        let today = self
            .today_override
            .unwrap_or_else(|| zoned_now(&self.settings.timezone).date_naive());
        if !self.calendar.is_workday(&self.settings, today).await {
            let message = self.catalog.get(MessageKey::NotWorkday);
            info!("{}", message);
            return ActionOutcome::failure(message);
        }

        self.perform_action(action).await
    }

    /// Auto mode: run whichever action's effective time is nearer to
    /// now in the user's timezone.
    pub async fn execute_auto(&self) -> Result<ActionOutcome, ConfigError> {
        let schedule = EffectiveSchedule::from_settings(&self.settings)?;
        let now = zoned_now(&self.settings.timezone);
        let action = schedule.nearest_action(minutes_of_day(&now));
        info!(
            "Auto mode resolved to {:?} for user {}",
            action, self.settings.user_id
        );
        Ok(self.execute(action).await)
    }

    /// Launch a browser, run the action's state machine, and always
    /// close the browser afterwards.
    pub async fn perform_action(&self, action: AttendanceAction) -> ActionOutcome {
        let page = match self.launcher.launch().await {
            Ok(page) => page,
            Err(e) => {
                error!("Browser launch failed: {}", e);
                let message = self
                    .catalog
                    .render(MessageKey::BrowserLaunchFailed, &[("error", &e.to_string())]);
                self.notifier.send(&message, true).await;
                return ActionOutcome::failure(
                    self.catalog
                        .render(MessageKey::WorkflowError, &[("error", &e.to_string())]),
                );
            }
        };

        let outcome = match self.driver.open(page.as_ref()).await {
            Err(e) => {
                // open() already notified the user.
                ActionOutcome::failure(
                    self.catalog
                        .render(MessageKey::WorkflowError, &[("error", &e.to_string())]),
                )
            }
            Ok(()) => {
                let success = match action {
                    AttendanceAction::CheckIn => self.driver.check_in(page.as_ref()).await,
                    AttendanceAction::CheckOut => self.driver.check_out(page.as_ref()).await,
                };
                match (action, success) {
                    (AttendanceAction::CheckIn, true) => {
                        ActionOutcome::success(self.catalog.get(MessageKey::CheckInCompleted))
                    }
                    (AttendanceAction::CheckOut, true) => {
                        ActionOutcome::success(self.catalog.get(MessageKey::CheckOutCompleted))
                    }
                    (AttendanceAction::CheckIn, false) => {
                        ActionOutcome::failure(self.catalog.get(MessageKey::CheckInFailed))
                    }
                    (AttendanceAction::CheckOut, false) => {
                        ActionOutcome::failure(self.catalog.get(MessageKey::CheckOutFailed))
                    }
                }
            }
        };

        if let Err(e) = page.close().await {
            warn!("Browser close failed: {}", e);
        }
        info!(
            "{:?} for user {} finished: success={}",
            action, self.settings.user_id, outcome.success
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::super::stub::{RecordingSink, StubLauncher, StubState};
    use super::*;
    use crate::settings::Lang;

    /// Unroutable feed URL: the calendar check fails open instantly.
    const DEAD_FEED: &str = "http://127.0.0.1:9/basic.ics";

    fn settings() -> UserSettings {
        let mut s = UserSettings::defaults("u1");
        s.portal_email = "me@example.com".to_string();
        s.portal_password = "secret".to_string();
        s.message_language = Lang::En;
        // Keep the workday gate out of the way unless a test opts in.
        s.weekdays_only = false;
        s
    }

    fn orchestrator(
        settings: UserSettings,
        state: Arc<Mutex<StubState>>,
    ) -> (AttendanceOrchestrator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let orch = AttendanceOrchestrator::new(
            settings,
            Arc::new(StubLauncher::new(state)),
            reqwest::Client::new(),
        )
        .with_holiday_feed(DEAD_FEED)
        .with_notifier(sink.clone());
        (orch, sink)
    }

    #[tokio::test]
    async fn execute_check_in_closes_the_browser_either_way() {
        for scripted in [vec!["미출근", "근무중"], vec!["휴식중"]] {
            let state = Arc::new(Mutex::new(StubState::default()));
            state
                .lock()
                .unwrap()
                .statuses
                .extend(scripted.iter().map(|s| s.to_string()));
            let (orch, _sink) = orchestrator(settings(), state.clone());

            orch.execute(AttendanceAction::CheckIn).await;
            assert_eq!(state.lock().unwrap().closed, 1);
        }
    }

    #[tokio::test]
    async fn successful_check_in_reports_completed() {
        let state = Arc::new(Mutex::new(StubState::default()));
        {
            let mut s = state.lock().unwrap();
            s.statuses.push_back("미출근".to_string());
            s.statuses.push_back("근무중".to_string());
        }
        let (orch, _sink) = orchestrator(settings(), state);

        let outcome = orch.execute(AttendanceAction::CheckIn).await;
        assert!(outcome.success);
        assert_eq!(outcome.message, "Check-in completed successfully.");
    }

    #[tokio::test]
    async fn failed_check_out_reports_failure() {
        let state = Arc::new(Mutex::new(StubState::default()));
        // Unknown status: the state machine rejects the check-out.
        state
            .lock()
            .unwrap()
            .statuses
            .push_back("점검중".to_string());
        let (orch, _sink) = orchestrator(settings(), state);

        let outcome = orch.execute(AttendanceAction::CheckOut).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Check-out failed or was not applicable.");
    }

    #[tokio::test]
    async fn launch_failure_produces_failed_outcome_and_notification() {
        let state = Arc::new(Mutex::new(StubState::default()));
        let sink = Arc::new(RecordingSink::default());
        let mut launcher = StubLauncher::new(state);
        launcher.fail_launch = true;
        let orch = AttendanceOrchestrator::new(
            settings(),
            Arc::new(launcher),
            reqwest::Client::new(),
        )
        .with_holiday_feed(DEAD_FEED)
        .with_notifier(sink.clone());

        let outcome = orch.execute(AttendanceAction::CheckIn).await;
        assert!(!outcome.success);
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1);
    }

    #[tokio::test]
    async fn weekend_is_gated_when_weekdays_only() {
        let mut s = settings();
        s.weekdays_only = true;
        let state = Arc::new(Mutex::new(StubState::default()));
        let (orch, _sink) = orchestrator(s, state.clone());
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();

        let outcome = orch
            .with_today(saturday)
            .execute(AttendanceAction::CheckIn)
            .await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Today is not a workday. Skipping the attendance action."
        );
        assert_eq!(state.lock().unwrap().closed, 0, "no browser on off days");
    }

    #[tokio::test]
    async fn weekday_passes_the_gate_when_weekdays_only() {
        let mut s = settings();
        s.weekdays_only = true;
        let state = Arc::new(Mutex::new(StubState::default()));
        {
            let mut st = state.lock().unwrap();
            st.statuses.push_back("미출근".to_string());
            st.statuses.push_back("근무중".to_string());
        }
        let (orch, _sink) = orchestrator(s, state.clone());
        let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();

        let outcome = orch
            .with_today(tuesday)
            .execute(AttendanceAction::CheckIn)
            .await;
        assert!(outcome.success);
        assert_eq!(state.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn auto_mode_picks_the_nearer_action() {
        // Make check-out the unambiguous nearest action by pushing the
        // check-in time a full day away from now.
        let mut s = settings();
        s.timezone = "UTC".to_string();
        let now = zoned_now("UTC");
        let minutes = minutes_of_day(&now);
        s.check_in_time = "00:00".to_string();
        s.check_in_delay = minutes - 720; // 12h away from now
        s.check_out_time = "00:00".to_string();
        s.check_out_delay = minutes; // exactly now

        let state = Arc::new(Mutex::new(StubState::default()));
        {
            let mut st = state.lock().unwrap();
            st.statuses.push_back("근무중".to_string());
            st.statuses.push_back("휴식중".to_string());
        }
        let (orch, _sink) = orchestrator(s, state);

        let outcome = orch.execute_auto().await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "Check-out completed successfully.");
    }

    #[tokio::test]
    async fn auto_mode_rejects_malformed_times() {
        let mut s = settings();
        s.check_in_time = "9am".to_string();
        let state = Arc::new(Mutex::new(StubState::default()));
        let (orch, _sink) = orchestrator(s, state);

        assert!(matches!(
            orch.execute_auto().await,
            Err(ConfigError::InvalidTime(_))
        ));
    }
}
