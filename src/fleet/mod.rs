//! Multi-user scheduling pass.
//!
//! One fleet tick walks every scheduler-enabled user, re-reads their
//! settings fresh, decides whether an action is due right now in their
//! timezone, and runs it. Users are processed sequentially and in
//! isolation: one user's failure never stops the pass.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::attendance::{ActionOutcome, AttendanceOrchestrator};
use crate::browser::PageLauncher;
use crate::messages::{MessageCatalog, MessageKey};
use crate::schedule::{minutes_of_day, zoned_now, AttendanceAction, EffectiveSchedule};
use crate::settings::{Lang, SettingsStore, UserSettings};

/// What a caller may ask to run for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunAction {
    CheckIn,
    CheckOut,
    /// Pick whichever action's effective time is nearer to now.
    Auto,
}

/// Per-user result of one fleet tick.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRunResult {
    /// Nothing was due for this user.
    NotDue,
    /// An action ran; the outcome says how it went.
    Executed(ActionOutcome),
    /// The user could not even be evaluated.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRunOutcome {
    pub user_id: String,
    pub result: UserRunResult,
}

/// Summary of one pass over all enabled users.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    /// How many users were evaluated.
    pub checked: usize,
    pub results: Vec<UserRunOutcome>,
}

/// Drives attendance automation across every user in the store.
pub struct FleetRunner {
    store: Arc<dyn SettingsStore>,
    launcher: Arc<dyn PageLauncher>,
    client: reqwest::Client,
    holiday_feed_url: Option<String>,
}

impl FleetRunner {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        launcher: Arc<dyn PageLauncher>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            store,
            launcher,
            client,
            holiday_feed_url: None,
        }
    }

    /// Override the public-holiday feed for every orchestrator built
    /// by this runner.
    pub fn with_holiday_feed(mut self, url: impl Into<String>) -> Self {
        self.holiday_feed_url = Some(url.into());
        self
    }

    fn orchestrator(&self, settings: UserSettings) -> AttendanceOrchestrator {
        let orch = AttendanceOrchestrator::new(
            settings,
            self.launcher.clone(),
            self.client.clone(),
        );
        match &self.holiday_feed_url {
            Some(url) => orch.with_holiday_feed(url.clone()),
            None => orch,
        }
    }

    /// Run one action for one user, re-reading their settings first.
    ///
    /// Messages about missing settings fall back to the default
    /// language because there is no user preference to consult yet.
    pub async fn execute_for_user(&self, user_id: &str, action: RunAction) -> ActionOutcome {
        let fallback = MessageCatalog::new(Lang::default());

        let settings = match self.store.get(user_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                warn!("No settings for user {}", user_id);
                return ActionOutcome::failure(fallback.get(MessageKey::SettingsNotFound));
            }
            Err(e) => {
                error!("Settings lookup for user {} failed: {}", user_id, e);
                return ActionOutcome::failure(
                    fallback.render(MessageKey::WorkflowError, &[("error", &e.to_string())]),
                );
            }
        };

        if action == RunAction::Auto && !settings.scheduler_enabled {
            let catalog = MessageCatalog::new(settings.message_language);
            return ActionOutcome::failure(catalog.get(MessageKey::SchedulerDisabled));
        }

        let catalog = MessageCatalog::new(settings.message_language);
        let orch = self.orchestrator(settings);
        match action {
            RunAction::CheckIn => orch.execute(AttendanceAction::CheckIn).await,
            RunAction::CheckOut => orch.execute(AttendanceAction::CheckOut).await,
            RunAction::Auto => match orch.execute_auto().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Auto action for user {} failed: {}", user_id, e);
                    ActionOutcome::failure(
                        catalog.render(MessageKey::WorkflowError, &[("error", &e.to_string())]),
                    )
                }
            },
        }
    }

    /// Decide whether an action is due for one user right now, and run
    /// it if so.
    async fn check_and_execute_for(&self, user_id: &str) -> UserRunResult {
        let settings = match self.store.get(user_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => return UserRunResult::NotDue,
            Err(e) => {
                error!("Scheduled check for user {} failed: {}", user_id, e);
                return UserRunResult::Failed(e.to_string());
            }
        };
        if !settings.scheduler_enabled {
            return UserRunResult::NotDue;
        }

        let schedule = match EffectiveSchedule::from_settings(&settings) {
            Ok(schedule) => schedule,
            Err(e) => {
                error!("Bad schedule for user {}: {}", user_id, e);
                return UserRunResult::Failed(e.to_string());
            }
        };

        let now = zoned_now(&settings.timezone);
        let Some(due) = schedule.due_now(minutes_of_day(&now)) else {
            return UserRunResult::NotDue;
        };

        let action = match due {
            AttendanceAction::CheckIn => RunAction::CheckIn,
            AttendanceAction::CheckOut => RunAction::CheckOut,
        };
        info!("User {} is due for {:?}", user_id, action);
        UserRunResult::Executed(self.execute_for_user(user_id, action).await)
    }

    /// One fleet tick over every scheduler-enabled user.
    pub async fn check_and_execute_for_all_users(&self) -> FleetReport {
        let users = match self.store.list_enabled().await {
            Ok(users) => users,
            Err(e) => {
                error!("Could not list enabled users: {}", e);
                return FleetReport::default();
            }
        };

        if users.is_empty() {
            info!("No users with the scheduler enabled");
            return FleetReport::default();
        }

        info!("Checking scheduled actions for {} users", users.len());

        let mut report = FleetReport {
            checked: users.len(),
            results: Vec::with_capacity(users.len()),
        };

        for user in users {
            let result = self.check_and_execute_for(&user.user_id).await;
            match &result {
                UserRunResult::NotDue => {}
                UserRunResult::Executed(outcome) if outcome.success => {
                    info!("User {} action succeeded: {}", user.user_id, outcome.message);
                }
                UserRunResult::Executed(outcome) => {
                    warn!("User {} action failed: {}", user.user_id, outcome.message);
                }
                UserRunResult::Failed(e) => {
                    warn!("User {} could not be evaluated: {}", user.user_id, e);
                }
            }
            report.results.push(UserRunOutcome {
                user_id: user.user_id,
                result,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::attendance::stub::{StubLauncher, StubState};
    use crate::settings::{MemorySettingsStore, StoreError};

    use super::*;

    const DEAD_FEED: &str = "http://127.0.0.1:9/basic.ics";

    /// Store wrapper that fails lookups for one user id.
    struct FlakyStore {
        inner: MemorySettingsStore,
        poisoned: String,
    }

    #[async_trait]
    impl SettingsStore for FlakyStore {
        async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
            if user_id == self.poisoned {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("corrupt record for {user_id}"),
                )));
            }
            self.inner.get(user_id).await
        }

        async fn list_enabled(&self) -> Result<Vec<UserSettings>, StoreError> {
            self.inner.list_enabled().await
        }
    }

    /// Settings whose check-in is due `offset` minutes from now (UTC),
    /// with the check-out pushed far away.
    fn user_due_in(user_id: &str, offset: i32) -> UserSettings {
        let now = minutes_of_day(&zoned_now("UTC"));
        let mut s = UserSettings::defaults(user_id);
        s.timezone = "UTC".to_string();
        s.weekdays_only = false;
        s.check_in_time = "00:00".to_string();
        s.check_in_delay = now + offset;
        s.check_out_time = "00:00".to_string();
        s.check_out_delay = now + 600;
        s.portal_email = "me@example.com".to_string();
        s.portal_password = "secret".to_string();
        s
    }

    #[tokio::test]
    async fn one_users_failure_does_not_stop_the_pass() {
        let store = MemorySettingsStore::new();
        store.insert(user_due_in("u1", 0)).await;
        store.insert(user_due_in("u2", 0)).await;
        store.insert(user_due_in("u3", 720)).await;
        let store = Arc::new(FlakyStore {
            inner: store,
            poisoned: "u2".to_string(),
        });

        let state = Arc::new(Mutex::new(StubState::default()));
        {
            // Only u1 actually reaches the portal.
            let mut s = state.lock().unwrap();
            s.statuses.push_back("미출근".to_string());
            s.statuses.push_back("근무중".to_string());
        }
        let runner = FleetRunner::new(
            store,
            Arc::new(StubLauncher::new(state.clone())),
            reqwest::Client::new(),
        )
        .with_holiday_feed(DEAD_FEED);

        let report = runner.check_and_execute_for_all_users().await;

        assert_eq!(report.checked, 3);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[0].user_id, "u1");
        match &report.results[0].result {
            UserRunResult::Executed(outcome) => assert!(outcome.success),
            other => panic!("u1 should have executed, got {other:?}"),
        }
        assert!(matches!(report.results[1].result, UserRunResult::Failed(_)));
        assert_eq!(report.results[2].result, UserRunResult::NotDue);
        // Exactly one browser session was launched and closed.
        assert_eq!(state.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn empty_store_yields_an_empty_report() {
        let runner = FleetRunner::new(
            Arc::new(MemorySettingsStore::new()),
            Arc::new(StubLauncher::new(Arc::new(Mutex::new(StubState::default())))),
            reqwest::Client::new(),
        );
        let report = runner.check_and_execute_for_all_users().await;
        assert_eq!(report, FleetReport::default());
    }

    #[tokio::test]
    async fn execute_for_user_rejects_missing_settings() {
        let runner = FleetRunner::new(
            Arc::new(MemorySettingsStore::new()),
            Arc::new(StubLauncher::new(Arc::new(Mutex::new(StubState::default())))),
            reqwest::Client::new(),
        );
        let outcome = runner.execute_for_user("ghost", RunAction::CheckIn).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("사용자 설정을 찾을 수 없습니다"));
    }

    #[tokio::test]
    async fn auto_requires_the_scheduler_to_be_enabled() {
        let store = MemorySettingsStore::new();
        let mut s = user_due_in("u1", 0);
        s.scheduler_enabled = false;
        store.insert(s).await;
        let runner = FleetRunner::new(
            Arc::new(store),
            Arc::new(StubLauncher::new(Arc::new(Mutex::new(StubState::default())))),
            reqwest::Client::new(),
        )
        .with_holiday_feed(DEAD_FEED);

        let outcome = runner.execute_for_user("u1", RunAction::Auto).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("자동 스케줄링이 비활성화"));
    }

    #[tokio::test]
    async fn malformed_schedule_is_reported_not_swallowed() {
        let store = MemorySettingsStore::new();
        let mut s = user_due_in("u1", 0);
        s.check_in_time = "nine".to_string();
        store.insert(s).await;
        let runner = FleetRunner::new(
            Arc::new(store),
            Arc::new(StubLauncher::new(Arc::new(Mutex::new(StubState::default())))),
            reqwest::Client::new(),
        );

        let report = runner.check_and_execute_for_all_users().await;
        assert!(matches!(report.results[0].result, UserRunResult::Failed(_)));
    }

    #[test]
    fn run_action_uses_camel_case_on_the_wire() {
        assert_eq!(
            serde_json::from_str::<RunAction>("\"checkIn\"").unwrap(),
            RunAction::CheckIn
        );
        assert_eq!(serde_json::to_string(&RunAction::Auto).unwrap(), "\"auto\"");
    }
}
