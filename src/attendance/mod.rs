//! Attendance automation core.
//!
//! [`AttendanceDriver`] runs the page-level flows (login, status read,
//! toggle, check-in/check-out state machines) against a [`PortalPage`];
//! [`AttendanceOrchestrator`] wraps a whole action in browser lifecycle,
//! workday gating and outcome reporting.
//!
//! [`PortalPage`]: crate::browser::PortalPage

mod driver;
mod orchestrator;

pub use driver::{
    AttendanceDriver, PortalConfig, API_RESPONSE_TIMEOUT, LOGIN_NAV_TIMEOUT, STATUS_READ_TIMEOUT,
    UI_SETTLE_DELAY,
};
pub use orchestrator::AttendanceOrchestrator;

use std::fmt;

/// Portal status tokens as rendered by the attendance page.
pub const STATUS_NOT_CHECKED_IN: &str = "미출근";
pub const STATUS_WORKING: &str = "근무중";
pub const STATUS_RESTING: &str = "휴식중";

/// Working status shown by the portal's attendance page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkStatus {
    NotCheckedIn,
    Working,
    Resting,
    /// Anything the portal shows that we do not recognize.
    Unknown(String),
}

impl WorkStatus {
    /// Map a trimmed portal status string onto a known status.
    pub fn from_portal(raw: &str) -> Self {
        match raw {
            STATUS_NOT_CHECKED_IN => WorkStatus::NotCheckedIn,
            STATUS_WORKING => WorkStatus::Working,
            STATUS_RESTING => WorkStatus::Resting,
            other => WorkStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for WorkStatus {
    /// Displays as the portal's own token, so messages echo what the
    /// user would see on the page.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkStatus::NotCheckedIn => f.write_str(STATUS_NOT_CHECKED_IN),
            WorkStatus::Working => f.write_str(STATUS_WORKING),
            WorkStatus::Resting => f.write_str(STATUS_RESTING),
            WorkStatus::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Terminal result of one attendance action, in the user's language.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! Scripted page and launcher for driving the attendance flows in
    //! tests without a browser.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::browser::{BrowserError, PageLauncher, PortalPage};
    use crate::notify::NotificationSink;

    /// Shared state between a test and the pages it hands out.
    #[derive(Default)]
    pub struct StubState {
        /// Status strings returned by successive status reads.
        pub statuses: VecDeque<String>,
        /// Clicks recorded by selector.
        pub clicks: Vec<String>,
        /// Fills recorded as (selector, value).
        pub fills: Vec<(String, String)>,
        /// URLs navigated to.
        pub navigations: Vec<String>,
        /// Whether the post-login URL wait should fail.
        pub fail_url_wait: bool,
        /// Whether clicking the toggle should fail.
        pub fail_toggle_click: bool,
        /// Whether login form fills should fail.
        pub fail_fill: bool,
        /// Number of pages closed.
        pub closed: usize,
    }

    pub struct StubPage {
        pub state: Arc<Mutex<StubState>>,
    }

    #[async_trait]
    impl PortalPage for StubPage {
        async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
            self.state.lock().unwrap().navigations.push(url.to_string());
            Ok(())
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok("https://ssl.jobcan.jp/employee".to_string())
        }

        async fn wait_for_url_prefix(
            &self,
            prefix: &str,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            if self.state.lock().unwrap().fail_url_wait {
                Err(BrowserError::Timeout(format!("never reached {prefix}")))
            } else {
                Ok(())
            }
        }

        async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_fill {
                return Err(BrowserError::ElementNotFound(selector.to_string()));
            }
            state.fills.push((selector.to_string(), value.to_string()));
            Ok(())
        }

        async fn click(&self, selector: &str) -> Result<(), BrowserError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_toggle_click && selector.contains("adit-button") {
                return Err(BrowserError::ElementNotFound(selector.to_string()));
            }
            state.clicks.push(selector.to_string());
            Ok(())
        }

        async fn element_text(
            &self,
            _selector: &str,
            _timeout: Duration,
        ) -> Result<String, BrowserError> {
            self.state
                .lock()
                .unwrap()
                .statuses
                .pop_front()
                .ok_or_else(|| BrowserError::Timeout("no scripted status left".into()))
        }

        async fn wait_for_api_response(
            &self,
            _url_fragment: &str,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), BrowserError> {
            self.state.lock().unwrap().closed += 1;
            Ok(())
        }
    }

    pub struct StubLauncher {
        pub state: Arc<Mutex<StubState>>,
        /// When set, launching fails outright.
        pub fail_launch: bool,
    }

    impl StubLauncher {
        pub fn new(state: Arc<Mutex<StubState>>) -> Self {
            Self {
                state,
                fail_launch: false,
            }
        }
    }

    #[async_trait]
    impl PageLauncher for StubLauncher {
        async fn launch(&self) -> Result<Box<dyn PortalPage>, BrowserError> {
            if self.fail_launch {
                return Err(BrowserError::LaunchFailed("no chrome in test".into()));
            }
            Ok(Box::new(StubPage {
                state: self.state.clone(),
            }))
        }
    }

    /// Notification spy collecting (message, is_error) pairs.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, message: &str, is_error: bool) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_string(), is_error));
            true
        }
    }
}
