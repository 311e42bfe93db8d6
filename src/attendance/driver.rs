//! Page-level attendance flows.
//!
//! Everything here operates on an already-launched [`PortalPage`]. The
//! flows mirror what a person does on the portal: log in, read the
//! working status badge, press the punch button, confirm the status
//! moved. Recoverable problems notify the user and degrade; only
//! browser-fatal problems propagate.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::browser::{BrowserError, PortalPage};
use crate::messages::{MessageCatalog, MessageKey};
use crate::notify::NotificationSink;
use crate::settings::UserSettings;

use super::{WorkStatus, STATUS_NOT_CHECKED_IN, STATUS_RESTING, STATUS_WORKING};

/// How long a manual or automatic login may take to land on the
/// attendance page.
pub const LOGIN_NAV_TIMEOUT: Duration = Duration::from_secs(120);

/// How long to wait for the working status badge to render.
pub const STATUS_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the punch API call after clicking the button.
pub const API_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settle delay after the punch API responds, before re-reading status.
pub const UI_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Portal URLs and selectors. Defaults target Jobcan.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub login_url: String,
    /// Landing on any URL with this prefix means login succeeded.
    pub attendance_url_prefix: String,
    pub email_selector: String,
    pub password_selector: String,
    pub login_button_selector: String,
    pub toggle_selector: String,
    pub status_selector: String,
    /// Punch requests are recognized by this URL fragment.
    pub api_url_fragment: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: "https://id.jobcan.jp/users/sign_in?app_key=atd".to_string(),
            attendance_url_prefix: "https://ssl.jobcan.jp/employee".to_string(),
            email_selector: "#user_email".to_string(),
            password_selector: "#user_password".to_string(),
            login_button_selector: "#login_button".to_string(),
            toggle_selector: "#adit-button-push".to_string(),
            status_selector: "#working_status".to_string(),
            api_url_fragment: "jobcan.jp/employee/".to_string(),
        }
    }
}

/// Runs the attendance flows for one user on one page.
pub struct AttendanceDriver {
    pub(crate) config: PortalConfig,
    pub(crate) settings: UserSettings,
    pub(crate) catalog: MessageCatalog,
    pub(crate) notifier: Arc<dyn NotificationSink>,
}

impl AttendanceDriver {
    pub fn new(
        config: PortalConfig,
        settings: UserSettings,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let catalog = MessageCatalog::new(settings.message_language);
        Self {
            config,
            settings,
            catalog,
            notifier,
        }
    }

    async fn notify(&self, key: MessageKey, params: &[(&str, &str)], is_error: bool) {
        let message = self.catalog.render(key, params);
        self.notifier.send(&message, is_error).await;
    }

    /// Open the login page, submit credentials if configured, and wait
    /// until the attendance page is reached.
    ///
    /// A failed form fill or a login that never lands on the attendance
    /// page notifies and continues (the status read will then surface
    /// the real problem); only navigation to the login page itself is
    /// fatal.
    pub async fn open(&self, page: &dyn PortalPage) -> Result<(), BrowserError> {
        info!("Navigating to login page: {}", self.config.login_url);
        if let Err(e) = page.navigate(&self.config.login_url).await {
            error!("Failed to open login page: {}", e);
            self.notify(
                MessageKey::BrowserLaunchFailed,
                &[("error", &e.to_string())],
                true,
            )
            .await;
            return Err(e);
        }

        if self.settings.has_credentials() {
            info!("Attempting automatic login");
            let filled = async {
                page.fill(&self.config.email_selector, &self.settings.portal_email)
                    .await?;
                page.fill(
                    &self.config.password_selector,
                    &self.settings.portal_password,
                )
                .await?;
                page.click(&self.config.login_button_selector).await
            }
            .await;
            match filled {
                Ok(()) => info!("Login form submitted"),
                Err(e) => {
                    error!("Automatic login attempt failed: {}", e);
                    self.notify(
                        MessageKey::AutoLoginFailed,
                        &[("error", &e.to_string())],
                        true,
                    )
                    .await;
                    info!("Waiting for manual login");
                }
            }
        } else {
            warn!("Portal credentials not configured, manual login required");
            self.notify(MessageKey::CredentialsMissing, &[], true).await;
        }

        info!(
            "Waiting for navigation to attendance page: {}",
            self.config.attendance_url_prefix
        );
        match page
            .wait_for_url_prefix(&self.config.attendance_url_prefix, LOGIN_NAV_TIMEOUT)
            .await
        {
            Ok(()) => info!("Reached the attendance page"),
            Err(e) => {
                error!("Never reached the attendance page: {}", e);
                self.notify(
                    MessageKey::NavigationTimeout,
                    &[("error", &e.to_string())],
                    true,
                )
                .await;
            }
        }
        Ok(())
    }

    /// Read the current working status badge. `None` means unreadable;
    /// the user has already been notified.
    pub async fn read_status(&self, page: &dyn PortalPage) -> Option<WorkStatus> {
        match page
            .element_text(&self.config.status_selector, STATUS_READ_TIMEOUT)
            .await
        {
            Ok(raw) => {
                let status = WorkStatus::from_portal(raw.trim());
                info!("Current working status: {}", status);
                Some(status)
            }
            Err(e) => {
                error!("Failed to read working status: {}", e);
                self.notify(
                    MessageKey::StatusReadFailed,
                    &[("error", &e.to_string())],
                    true,
                )
                .await;
                None
            }
        }
    }

    /// Press the punch button and wait for the portal's punch API call.
    ///
    /// The click and the response wait run concurrently so a fast
    /// response cannot slip past before we start listening. A missing
    /// API response is tolerated with a warning; a failed click is not.
    pub async fn toggle(&self, page: &dyn PortalPage) -> bool {
        if self.settings.test_mode {
            info!("[Test Mode] Attendance button click skipped");
            return true;
        }

        info!("Clicking the attendance button");
        let (clicked, api_response) = tokio::join!(
            page.click(&self.config.toggle_selector),
            page.wait_for_api_response(&self.config.api_url_fragment, API_RESPONSE_TIMEOUT),
        );

        if let Err(e) = clicked {
            error!("Failed to click the attendance button: {}", e);
            self.notify(
                MessageKey::ToggleClickFailed,
                &[("error", &e.to_string())],
                true,
            )
            .await;
            return false;
        }

        match api_response {
            Ok(()) => info!("Punch API response received"),
            Err(e) => warn!("Punch API response not observed: {}", e),
        }

        tokio::time::sleep(UI_SETTLE_DELAY).await;
        true
    }

    /// Check-in state machine. Already-working is success and stays
    /// silent; everything else that goes wrong notifies.
    pub async fn check_in(&self, page: &dyn PortalPage) -> bool {
        info!("Attempting check-in");
        let Some(current) = self.read_status(page).await else {
            self.notify(MessageKey::CheckInStatusUnreadable, &[], true)
                .await;
            return false;
        };

        match current {
            WorkStatus::NotCheckedIn => {
                info!("Status is {:?}, proceeding with check-in", STATUS_NOT_CHECKED_IN);
                if !self.toggle(page).await {
                    self.notify(MessageKey::CheckInClickFailed, &[], true).await;
                    return false;
                }
                let observed = self.read_status(page).await;
                if observed == Some(WorkStatus::Working) {
                    info!("Check-in successful, status changed to {:?}", STATUS_WORKING);
                    self.notify(
                        MessageKey::CheckInSuccess,
                        &[("status", STATUS_WORKING)],
                        false,
                    )
                    .await;
                    true
                } else {
                    let observed = observed.map(|s| s.to_string()).unwrap_or_default();
                    warn!(
                        "Check-in unconfirmed: observed {:?}, expected {:?}",
                        observed, STATUS_WORKING
                    );
                    self.notify(
                        MessageKey::CheckInUnconfirmed,
                        &[("observed", &observed), ("expected", STATUS_WORKING)],
                        true,
                    )
                    .await;
                    false
                }
            }
            WorkStatus::Working => {
                // Not worth a notification when the morning run merely
                // finds the user already at work.
                let status = current.to_string();
                info!(
                    "{}",
                    self.catalog
                        .render(MessageKey::CheckInAlreadyDone, &[("status", &status)])
                );
                true
            }
            other => {
                let observed = other.to_string();
                warn!(
                    "Cannot check in from status {:?} (expected {:?})",
                    observed, STATUS_NOT_CHECKED_IN
                );
                self.notify(
                    MessageKey::CheckInInvalidState,
                    &[("observed", &observed), ("expected", STATUS_NOT_CHECKED_IN)],
                    true,
                )
                .await;
                false
            }
        }
    }

    /// Check-out state machine. Both resting and not-checked-in count
    /// as a completed check-out, and already-done is notified so the
    /// evening run always reports something.
    pub async fn check_out(&self, page: &dyn PortalPage) -> bool {
        info!("Attempting check-out");
        let Some(current) = self.read_status(page).await else {
            self.notify(MessageKey::CheckOutStatusUnreadable, &[], true)
                .await;
            return false;
        };

        match current {
            WorkStatus::Working => {
                info!("Status is {:?}, proceeding with check-out", STATUS_WORKING);
                if !self.toggle(page).await {
                    self.notify(MessageKey::CheckOutClickFailed, &[], true).await;
                    return false;
                }
                let observed = self.read_status(page).await;
                match observed {
                    Some(WorkStatus::Resting) | Some(WorkStatus::NotCheckedIn) => {
                        let status = observed
                            .map(|s| s.to_string())
                            .unwrap_or_default();
                        info!("Check-out successful, status changed to {:?}", status);
                        self.notify(MessageKey::CheckOutSuccess, &[("status", &status)], false)
                            .await;
                        true
                    }
                    observed => {
                        let observed = observed.map(|s| s.to_string()).unwrap_or_default();
                        warn!(
                            "Check-out unconfirmed: observed {:?}, expected {:?} or {:?}",
                            observed, STATUS_RESTING, STATUS_NOT_CHECKED_IN
                        );
                        self.notify(
                            MessageKey::CheckOutUnconfirmed,
                            &[
                                ("observed", &observed),
                                ("expected", STATUS_RESTING),
                                ("alt", STATUS_NOT_CHECKED_IN),
                            ],
                            true,
                        )
                        .await;
                        false
                    }
                }
            }
            WorkStatus::Resting | WorkStatus::NotCheckedIn => {
                let status = current.to_string();
                info!("Already checked out (status {:?})", status);
                self.notify(MessageKey::CheckOutAlreadyDone, &[("status", &status)], false)
                    .await;
                true
            }
            other => {
                let observed = other.to_string();
                warn!(
                    "Cannot check out from status {:?} (expected {:?})",
                    observed, STATUS_WORKING
                );
                self.notify(
                    MessageKey::CheckOutInvalidState,
                    &[("observed", &observed), ("expected", STATUS_WORKING)],
                    true,
                )
                .await;
                false
            }
        }
    }
}
