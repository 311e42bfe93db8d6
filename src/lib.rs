//! Autopunch: automated attendance check-in/check-out for the Jobcan
//! web portal, for a fleet of users.
//!
//! An external cron (or an on-demand request) triggers a pass over all
//! scheduler-enabled users; for each user whose effective check-in or
//! check-out time falls within the tolerance window, a headless Chrome
//! logs in, presses the punch button, confirms the status change, and
//! reports the outcome via Telegram.

pub mod attendance;
pub mod browser;
pub mod calendar;
pub mod fleet;
pub mod messages;
pub mod notify;
pub mod schedule;
pub mod settings;
pub mod web;

use std::path::PathBuf;
use std::sync::Arc;

use browser::PageLauncher;
use fleet::FleetRunner;
use settings::SettingsStore;

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("autopunch").join("logs"))
}

/// Default path of the JSON settings file.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("autopunch").join("users.json"))
}

/// Application state shared across the web handlers.
pub struct AppState {
    /// Fleet runner (owns the launcher and HTTP client)
    pub fleet: FleetRunner,
    /// Settings store, for read-only lookups in handlers
    pub store: Arc<dyn SettingsStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn SettingsStore>, launcher: Arc<dyn PageLauncher>) -> Self {
        let client = reqwest::Client::new();
        Self {
            fleet: FleetRunner::new(store.clone(), launcher, client),
            store,
        }
    }
}

/// Initialize logging: console always, plus a daily-rolling file when a
/// log directory is available.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "autopunch.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}
