//! Autopunch - Standalone Web Server
//!
//! Exposes the external trigger endpoints over HTTP.
//!
//! Environment variables:
//! - `AUTOPUNCH_WEB_PORT` - Server port (default: 8080)
//! - `AUTOPUNCH_WEB_USER` - Basic auth username (default: "admin")
//! - `AUTOPUNCH_WEB_PASS` - Basic auth password (auth disabled if not set)
//! - `AUTOPUNCH_SETTINGS_FILE` - Path to the users JSON file
//! - `AUTOPUNCH_CHROME_PATH` - Chrome executable (auto-detected if not set)

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use autopunch::browser::{CdpLauncher, SessionConfig};
use autopunch::settings::JsonSettingsStore;
use autopunch::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = autopunch::init_logging();

    info!("Starting Autopunch (server mode)");

    if let Some(dir) = autopunch::log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let port: u16 = std::env::var("AUTOPUNCH_WEB_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    if std::env::var("AUTOPUNCH_WEB_PASS")
        .map(|p| !p.is_empty())
        .unwrap_or(false)
    {
        let user = std::env::var("AUTOPUNCH_WEB_USER").unwrap_or_else(|_| "admin".to_string());
        info!("Basic auth enabled (user: {})", user);
    } else {
        info!("Basic auth disabled (set AUTOPUNCH_WEB_PASS to enable)");
    }

    let settings_path = match std::env::var("AUTOPUNCH_SETTINGS_FILE") {
        Ok(path) if !path.is_empty() => path.into(),
        _ => autopunch::default_settings_path()
            .context("no config directory available; set AUTOPUNCH_SETTINGS_FILE")?,
    };
    info!("User settings file: {}", settings_path.display());
    let store = Arc::new(JsonSettingsStore::new(settings_path));

    // With a display (Xvfb or real) run headed, otherwise headless.
    let has_display = std::env::var("DISPLAY")
        .map(|d| !d.is_empty())
        .unwrap_or(false);
    if !has_display {
        info!("No DISPLAY detected, browser runs headless");
    }
    let session_config = SessionConfig::default()
        .headless(!has_display)
        .chrome_path(std::env::var("AUTOPUNCH_CHROME_PATH").ok().filter(|p| !p.is_empty()));
    let launcher = Arc::new(CdpLauncher::new(session_config));

    let state = Arc::new(AppState::new(store, launcher));
    info!("Application state initialized");

    autopunch::web::start_server(state, port).await
}
