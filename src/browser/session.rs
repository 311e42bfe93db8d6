//! Browser session management
//!
//! Launches and controls one Chrome instance per attendance action. Each
//! session gets a throwaway user data directory so runs never share state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived, RequestId,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::page::{PageLauncher, PortalPage};
use super::BrowserError;

/// How often URL and element polls re-check the page.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find Chrome/Chromium executable on the system
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![std::path::PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Configuration for a browser session
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<String>,
    /// Run in headless mode
    pub headless: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl SessionConfig {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set Chrome path
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.chrome_path = path;
        self
    }
}

/// One live Chrome instance driving the portal.
pub struct PortalSession {
    /// Unique session ID (UUID, also names the user data directory)
    pub id: String,
    /// The browser instance
    browser: Arc<RwLock<Option<Browser>>>,
    /// The single page this session drives
    page: Arc<RwLock<Option<Page>>>,
    /// Whether session is alive
    alive: Arc<AtomicBool>,
    /// Throwaway profile directory, removed on close
    user_data_dir: std::path::PathBuf,
}

/// Best-effort removal of a session's profile directory. Failures are
/// logged and swallowed; an already-missing directory is fine.
async fn remove_profile_dir(session_id: &str, dir: &std::path::Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Session {} profile directory removed", session_id),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Session {} profile directory cleanup failed ({}): {}",
            session_id,
            dir.display(),
            e
        ),
    }
}

impl PortalSession {
    /// Launch a fresh Chrome with its own user data directory.
    pub async fn launch(config: &SessionConfig) -> Result<Self, BrowserError> {
        let session_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Launching browser session {} (headless: {})",
            session_id, config.headless
        );

        if config.chrome_path.is_none() && find_chrome().is_none() {
            return Err(BrowserError::LaunchFailed(
                "Chrome not found. Install Google Chrome or Chromium and retry.".to_string(),
            ));
        }

        let mut builder = BrowserConfig::builder();

        if config.headless {
            builder = builder.headless_mode(HeadlessMode::New);
        } else {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        } else if let Some(chrome_path) = find_chrome() {
            debug!("Auto-detected Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        // Throwaway profile per session, cleaned up on close
        let user_data_dir = std::env::temp_dir()
            .join("autopunch")
            .join("browser_data")
            .join(&session_id);
        std::fs::create_dir_all(&user_data_dir)?;
        builder = builder.user_data_dir(&user_data_dir);

        builder = builder
            .window_size(config.window_width, config.window_height)
            .arg("--no-default-browser-check")
            .arg("--disable-notifications")
            .arg("--disable-translate")
            // Required when running as root (e.g., in Docker or on a VPS)
            .arg("--no-sandbox");

        let browser_config = builder
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Spawn handler in background — when it ends, Chrome has disconnected
        let session_id_clone = session_id.clone();
        let alive_flag = Arc::new(AtomicBool::new(true));
        let alive_for_handler = alive_flag.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Session {} browser event error: {}", session_id_clone, e);
                }
            }
            warn!(
                "Session {} Chrome disconnected (event handler ended)",
                session_id_clone
            );
            alive_for_handler.store(false, Ordering::Relaxed);
        });

        // Chrome opens with a blank tab; take the first page and close extras
        let page = {
            let mut pages = browser
                .pages()
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

            let main_page = if !pages.is_empty() {
                pages.remove(0)
            } else {
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
            };

            for extra_page in pages {
                debug!("Closing extra blank tab");
                let _ = extra_page.close().await;
            }

            main_page
        };

        // Network events are needed to observe the portal's punch API calls
        page.execute(EnableParams::default())
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        info!("Browser session {} created", session_id);

        Ok(Self {
            id: session_id,
            browser: Arc::new(RwLock::new(Some(browser))),
            page: Arc::new(RwLock::new(Some(page))),
            alive: alive_flag,
            user_data_dir,
        })
    }

    /// Check if the session is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn page(&self) -> Result<Page, BrowserError> {
        if !self.is_alive() {
            return Err(BrowserError::ConnectionLost(
                "Chrome disconnected".into(),
            ));
        }
        self.page
            .read()
            .await
            .clone()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))
    }
}

#[async_trait]
impl PortalPage for PortalSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        debug!("Session {} navigating to: {}", self.id, url);
        page.goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let page = self.page().await?;
        page.url()
            .await
            .map_err(|e| BrowserError::ConnectionLost(e.to_string()))?
            .ok_or_else(|| BrowserError::ConnectionLost("No URL".into()))
    }

    async fn wait_for_url_prefix(
        &self,
        prefix: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let url = self.current_url().await?;
            if url.starts_with(prefix) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "URL never reached prefix {} (last: {})",
                    prefix, url
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::InputFailed(format!("{}: {}", selector, e)))?;
        element
            .type_str(value)
            .await
            .map_err(|e| BrowserError::InputFailed(format!("{}: {}", selector, e)))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::InputFailed(format!("{}: {}", selector, e)))?;
        Ok(())
    }

    async fn element_text(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, BrowserError> {
        let page = self.page().await?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(element) = page.find_element(selector).await {
                let text = element
                    .inner_text()
                    .await
                    .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?
                    .unwrap_or_default();
                return Ok(text.trim().to_string());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "Element {} did not appear",
                    selector
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_api_response(
        &self,
        url_fragment: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let page = self.page().await?;
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| BrowserError::ConnectionLost(e.to_string()))?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| BrowserError::ConnectionLost(e.to_string()))?;

        let fragment = url_fragment.to_string();
        let wait = async move {
            // Requests of interest, matched to their responses by request id
            let mut tracked: HashSet<RequestId> = HashSet::new();
            loop {
                tokio::select! {
                    req = requests.next() => {
                        let Some(req) = req else {
                            return Err(BrowserError::ConnectionLost("Event stream ended".into()));
                        };
                        let method = req.request.method.as_str();
                        if (method == "POST" || method == "PUT")
                            && req.request.url.contains(&fragment)
                        {
                            debug!("Tracking {} {}", method, req.request.url);
                            tracked.insert(req.request_id.clone());
                        }
                    }
                    resp = responses.next() => {
                        let Some(resp) = resp else {
                            return Err(BrowserError::ConnectionLost("Event stream ended".into()));
                        };
                        if tracked.contains(&resp.request_id) && resp.response.status == 200 {
                            debug!("Matched response: {}", resp.response.url);
                            return Ok(());
                        }
                    }
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!("No matching response for {}", url_fragment))
            })?
    }

    async fn close(&self) -> Result<(), BrowserError> {
        // Mark as not alive first to prevent new operations
        self.alive.store(false, Ordering::Relaxed);

        // 1. Close page first (stops navigation)
        {
            let mut page = self.page.write().await;
            if let Some(p) = page.take() {
                let _ = p.close().await;
            }
        }

        // 2. Close browser - graceful close, brief grace period, then force kill
        {
            let mut browser = self.browser.write().await;
            if let Some(mut b) = browser.take() {
                let _ = b.close().await;
                tokio::time::sleep(Duration::from_millis(500)).await;
                let _ = b.kill().await;
            }
        }

        // 3. Remove the throwaway profile once Chrome is gone, so the
        // per-action launch cycle does not pile up data directories
        remove_profile_dir(&self.id, &self.user_data_dir).await;

        info!("Browser session {} closed", self.id);
        Ok(())
    }
}

/// [`PageLauncher`] that starts a real Chrome via the DevTools protocol.
pub struct CdpLauncher {
    config: SessionConfig,
}

impl CdpLauncher {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageLauncher for CdpLauncher {
    async fn launch(&self) -> Result<Box<dyn PortalPage>, BrowserError> {
        let session = PortalSession::launch(&self.config).await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> std::path::PathBuf {
        std::env::temp_dir()
            .join("autopunch_test")
            .join(uuid::Uuid::new_v4().to_string())
    }

    #[tokio::test]
    async fn close_removes_the_profile_directory() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Preferences"), "{}").unwrap();

        remove_profile_dir("test-session", &dir).await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn profile_cleanup_tolerates_a_missing_directory() {
        let dir = scratch_dir();
        assert!(!dir.exists());
        remove_profile_dir("test-session", &dir).await;
    }

    #[tokio::test]
    async fn dead_session_rejects_operations() {
        // A session whose Chrome has disconnected must fail fast instead
        // of driving a stale page handle.
        let session = PortalSession {
            id: "dead".to_string(),
            browser: Arc::new(RwLock::new(None)),
            page: Arc::new(RwLock::new(None)),
            alive: Arc::new(AtomicBool::new(false)),
            user_data_dir: scratch_dir(),
        };
        assert!(!session.is_alive());
        let err = session.navigate("https://example.com").await.unwrap_err();
        assert!(matches!(err, BrowserError::ConnectionLost(_)));
    }
}
