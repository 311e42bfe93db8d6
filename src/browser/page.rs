//! Page-level abstraction over the driven browser.
//!
//! Attendance logic talks to these traits only, so tests can substitute a
//! scripted page and the real Chrome session stays behind one seam.

use std::time::Duration;

use async_trait::async_trait;

use super::BrowserError;

/// One open portal tab.
#[async_trait]
pub trait PortalPage: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Current page URL.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Block until the page URL starts with `prefix`, or time out.
    async fn wait_for_url_prefix(
        &self,
        prefix: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Click an element and type text into it.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Click an element.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Inner text of an element, waiting up to `timeout` for it to appear.
    async fn element_text(&self, selector: &str, timeout: Duration)
        -> Result<String, BrowserError>;

    /// Wait for a POST/PUT request whose URL contains `url_fragment` to
    /// complete with HTTP 200.
    async fn wait_for_api_response(
        &self,
        url_fragment: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Tear the page and its browser down.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Factory for fresh portal pages. Each attendance action gets its own
/// isolated browser, launched through this seam.
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PortalPage>, BrowserError>;
}
