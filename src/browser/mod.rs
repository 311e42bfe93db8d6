//! Browser automation module
//!
//! Launches and controls Chrome/Chromium instances that drive the
//! attendance portal, behind a trait seam the rest of the crate tests
//! against.

mod errors;
mod page;
mod session;

pub use errors::BrowserError;
pub use page::{PageLauncher, PortalPage};
pub use session::{CdpLauncher, PortalSession, SessionConfig};
