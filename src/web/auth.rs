//! Basic authentication middleware for the web server.
//!
//! Reads credentials from environment variables:
//! - `AUTOPUNCH_WEB_USER` (default: "admin")
//! - `AUTOPUNCH_WEB_PASS` (required for auth to be enabled)

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use base64::Engine;
use tracing::warn;

/// Basic auth middleware.
///
/// If `AUTOPUNCH_WEB_PASS` is not set, authentication is disabled (open
/// access). When enabled, all requests must include a valid
/// `Authorization: Basic ...` header.
pub async fn basic_auth_middleware(request: Request, next: Next) -> Result<Response, StatusCode> {
    let expected_pass = match std::env::var("AUTOPUNCH_WEB_PASS") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            // No password configured, skip auth
            return Ok(next.run(request).await);
        }
    };

    let expected_user =
        std::env::var("AUTOPUNCH_WEB_USER").unwrap_or_else(|_| "admin".to_string());

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let Some(auth_header) = auth_header else {
        warn!("[Auth] Missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if credentials_match(auth_header, &expected_user, &expected_pass) {
        Ok(next.run(request).await)
    } else {
        warn!("[Auth] Invalid credentials");
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Check an `Authorization` header value against the expected
/// `username:password` pair.
fn credentials_match(auth_header: &str, expected_user: &str, expected_pass: &str) -> bool {
    let Some(encoded) = auth_header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };

    let mut parts = credentials.splitn(2, ':');
    let username = parts.next().unwrap_or("");
    let password = parts.next().unwrap_or("");
    username == expected_user && password == expected_pass
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(user: &str, pass: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        format!("Basic {encoded}")
    }

    #[test]
    fn accepts_matching_credentials() {
        assert!(credentials_match(&header("admin", "s3cret"), "admin", "s3cret"));
    }

    #[test]
    fn rejects_wrong_password_or_scheme() {
        assert!(!credentials_match(&header("admin", "nope"), "admin", "s3cret"));
        assert!(!credentials_match("Bearer abc", "admin", "s3cret"));
        assert!(!credentials_match("Basic not-base64!!", "admin", "s3cret"));
    }
}
