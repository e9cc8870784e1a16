//! Error types for GitHub authentication and API operations
//!
//! This module defines the failure taxonomy shared by the credential
//! resolvers, the request dispatcher, and the tool layer. Authentication
//! path failures (`InvalidToken`, `CliAuthFailed`) are recovered locally by
//! falling back to the next credential path; everything else propagates to
//! the tool boundary where it is rendered as a non-crashing error result.

use thiserror::Error;

/// Errors that can occur when talking to GitHub
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Neither the token path nor the gh CLI path produced a usable identity
    #[error(
        "no valid GitHub authentication found ({attempted}) - \
         set GITHUB_PERSONAL_ACCESS_TOKEN or run 'gh auth login'"
    )]
    AuthenticationUnavailable {
        /// Summary of every credential path that was tried and why it failed
        attempted: String,
    },

    /// Identity was accessed before resolution completed
    #[error("GitHub authentication not initialized - call ensure_authenticated() first")]
    NotInitialized,

    /// The personal access token failed its identity-lookup self-check
    #[error("personal access token rejected by GitHub (status {status})")]
    InvalidToken {
        /// HTTP status returned by the identity-lookup call
        status: u16,
    },

    /// The gh CLI self-check reported an unauthenticated session
    #[error("gh CLI is not authenticated - run 'gh auth login' first")]
    CliAuthFailed,

    /// GitHub returned a non-success status code
    #[error("GitHub API error (status {status}): {message}")]
    Api {
        /// HTTP-equivalent status code
        status: u16,
        /// Human-readable message extracted from the response
        message: String,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// The gh process exited with a non-zero code
    #[error("gh command failed (exit code {code}): {stderr}")]
    CliProcess {
        /// Exit code from the gh process
        code: i32,
        /// Captured standard error output
        stderr: String,
    },

    /// gh CLI is not installed or not in PATH
    #[error("gh CLI not found - ensure gh is installed and in PATH")]
    CliNotFound,

    /// Failed to spawn the gh process
    #[error("failed to spawn gh process: {0}")]
    Spawn(#[from] std::io::Error),

    /// Transport-level HTTP failure (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed as the expected JSON shape
    #[error("failed to parse GitHub response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for GitHub operations
pub type GitHubResult<T> = Result<T, GitHubError>;

impl GitHubError {
    /// Build an [`GitHubError::Api`] from a status code and raw body.
    ///
    /// When the body is a JSON object with a `message` field (GitHub's usual
    /// error shape), that field becomes the message; otherwise the raw body
    /// is used verbatim.
    pub fn api(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .unwrap_or_else(|| body.clone());
        GitHubError::Api {
            status,
            message,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_extracts_message_field() {
        let err = GitHubError::api(404, r#"{"message":"Not Found"}"#.to_string());
        match &err {
            GitHubError::Api {
                status,
                message,
                body,
            } => {
                assert_eq!(*status, 404);
                assert_eq!(message, "Not Found");
                assert!(body.contains("Not Found"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(err.to_string().contains("Not Found"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn api_error_keeps_plain_text_body() {
        let err = GitHubError::api(502, "bad gateway".to_string());
        match err {
            GitHubError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn authentication_unavailable_names_both_paths() {
        let err = GitHubError::AuthenticationUnavailable {
            attempted: "token auth failed self-check; gh CLI auth failed self-check".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("token auth"));
        assert!(text.contains("gh CLI auth"));
    }
}
