//! Personal access token credential resolver
//!
//! Validates by issuing a minimal authenticated identity lookup against
//! `GET /user` and carries the bearer token in its request headers.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::api::API_BASE_URL;
use crate::error::{GitHubError, GitHubResult};

use super::{base_headers, AuthClient, AuthIdentity, AuthMethod};

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Token-backed credential resolver
pub struct TokenClient {
    token: String,
    http: reqwest::Client,
}

impl TokenClient {
    pub fn new(token: String, http: reqwest::Client) -> Self {
        Self { token, http }
    }

    async fn fetch_user(&self) -> GitHubResult<UserResponse> {
        let mut request = self.http.get(format!("{API_BASE_URL}/user"));
        for (name, value) in self.auth_headers() {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::InvalidToken {
                status: status.as_u16(),
            });
        }

        let user: UserResponse = response.json().await?;
        Ok(user)
    }
}

#[async_trait]
impl AuthClient for TokenClient {
    fn method(&self) -> AuthMethod {
        AuthMethod::Token
    }

    fn identity(&self) -> AuthIdentity {
        AuthIdentity::Token(self.token.clone())
    }

    async fn is_authenticated(&self) -> bool {
        match self.fetch_user().await {
            Ok(user) => {
                debug!(user = %user.login, "token self-check passed");
                true
            }
            Err(e) => {
                debug!(error = %e, "token self-check failed");
                false
            }
        }
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        let mut headers = base_headers();
        headers.push(("Authorization".to_string(), format!("Bearer {}", self.token)));
        headers
    }

    async fn user_login(&self) -> GitHubResult<String> {
        let user = self.fetch_user().await?;
        Ok(user.login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_headers_carry_bearer_token() {
        let client = TokenClient::new("secret123".to_string(), reqwest::Client::new());
        let headers = client.auth_headers();

        let auth = headers
            .iter()
            .find(|(name, _)| name == "Authorization")
            .map(|(_, value)| value.as_str());
        assert_eq!(auth, Some("Bearer secret123"));

        for expected in ["Accept", "Content-Type", "User-Agent", "X-GitHub-Api-Version"] {
            assert!(
                headers.iter().any(|(name, _)| name == expected),
                "missing header {expected}"
            );
        }
    }

    #[test]
    fn identity_carries_the_secret() {
        let client = TokenClient::new("secret123".to_string(), reqwest::Client::new());
        match client.identity() {
            AuthIdentity::Token(secret) => assert_eq!(secret, "secret123"),
            other => panic!("expected token identity, got {other:?}"),
        }
    }
}
