//! GitHub authentication
//!
//! This module resolves exactly one credential path per process and holds it
//! for the lifetime of the server. Resolution order is fixed: a personal
//! access token from `GITHUB_PERSONAL_ACCESS_TOKEN` wins when its self-check
//! passes, otherwise the gh CLI is probed via `gh auth status`. If neither
//! path is usable, resolution fails naming both attempts.
//!
//! The selector is constructed explicitly and threaded through the API layer
//! rather than living in a global; tests inject their own resolver
//! candidates through [`GitHubAuth::with_candidates`].

pub mod cli;
pub mod token;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GitHubError, GitHubResult};

pub use cli::{CliClient, CommandOutput, CommandRunner, GhCommandRunner};
pub use token::TokenClient;

/// Environment variable holding the personal access token
pub const TOKEN_ENV: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// User agent sent on every request, both transports
pub const USER_AGENT: &str = "gh-pr-mcp/0.1";

/// GitHub REST API version header value
pub const API_VERSION: &str = "2022-11-28";

/// Which credential path is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Personal access token over direct HTTPS
    Token,
    /// Authenticated gh CLI subprocess
    Cli,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Token => "token",
            AuthMethod::Cli => "cli",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved identity, immutable once held
#[derive(Debug, Clone)]
pub enum AuthIdentity {
    /// Bearer token secret
    Token(String),
    /// The gh CLI injects its own credentials
    Cli,
}

impl AuthIdentity {
    pub fn method(&self) -> AuthMethod {
        match self {
            AuthIdentity::Token(_) => AuthMethod::Token,
            AuthIdentity::Cli => AuthMethod::Cli,
        }
    }
}

/// The fixed non-authorization headers shared by both transports
pub(crate) fn base_headers() -> Vec<(String, String)> {
    vec![
        ("Accept".to_string(), "application/vnd.github.v3+json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("X-GitHub-Api-Version".to_string(), API_VERSION.to_string()),
    ]
}

/// One credential path: can prove itself, produce request headers, and look
/// up the authenticated user.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Which credential path this client implements
    fn method(&self) -> AuthMethod;

    /// The identity this client would hold once resolved
    fn identity(&self) -> AuthIdentity;

    /// Self-check: are the held credentials currently valid? Never errors;
    /// a failed probe simply returns false.
    async fn is_authenticated(&self) -> bool;

    /// Request headers for direct HTTP calls through this identity
    fn auth_headers(&self) -> Vec<(String, String)>;

    /// Login name of the authenticated user
    async fn user_login(&self) -> GitHubResult<String>;

    /// Narrow capability probe for the CLI-only proxy operations. Only the
    /// gh-backed client returns `Some`.
    fn as_cli(&self) -> Option<&CliClient> {
        None
    }
}

/// Policy knobs for the auth selector
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    /// Re-run the held identity's self-check on every dispatcher call and
    /// re-resolve when it fails. Off by default: once resolved, the identity
    /// is trusted for the rest of the process.
    pub revalidate_per_request: bool,
}

struct Resolved {
    identity: AuthIdentity,
    client: Arc<dyn AuthClient>,
}

enum CandidateSource {
    /// Build candidates from the environment: token first (when set), then gh
    Environment { http: reqwest::Client },
    /// Fixed candidate list, used by tests
    Fixed(Vec<Arc<dyn AuthClient>>),
}

/// Process-wide auth selector: resolves one identity lazily and caches it.
///
/// Resolution is guarded by a mutex held for the whole attempt, so
/// concurrent first callers share a single in-flight resolution instead of
/// spawning duplicate validation calls or subprocesses.
pub struct GitHubAuth {
    state: Mutex<Option<Resolved>>,
    source: CandidateSource,
    policy: AuthPolicy,
}

impl GitHubAuth {
    /// Selector resolving from the environment, sharing the given HTTP client
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_policy(http, AuthPolicy::default())
    }

    pub fn with_policy(http: reqwest::Client, policy: AuthPolicy) -> Self {
        Self {
            state: Mutex::new(None),
            source: CandidateSource::Environment { http },
            policy,
        }
    }

    /// Selector over a fixed, ordered candidate list (test seam)
    pub fn with_candidates(candidates: Vec<Arc<dyn AuthClient>>) -> Self {
        Self::with_candidates_and_policy(candidates, AuthPolicy::default())
    }

    pub fn with_candidates_and_policy(
        candidates: Vec<Arc<dyn AuthClient>>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            state: Mutex::new(None),
            source: CandidateSource::Fixed(candidates),
            policy,
        }
    }

    /// Idempotent: resolves an identity if none is held, otherwise returns
    /// immediately (unless `revalidate_per_request` is set and the held
    /// identity fails its self-check, in which case it is dropped and
    /// resolution runs again).
    pub async fn ensure_authenticated(&self) -> GitHubResult<()> {
        let mut state = self.state.lock().await;

        if let Some(resolved) = state.as_ref() {
            if !self.policy.revalidate_per_request {
                return Ok(());
            }
            if resolved.client.is_authenticated().await {
                return Ok(());
            }
            warn!(
                method = %resolved.identity.method(),
                "held identity failed its self-check, re-resolving"
            );
            *state = None;
        }

        let resolved = self.resolve().await?;
        info!(method = %resolved.identity.method(), "GitHub authentication resolved");
        *state = Some(resolved);
        Ok(())
    }

    /// Non-throwing probe: false when no identity is held, otherwise the
    /// held identity's self-check result.
    pub async fn is_authenticated(&self) -> bool {
        let client = {
            let state = self.state.lock().await;
            match state.as_ref() {
                Some(resolved) => Arc::clone(&resolved.client),
                None => return false,
            }
        };
        client.is_authenticated().await
    }

    /// The active credential path, or `NotInitialized` before resolution
    pub async fn method(&self) -> GitHubResult<AuthMethod> {
        Ok(self.identity().await?.method())
    }

    /// The resolved identity, or `NotInitialized` before resolution
    pub async fn identity(&self) -> GitHubResult<AuthIdentity> {
        let state = self.state.lock().await;
        state
            .as_ref()
            .map(|r| r.identity.clone())
            .ok_or(GitHubError::NotInitialized)
    }

    /// The concrete resolver instance, or `NotInitialized` before resolution
    pub async fn client(&self) -> GitHubResult<Arc<dyn AuthClient>> {
        let state = self.state.lock().await;
        state
            .as_ref()
            .map(|r| Arc::clone(&r.client))
            .ok_or(GitHubError::NotInitialized)
    }

    /// Login of the authenticated user via the held identity
    pub async fn user_login(&self) -> GitHubResult<String> {
        let client = self.client().await?;
        client.user_login().await
    }

    async fn resolve(&self) -> GitHubResult<Resolved> {
        let (candidates, mut attempted) = self.candidates();

        for client in candidates {
            let method = client.method();
            debug!(%method, "trying credential path");
            if client.is_authenticated().await {
                return Ok(Resolved {
                    identity: client.identity(),
                    client,
                });
            }
            warn!(%method, "credential path failed self-check");
            attempted.push(match method {
                AuthMethod::Token => "token auth failed self-check".to_string(),
                AuthMethod::Cli => "gh CLI auth failed self-check".to_string(),
            });
        }

        Err(GitHubError::AuthenticationUnavailable {
            attempted: attempted.join("; "),
        })
    }

    fn candidates(&self) -> (Vec<Arc<dyn AuthClient>>, Vec<String>) {
        match &self.source {
            CandidateSource::Environment { http } => {
                let mut candidates: Vec<Arc<dyn AuthClient>> = Vec::new();
                let mut skipped = Vec::new();
                match std::env::var(TOKEN_ENV) {
                    Ok(token) if !token.is_empty() => {
                        candidates.push(Arc::new(TokenClient::new(token, http.clone())));
                    }
                    _ => skipped.push(format!("token auth skipped ({TOKEN_ENV} not set)")),
                }
                candidates.push(Arc::new(CliClient::new()));
                (candidates, skipped)
            }
            CandidateSource::Fixed(list) => (list.clone(), Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted resolver for exercising selector precedence
    struct FakeClient {
        method: AuthMethod,
        authenticated: bool,
        checks: AtomicUsize,
    }

    impl FakeClient {
        fn new(method: AuthMethod, authenticated: bool) -> Self {
            Self {
                method,
                authenticated,
                checks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthClient for FakeClient {
        fn method(&self) -> AuthMethod {
            self.method
        }

        fn identity(&self) -> AuthIdentity {
            match self.method {
                AuthMethod::Token => AuthIdentity::Token("fake-token".to_string()),
                AuthMethod::Cli => AuthIdentity::Cli,
            }
        }

        async fn is_authenticated(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.authenticated
        }

        fn auth_headers(&self) -> Vec<(String, String)> {
            base_headers()
        }

        async fn user_login(&self) -> GitHubResult<String> {
            Ok("octocat".to_string())
        }
    }

    #[tokio::test]
    async fn accessors_fail_before_resolution() {
        let auth = GitHubAuth::with_candidates(vec![]);
        assert!(matches!(
            auth.method().await,
            Err(GitHubError::NotInitialized)
        ));
        assert!(matches!(
            auth.client().await.map(|_| ()),
            Err(GitHubError::NotInitialized)
        ));
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn token_wins_when_valid() {
        let auth = GitHubAuth::with_candidates(vec![
            Arc::new(FakeClient::new(AuthMethod::Token, true)),
            Arc::new(FakeClient::new(AuthMethod::Cli, true)),
        ]);
        auth.ensure_authenticated().await.unwrap();
        assert_eq!(auth.method().await.unwrap(), AuthMethod::Token);
    }

    #[tokio::test]
    async fn falls_back_to_cli_when_token_self_check_fails() {
        let auth = GitHubAuth::with_candidates(vec![
            Arc::new(FakeClient::new(AuthMethod::Token, false)),
            Arc::new(FakeClient::new(AuthMethod::Cli, true)),
        ]);
        auth.ensure_authenticated().await.unwrap();
        assert_eq!(auth.method().await.unwrap(), AuthMethod::Cli);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let token = Arc::new(FakeClient::new(AuthMethod::Token, true));
        let auth = GitHubAuth::with_candidates(vec![token.clone()]);

        auth.ensure_authenticated().await.unwrap();
        auth.ensure_authenticated().await.unwrap();

        assert_eq!(auth.method().await.unwrap(), AuthMethod::Token);
        // Default policy trusts the held identity: exactly one self-check.
        assert_eq!(token.checks.load(Ordering::SeqCst), 1);
    }

    /// Passes its first self-check, then reports invalid credentials
    struct ExpiringClient {
        checks: AtomicUsize,
    }

    #[async_trait]
    impl AuthClient for ExpiringClient {
        fn method(&self) -> AuthMethod {
            AuthMethod::Token
        }

        fn identity(&self) -> AuthIdentity {
            AuthIdentity::Token("expiring".to_string())
        }

        async fn is_authenticated(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst) == 0
        }

        fn auth_headers(&self) -> Vec<(String, String)> {
            base_headers()
        }

        async fn user_login(&self) -> GitHubResult<String> {
            Ok("octocat".to_string())
        }
    }

    #[tokio::test]
    async fn revalidation_policy_drops_failing_identity_and_re_resolves() {
        let expiring = Arc::new(ExpiringClient {
            checks: AtomicUsize::new(0),
        });
        let auth = GitHubAuth::with_candidates_and_policy(
            vec![
                expiring.clone(),
                Arc::new(FakeClient::new(AuthMethod::Cli, true)),
            ],
            AuthPolicy {
                revalidate_per_request: true,
            },
        );

        auth.ensure_authenticated().await.unwrap();
        assert_eq!(auth.method().await.unwrap(), AuthMethod::Token);

        // The held token identity now fails its per-request self-check: it
        // is dropped and resolution falls through to the CLI candidate.
        auth.ensure_authenticated().await.unwrap();
        assert_eq!(auth.method().await.unwrap(), AuthMethod::Cli);

        // One check at first resolution, one failed revalidation, one failed
        // retry during the second resolution pass.
        assert_eq!(expiring.checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fails_naming_both_paths_when_nothing_works() {
        let auth = GitHubAuth::with_candidates(vec![
            Arc::new(FakeClient::new(AuthMethod::Token, false)),
            Arc::new(FakeClient::new(AuthMethod::Cli, false)),
        ]);
        let err = auth.ensure_authenticated().await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("token auth failed self-check"), "{text}");
        assert!(text.contains("gh CLI auth failed self-check"), "{text}");
        // A failed attempt leaves no identity behind.
        assert!(matches!(
            auth.method().await,
            Err(GitHubError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn failed_resolution_does_not_poison_later_attempts() {
        // A selector with no candidates fails, but a later call re-resolves.
        let auth = GitHubAuth::with_candidates(vec![]);
        assert!(auth.ensure_authenticated().await.is_err());
        assert!(auth.ensure_authenticated().await.is_err());
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn concurrent_first_use_resolves_once() {
        let token = Arc::new(FakeClient::new(AuthMethod::Token, true));
        let auth = Arc::new(GitHubAuth::with_candidates(vec![token.clone()]));

        let a = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.ensure_authenticated().await })
        };
        let b = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.ensure_authenticated().await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(token.checks.load(Ordering::SeqCst), 1);
    }
}
