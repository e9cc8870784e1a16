//! GitHub API dispatcher
//!
//! One logical "make an authenticated GitHub API call" operation that routes
//! through whichever transport the auth selector resolved: direct HTTPS with
//! a bearer token, or a `gh api` subprocess. Both paths normalize into the
//! same result shape, so the domain operations below never know which
//! transport served them.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::auth::{AuthClient, CliClient, GitHubAuth, USER_AGENT};
use crate::error::{GitHubError, GitHubResult};
use crate::types::{
    IssueComment, NewPullRequest, NewReviewComment, PullRequest, PullRequestFile,
    PullRequestUpdate, ReviewComment,
};

/// Canonical API host
pub const API_BASE_URL: &str = "https://api.github.com";

/// Media type requesting the diff rendering of a pull request
pub const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Per-call request description
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method; defaults to GET
    pub method: reqwest::Method,

    /// Caller-supplied header overrides, merged after the auth headers
    pub headers: Vec<(String, String)>,

    /// JSON body, serialized for HTTP or piped to gh's stdin
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn post(body: Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn patch(body: Value) -> Self {
        Self {
            method: reqwest::Method::PATCH,
            body: Some(body),
            ..Default::default()
        }
    }
}

/// The request dispatcher plus the domain operations built on it
pub struct GitHubApi {
    auth: GitHubAuth,
    http: reqwest::Client,
}

impl GitHubApi {
    /// Dispatcher resolving credentials from the environment
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");
        let auth = GitHubAuth::new(http.clone());
        Self { auth, http }
    }

    /// Dispatcher over an explicitly constructed auth selector (test seam)
    pub fn with_auth(auth: GitHubAuth) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");
        Self { auth, http }
    }

    pub fn auth(&self) -> &GitHubAuth {
        &self.auth
    }

    /// Execute a logical API call through the active transport.
    ///
    /// Non-2xx responses always surface as [`GitHubError::Api`]; a success
    /// value is never returned for them. JSON responses parse to a value,
    /// anything else comes back as a JSON string.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> GitHubResult<Value> {
        self.auth.ensure_authenticated().await?;
        let client = self.auth.client().await?;

        match client.as_cli() {
            Some(cli) => self.request_via_cli(cli, endpoint, &options).await,
            None => self.request_via_http(client.as_ref(), endpoint, &options).await,
        }
    }

    /// Typed wrapper over [`GitHubApi::request`]
    async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> GitHubResult<T> {
        let value = self.request(endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn request_via_cli(
        &self,
        cli: &CliClient,
        endpoint: &str,
        options: &RequestOptions,
    ) -> GitHubResult<Value> {
        // gh api takes paths, not absolute URLs
        let endpoint = endpoint.strip_prefix(API_BASE_URL).unwrap_or(endpoint);
        debug!("API request (cli): {} {}", options.method, endpoint);

        let result = cli
            .api_request(options.method.as_str(), endpoint, options.body.as_ref())
            .await;
        match result {
            Ok(value) => Ok(value.unwrap_or(Value::Null)),
            Err(e) => {
                error!(error = %e, "gh API request failed");
                Err(e)
            }
        }
    }

    async fn request_via_http(
        &self,
        client: &dyn AuthClient,
        endpoint: &str,
        options: &RequestOptions,
    ) -> GitHubResult<Value> {
        let url = if endpoint.starts_with("http") {
            endpoint.to_string()
        } else {
            format!("{API_BASE_URL}{endpoint}")
        };
        debug!("API request (http): {} {}", options.method, url);

        // Caller overrides replace auth headers of the same name (e.g. the
        // diff media type replacing the default Accept).
        let mut headers = client.auth_headers();
        for (name, value) in &options.headers {
            match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((name.clone(), value.clone())),
            }
        }

        let mut request = self.http.request(options.method.clone(), &url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.body(serde_json::to_string(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GitHubError::api(status.as_u16(), text));
        }

        if content_type.contains("application/json") {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_str(&text)?)
        } else {
            Ok(Value::String(text))
        }
    }

    // ------------------------------------------------------------------
    // Domain operations
    // ------------------------------------------------------------------

    /// Create a pull request
    pub async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        data: NewPullRequest,
    ) -> GitHubResult<PullRequest> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/pulls"),
            RequestOptions::post(serde_json::to_value(data)?),
        )
        .await
    }

    /// Update the given fields of a pull request
    pub async fn update_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        data: &PullRequestUpdate,
    ) -> GitHubResult<PullRequest> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/pulls/{pr_number}"),
            RequestOptions::patch(serde_json::to_value(data)?),
        )
        .await
    }

    /// One page of open pull requests
    pub async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> GitHubResult<Vec<PullRequest>> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/pulls?state=open&per_page={per_page}"),
            RequestOptions::default(),
        )
        .await
    }

    /// A single pull request's details
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> GitHubResult<PullRequest> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/pulls/{pr_number}"),
            RequestOptions::default(),
        )
        .await
    }

    /// The unified diff of a pull request.
    ///
    /// This needs the alternate diff representation rather than the default
    /// JSON one: the HTTP path overrides Accept, the CLI path passes the
    /// media type as an explicit request header.
    pub async fn get_pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> GitHubResult<String> {
        self.auth.ensure_authenticated().await?;
        let client = self.auth.client().await?;
        let endpoint = format!("/repos/{owner}/{repo}/pulls/{pr_number}");

        if let Some(cli) = client.as_cli() {
            return cli.api_raw(&endpoint, DIFF_MEDIA_TYPE).await;
        }

        let options = RequestOptions {
            headers: vec![("Accept".to_string(), DIFF_MEDIA_TYPE.to_string())],
            ..Default::default()
        };
        match self
            .request_via_http(client.as_ref(), &endpoint, &options)
            .await?
        {
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    /// Request reviews from the given users
    pub async fn request_reviewers(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        reviewers: &[String],
    ) -> GitHubResult<Value> {
        self.request(
            &format!("/repos/{owner}/{repo}/pulls/{pr_number}/requested_reviewers"),
            RequestOptions::post(serde_json::json!({ "reviewers": reviewers })),
        )
        .await
    }

    /// Add a conversation comment (issue comment endpoint)
    pub async fn add_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> GitHubResult<IssueComment> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/issues/{pr_number}/comments"),
            RequestOptions::post(serde_json::json!({ "body": body })),
        )
        .await
    }

    /// Add a review comment anchored to a diff position
    pub async fn add_review_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        data: NewReviewComment,
    ) -> GitHubResult<ReviewComment> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/pulls/{pr_number}/comments"),
            RequestOptions::post(serde_json::to_value(data)?),
        )
        .await
    }

    /// Both comment collections of a pull request.
    ///
    /// The two endpoints are independent and read-only, so they are fetched
    /// concurrently; results are combined only after both complete.
    pub async fn get_comments(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> GitHubResult<(Vec<IssueComment>, Vec<ReviewComment>)> {
        let issue_endpoint = format!("/repos/{owner}/{repo}/issues/{pr_number}/comments");
        let review_endpoint = format!("/repos/{owner}/{repo}/pulls/{pr_number}/comments");

        let (issue_comments, review_comments) = tokio::try_join!(
            self.request_json::<Vec<IssueComment>>(&issue_endpoint, RequestOptions::default()),
            self.request_json::<Vec<ReviewComment>>(&review_endpoint, RequestOptions::default()),
        )?;

        Ok((issue_comments, review_comments))
    }

    /// The changed files of a pull request
    pub async fn get_files(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> GitHubResult<Vec<PullRequestFile>> {
        self.request_json(
            &format!("/repos/{owner}/{repo}/pulls/{pr_number}/files"),
            RequestOptions::default(),
        )
        .await
    }
}

impl Default for GitHubApi {
    fn default() -> Self {
        Self::new()
    }
}
