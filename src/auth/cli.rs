//! gh CLI credential resolver
//!
//! Validates by probing `gh auth status` and proxies API calls through
//! `gh api`, which injects its own credentials. Subprocess access goes
//! through the [`CommandRunner`] trait so the dispatcher never depends on a
//! specific process-spawning primitive and tests can substitute a fake
//! transport.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::error::{GitHubError, GitHubResult};

use super::{base_headers, AuthClient, AuthIdentity, AuthMethod};

/// Captured result of one gh invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code (-1 when terminated by signal)
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Executes gh with the given arguments, draining both output streams
/// before the exit status is inspected.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String], stdin: Option<String>) -> GitHubResult<CommandOutput>;
}

/// The real runner: spawns `gh` from PATH
pub struct GhCommandRunner;

#[async_trait]
impl CommandRunner for GhCommandRunner {
    async fn run(&self, args: &[String], stdin: Option<String>) -> GitHubResult<CommandOutput> {
        debug!("executing: gh {}", args.join(" "));

        let mut command = Command::new("gh");
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitHubError::CliNotFound
            } else {
                GitHubError::Spawn(e)
            }
        })?;

        if let Some(input) = stdin {
            use tokio::io::AsyncWriteExt;
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).await?;
                // pipe drops here, closing gh's stdin
            }
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Map a failed gh invocation to an error, distinguishing an
/// unauthenticated session from other command failures.
fn command_error(output: &CommandOutput) -> GitHubError {
    let stderr = output.stderr.trim().to_string();
    if stderr.contains("gh auth login") || stderr.contains("not logged in") {
        return GitHubError::CliAuthFailed;
    }
    GitHubError::CliProcess {
        code: output.code,
        stderr,
    }
}

/// gh-backed credential resolver and call proxy
pub struct CliClient {
    runner: Arc<dyn CommandRunner>,
}

impl CliClient {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(GhCommandRunner))
    }

    /// Test seam: run gh invocations through a fake transport
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Proxy a JSON API call through `gh api`.
    ///
    /// The body, when present, is piped to gh's stdin via `--input -`.
    /// Returns `None` when gh produced no output (e.g. 204 responses).
    pub async fn api_request(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<&Value>,
    ) -> GitHubResult<Option<Value>> {
        let mut args = vec![
            "api".to_string(),
            endpoint.to_string(),
            "--method".to_string(),
            method.to_uppercase(),
        ];

        let stdin = match body {
            Some(value) => {
                args.push("--input".to_string());
                args.push("-".to_string());
                Some(serde_json::to_string(value)?)
            }
            None => None,
        };

        let output = self.runner.run(&args, stdin).await?;
        if !output.success() {
            return Err(command_error(&output));
        }

        if output.stdout.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&output.stdout)?))
    }

    /// Proxy a raw (non-JSON) retrieval through `gh api` with an explicit
    /// Accept header, returning stdout verbatim. Used for diff text.
    pub async fn api_raw(&self, endpoint: &str, accept: &str) -> GitHubResult<String> {
        let args = vec![
            "api".to_string(),
            endpoint.to_string(),
            "--header".to_string(),
            format!("Accept: {accept}"),
        ];

        let output = self.runner.run(&args, None).await?;
        if !output.success() {
            return Err(command_error(&output));
        }
        Ok(output.stdout)
    }

    async fn auth_status(&self) -> GitHubResult<CommandOutput> {
        self.runner
            .run(&["auth".to_string(), "status".to_string()], None)
            .await
    }
}

impl Default for CliClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthClient for CliClient {
    fn method(&self) -> AuthMethod {
        AuthMethod::Cli
    }

    fn identity(&self) -> AuthIdentity {
        AuthIdentity::Cli
    }

    async fn is_authenticated(&self) -> bool {
        match self.auth_status().await {
            Ok(output) if output.success() => {
                debug!("gh auth status passed");
                true
            }
            Ok(output) => {
                debug!(stderr = %output.stderr.trim(), "gh reports unauthenticated");
                false
            }
            Err(e) => {
                debug!(error = %e, "gh auth status failed to run");
                false
            }
        }
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        // gh injects its own Authorization header
        base_headers()
    }

    async fn user_login(&self) -> GitHubResult<String> {
        let value = self
            .api_request("GET", "/user", None)
            .await?
            .unwrap_or(Value::Null);
        let user: UserResponse = serde_json::from_value(value)?;
        Ok(user.login)
    }

    fn as_cli(&self) -> Option<&CliClient> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Records invocations and plays back a scripted output
    struct ScriptedRunner {
        calls: Mutex<Vec<(Vec<String>, Option<String>)>>,
        output: CommandOutput,
    }

    impl ScriptedRunner {
        fn new(output: CommandOutput) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                output,
            })
        }

        fn ok(stdout: &str) -> Arc<Self> {
            Self::new(CommandOutput {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            })
        }

        fn failing(code: i32, stderr: &str) -> Arc<Self> {
            Self::new(CommandOutput {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            args: &[String],
            stdin: Option<String>,
        ) -> GitHubResult<CommandOutput> {
            self.calls.lock().await.push((args.to_vec(), stdin));
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn api_request_pipes_body_as_stdin_json() {
        let runner = ScriptedRunner::ok(r#"{"id": 1}"#);
        let client = CliClient::with_runner(runner.clone());

        let body = serde_json::json!({"title": "hello"});
        let result = client
            .api_request("post", "/repos/o/r/pulls", Some(&body))
            .await
            .unwrap();
        assert_eq!(result.unwrap()["id"], 1);

        let calls = runner.calls.lock().await;
        let (args, stdin) = &calls[0];
        assert_eq!(
            args,
            &vec![
                "api".to_string(),
                "/repos/o/r/pulls".to_string(),
                "--method".to_string(),
                "POST".to_string(),
                "--input".to_string(),
                "-".to_string(),
            ]
        );
        let sent: Value = serde_json::from_str(stdin.as_deref().unwrap()).unwrap();
        assert_eq!(sent["title"], "hello");
    }

    #[tokio::test]
    async fn api_request_without_body_skips_input_flag() {
        let runner = ScriptedRunner::ok("[]");
        let client = CliClient::with_runner(runner.clone());

        client.api_request("GET", "/user", None).await.unwrap();

        let calls = runner.calls.lock().await;
        let (args, stdin) = &calls[0];
        assert!(!args.contains(&"--input".to_string()));
        assert!(stdin.is_none());
    }

    #[tokio::test]
    async fn api_request_empty_stdout_is_no_payload() {
        let runner = ScriptedRunner::ok("");
        let client = CliClient::with_runner(runner);
        let result = client.api_request("DELETE", "/x", None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn api_request_nonzero_exit_carries_stderr() {
        let runner = ScriptedRunner::failing(1, "gh: Not Found (HTTP 404)\n");
        let client = CliClient::with_runner(runner);

        let err = client.api_request("GET", "/missing", None).await.unwrap_err();
        match err {
            GitHubError::CliProcess { code, stderr } => {
                assert_eq!(code, 1);
                assert_eq!(stderr, "gh: Not Found (HTTP 404)");
            }
            other => panic!("expected CliProcess, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_raw_sets_explicit_accept_header() {
        let runner = ScriptedRunner::ok("diff --git a/x b/x\n");
        let client = CliClient::with_runner(runner.clone());

        let text = client
            .api_raw("/repos/o/r/pulls/1", "application/vnd.github.v3.diff")
            .await
            .unwrap();
        assert!(text.starts_with("diff --git"));

        let calls = runner.calls.lock().await;
        let (args, _) = &calls[0];
        assert!(args.contains(&"--header".to_string()));
        assert!(args.contains(&"Accept: application/vnd.github.v3.diff".to_string()));
        // Raw retrieval must not force a method flag.
        assert!(!args.contains(&"--method".to_string()));
    }

    #[tokio::test]
    async fn auth_required_stderr_maps_to_cli_auth_failed() {
        let runner = ScriptedRunner::failing(
            4,
            "To get started with GitHub CLI, please run: gh auth login",
        );
        let client = CliClient::with_runner(runner);

        let err = client.api_request("GET", "/user", None).await.unwrap_err();
        assert!(matches!(err, GitHubError::CliAuthFailed), "{err:?}");
    }

    #[tokio::test]
    async fn user_login_reads_the_login_field() {
        let runner = ScriptedRunner::ok(r#"{"login":"octocat","id":1}"#);
        let client = CliClient::with_runner(runner);
        assert_eq!(client.user_login().await.unwrap(), "octocat");
    }

    #[tokio::test]
    async fn user_login_with_malformed_payload_is_a_parse_error() {
        // Well-formed JSON, but not the user shape: this is a payload
        // problem, not an authentication one.
        let runner = ScriptedRunner::ok(r#"{"id": 1}"#);
        let client = CliClient::with_runner(runner);

        let err = client.user_login().await.unwrap_err();
        assert!(matches!(err, GitHubError::Json(_)), "{err:?}");
    }

    #[tokio::test]
    async fn self_check_follows_exit_code() {
        let ok = CliClient::with_runner(ScriptedRunner::ok("Logged in to github.com"));
        assert!(ok.is_authenticated().await);

        let bad = CliClient::with_runner(ScriptedRunner::failing(1, "not logged in"));
        assert!(!bad.is_authenticated().await);
    }
}
