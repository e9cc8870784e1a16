//! MCP server implementation
//!
//! Exposes the pull-request operations as MCP tools. Every tool funnels
//! through [`tool_response`]: operation failures become error results with a
//! `Failed to <operation>: <cause>` text rather than crashing the server.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};

use crate::api::GitHubApi;
use crate::diff::enrich_file_changes;
use crate::error::GitHubResult;
use crate::format::{
    format_comments, format_file_changes, format_pull_request, format_pull_request_list,
    AI_COMMENT_IDENTIFIER,
};
use crate::params::{
    AddPrCommentParams, AddReviewCommentParams, CreatePullRequestParams, GetPrChangesParams,
    GetPrCommentsParams, GetPullRequestDiffParams, GetPullRequestParams,
    ListOpenPullRequestsParams, RequestReviewersParams, UpdatePullRequestParams,
};
use crate::types::{NewPullRequest, NewReviewComment, PullRequestUpdate};

/// The GitHub pull request MCP server
#[derive(Clone)]
pub struct GhPrMcpServer {
    api: Arc<GitHubApi>,
    tool_router: ToolRouter<Self>,
}

/// Convert an operation outcome into a tool result.
///
/// Errors never escape as protocol-level failures; they come back to the
/// host as readable text flagged as an error.
fn tool_response(operation: &str, result: GitHubResult<String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            let message = format!("Failed to {operation}: {e}");
            tracing::error!("{message}");
            CallToolResult::error(vec![Content::text(message)])
        }
    }
}

#[tool_router]
impl GhPrMcpServer {
    pub fn new() -> Self {
        Self::with_api(GitHubApi::new())
    }

    /// Build the server around an explicitly constructed dispatcher
    pub fn with_api(api: GitHubApi) -> Self {
        Self {
            api: Arc::new(api),
            tool_router: Self::tool_router(),
        }
    }

    pub fn api(&self) -> &GitHubApi {
        &self.api
    }

    #[tool(description = "Create a new pull request in a GitHub repository")]
    async fn create_pull_request(
        &self,
        Parameters(params): Parameters<CreatePullRequestParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let pr = self
                .api
                .create_pull_request(
                    &params.owner,
                    &params.repo,
                    NewPullRequest {
                        title: params.title,
                        body: params.body,
                        head: params.head,
                        base: params.base,
                    },
                )
                .await?;
            Ok(format!(
                "Pull request created successfully!\n\nPR #{}: {}\nURL: {}",
                pr.number, pr.title, pr.html_url
            ))
        }
        .await;
        Ok(tool_response("create pull request", result))
    }

    #[tool(description = "Update the title, body, state, or base branch of a pull request")]
    async fn update_pull_request(
        &self,
        Parameters(params): Parameters<UpdatePullRequestParams>,
    ) -> Result<CallToolResult, McpError> {
        let update = PullRequestUpdate {
            title: params.title,
            body: params.body,
            state: params.state,
            base: params.base,
        };

        if update.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No fields specified for update. Please specify at least one field to update \
                 (title, body, state, or base).",
            )]));
        }

        let result = async {
            let pr = self
                .api
                .update_pull_request(&params.owner, &params.repo, params.pr_number, &update)
                .await?;
            Ok(format!(
                "Pull request #{} updated successfully!\n\nUpdated fields: {}\nTitle: {}\nURL: {}",
                pr.number,
                update.field_names().join(", "),
                pr.title,
                pr.html_url
            ))
        }
        .await;
        Ok(tool_response("update pull request", result))
    }

    #[tool(description = "List open pull requests in a GitHub repository")]
    async fn list_open_pull_requests(
        &self,
        Parameters(params): Parameters<ListOpenPullRequestsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let pull_requests = self
                .api
                .list_open_pull_requests(&params.owner, &params.repo, params.limit.unwrap_or(10))
                .await?;
            Ok(format_pull_request_list(
                &pull_requests,
                &params.owner,
                &params.repo,
            ))
        }
        .await;
        Ok(tool_response("list open pull requests", result))
    }

    #[tool(description = "Get the details of a GitHub pull request")]
    async fn get_pull_request(
        &self,
        Parameters(params): Parameters<GetPullRequestParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let pr = self
                .api
                .get_pull_request(&params.owner, &params.repo, params.pr_number)
                .await?;
            Ok(format_pull_request(&pr))
        }
        .await;
        Ok(tool_response("get pull request", result))
    }

    #[tool(description = "Get the diff for a GitHub pull request")]
    async fn get_pull_request_diff(
        &self,
        Parameters(params): Parameters<GetPullRequestDiffParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let diff = self
                .api
                .get_pull_request_diff(&params.owner, &params.repo, params.pr_number)
                .await?;

            if diff.trim().is_empty() {
                return Ok(format!("No changes found in PR #{}", params.pr_number));
            }

            let pr = self
                .api
                .get_pull_request(&params.owner, &params.repo, params.pr_number)
                .await?;
            Ok(format!(
                "Diff for PR #{}: {}\n\n```diff\n{}\n```",
                params.pr_number, pr.title, diff
            ))
        }
        .await;
        Ok(tool_response("get pull request diff", result))
    }

    #[tool(description = "Request reviewers for a GitHub pull request")]
    async fn request_reviewers(
        &self,
        Parameters(params): Parameters<RequestReviewersParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.reviewers.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No reviewers specified. Please provide at least one reviewer username.",
            )]));
        }

        let result = async {
            self.api
                .request_reviewers(
                    &params.owner,
                    &params.repo,
                    params.pr_number,
                    &params.reviewers,
                )
                .await?;
            let plural = if params.reviewers.len() > 1 { "s" } else { "" };
            Ok(format!(
                "Successfully requested {} reviewer{} for PR #{}: {}",
                params.reviewers.len(),
                plural,
                params.pr_number,
                params.reviewers.join(", ")
            ))
        }
        .await;
        Ok(tool_response("request reviewers", result))
    }

    #[tool(description = "Add a comment to a GitHub pull request")]
    async fn add_pr_comment(
        &self,
        Parameters(params): Parameters<AddPrCommentParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let body = format!("{AI_COMMENT_IDENTIFIER}{}", params.body);
            let comment = self
                .api
                .add_comment(&params.owner, &params.repo, params.pr_number, &body)
                .await?;
            Ok(format!(
                "Comment added successfully to PR #{}\nComment URL: {}",
                params.pr_number, comment.html_url
            ))
        }
        .await;
        Ok(tool_response("add PR comment", result))
    }

    #[tool(
        description = "Add a review comment to a specific diff position in a GitHub pull request"
    )]
    async fn add_review_comment(
        &self,
        Parameters(params): Parameters<AddReviewCommentParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            // The review-comment endpoint needs the head commit SHA.
            let pr = self
                .api
                .get_pull_request(&params.owner, &params.repo, params.pr_number)
                .await?;
            let commit_id = pr.head.sha.unwrap_or_default();

            let comment = self
                .api
                .add_review_comment(
                    &params.owner,
                    &params.repo,
                    params.pr_number,
                    NewReviewComment {
                        body: format!("{AI_COMMENT_IDENTIFIER}{}", params.body),
                        commit_id,
                        path: params.path.clone(),
                        position: params.position,
                    },
                )
                .await?;
            Ok(format!(
                "Review comment added successfully to PR #{}\nFile: {} (position {})\nComment URL: {}",
                params.pr_number, params.path, params.position, comment.html_url
            ))
        }
        .await;
        Ok(tool_response("add review comment to PR", result))
    }

    #[tool(description = "Get conversation and code review comments from a GitHub pull request")]
    async fn get_pr_comments(
        &self,
        Parameters(params): Parameters<GetPrCommentsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let (issue_comments, review_comments) = self
                .api
                .get_comments(&params.owner, &params.repo, params.pr_number)
                .await?;
            Ok(format_comments(
                &issue_comments,
                &review_comments,
                params.pr_number,
            ))
        }
        .await;
        Ok(tool_response("retrieve PR comments", result))
    }

    #[tool(
        description = "Get file changes from a GitHub pull request with the diff positions eligible for review comments"
    )]
    async fn get_pr_changes_for_commenting(
        &self,
        Parameters(params): Parameters<GetPrChangesParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let files = self
                .api
                .get_files(&params.owner, &params.repo, params.pr_number)
                .await?;
            let changes = enrich_file_changes(files);
            Ok(format_file_changes(&changes, params.pr_number))
        }
        .await;
        Ok(tool_response("get PR changes for commenting", result))
    }
}

impl Default for GhPrMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl rmcp::ServerHandler for GhPrMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "GitHub Pull Request MCP Server - create, list, update, and review pull \
                 requests via the GitHub REST API. Authenticates with a personal access \
                 token (GITHUB_PERSONAL_ACCESS_TOKEN) or falls back to the gh CLI."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
