//! Tool parameter types

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreatePullRequestParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request title")]
    pub title: String,
    #[schemars(description = "Pull request description")]
    pub body: String,
    #[schemars(description = "Name of the branch where your changes are implemented")]
    pub head: String,
    #[schemars(description = "Name of the branch you want the changes pulled into")]
    pub base: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdatePullRequestParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
    #[schemars(description = "New pull request title")]
    pub title: Option<String>,
    #[schemars(description = "New pull request description")]
    pub body: Option<String>,
    #[schemars(description = "New state (open or closed)")]
    pub state: Option<String>,
    #[schemars(description = "New base branch")]
    pub base: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListOpenPullRequestsParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Maximum number of PRs to return (default: 10)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetPullRequestParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetPullRequestDiffParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RequestReviewersParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
    #[schemars(description = "GitHub usernames of requested reviewers")]
    pub reviewers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddPrCommentParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
    #[schemars(description = "Comment content")]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddReviewCommentParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
    #[schemars(description = "Comment content")]
    pub body: String,
    #[schemars(description = "The relative path to the file to comment on")]
    pub path: String,
    #[schemars(
        description = "The position in the diff where you want to add a comment (see get_pr_changes_for_commenting)"
    )]
    pub position: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetPrCommentsParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetPrChangesParams {
    #[schemars(description = "Repository owner (username or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Pull request number")]
    pub pr_number: u64,
}
