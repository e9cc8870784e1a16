//! GitHub REST API payload types
//!
//! Structs mirroring the subset of the REST responses the tools consume.
//! Field names are the REST API's own snake_case, so no renames are needed.

use serde::{Deserialize, Serialize};

/// A GitHub user reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

/// A branch reference on a pull request (head or base)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name
    #[serde(rename = "ref")]
    pub ref_name: String,

    /// `owner:branch` label
    pub label: String,

    /// Commit SHA the ref points at
    #[serde(default)]
    pub sha: Option<String>,
}

/// A pull request as returned by `/repos/{owner}/{repo}/pulls`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,

    #[serde(default)]
    pub body: Option<String>,

    /// open, closed
    pub state: String,

    #[serde(default)]
    pub draft: Option<bool>,

    pub html_url: String,
    pub user: User,

    /// ISO 8601 timestamps
    pub created_at: String,
    pub updated_at: String,

    #[serde(default)]
    pub requested_reviewers: Vec<User>,

    pub head: BranchRef,
    pub base: BranchRef,
}

/// A conversation comment (issue comment endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub user: User,
    pub created_at: String,
    pub html_url: String,
}

/// A code review comment anchored to a diff position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: u64,
    pub body: String,
    pub user: User,
    pub created_at: String,
    pub html_url: String,
    pub path: String,

    /// Position within the diff; null when the comment is outdated
    #[serde(default)]
    pub position: Option<u64>,

    pub commit_id: String,
}

/// One changed file from `/pulls/{number}/files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,

    /// added, removed, modified, renamed, ...
    pub status: String,

    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,

    /// Unified diff for this file; absent for binary files
    #[serde(default)]
    pub patch: Option<String>,
}

/// A changed file enriched with its commentable diff positions
#[derive(Debug, Clone, Serialize)]
pub struct FileChangeInfo {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub patch: Option<String>,
    pub positions: Vec<u32>,
}

/// Body for creating a pull request
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

/// Body for updating a pull request; only set fields are sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullRequestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// "open" or "closed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl PullRequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.state.is_none() && self.base.is_none()
    }

    /// Names of the fields that will be sent, for the confirmation message
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.title.is_some() {
            names.push("title");
        }
        if self.body.is_some() {
            names.push("body");
        }
        if self.state.is_some() {
            names.push("state");
        }
        if self.base.is_some() {
            names.push("base");
        }
        names
    }
}

/// Body for a new review comment anchored to a diff position
#[derive(Debug, Clone, Serialize)]
pub struct NewReviewComment {
    pub body: String,
    pub commit_id: String,
    pub path: String,
    pub position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_update_serializes_only_set_fields() {
        let update = PullRequestUpdate {
            title: Some("new title".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"title": "new title"}));
        assert_eq!(update.field_names(), vec!["title"]);
        assert!(!update.is_empty());
        assert!(PullRequestUpdate::default().is_empty());
    }

    #[test]
    fn pull_request_deserializes_rest_shape() {
        let json = serde_json::json!({
            "number": 42,
            "title": "Add feature",
            "state": "open",
            "html_url": "https://github.com/o/r/pull/42",
            "user": {"login": "octocat"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "head": {"ref": "feature", "label": "o:feature", "sha": "abc123"},
            "base": {"ref": "main", "label": "o:main", "sha": "def456"}
        });
        let pr: PullRequest = serde_json::from_value(json).unwrap();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.head.sha.as_deref(), Some("abc123"));
        assert!(pr.requested_reviewers.is_empty());
    }
}
