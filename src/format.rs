//! Text rendering for tool responses
//!
//! The host consumes plain text, so every tool funnels its data through one
//! of these formatters.

use crate::types::{FileChangeInfo, IssueComment, PullRequest, ReviewComment};

/// Prefix marking comments posted through this server
pub const AI_COMMENT_IDENTIFIER: &str = "[AI] Generated using MCP\n\n";

/// Render an open-PR listing
pub fn format_pull_request_list(pull_requests: &[PullRequest], owner: &str, repo: &str) -> String {
    if pull_requests.is_empty() {
        return format!("No open pull requests found in {owner}/{repo}");
    }

    let entries: Vec<String> = pull_requests
        .iter()
        .map(|pr| {
            [
                format!("#{}: {}", pr.number, pr.title),
                format!("Created by: {} on {}", pr.user.login, pr.created_at),
                format!("{} -> {}", pr.head.label, pr.base.label),
                format!("{} reviewers requested", pr.requested_reviewers.len()),
                format!("URL: {}", pr.html_url),
                "---".to_string(),
            ]
            .join("\n")
        })
        .collect();

    format!(
        "Open Pull Requests in {owner}/{repo}:\n\n{}",
        entries.join("\n")
    )
}

/// Render both comment collections of a pull request
pub fn format_comments(
    issue_comments: &[IssueComment],
    review_comments: &[ReviewComment],
    pr_number: u64,
) -> String {
    if issue_comments.is_empty() && review_comments.is_empty() {
        return format!("No comments found for PR #{pr_number}");
    }

    let mut out = format!("Comments for PR #{pr_number}:\n\n");

    if !issue_comments.is_empty() {
        out.push_str("## Conversation Comments\n\n");
        let entries: Vec<String> = issue_comments
            .iter()
            .map(|comment| {
                [
                    format!("Comment by: {}", comment.user.login),
                    format!("Date: {}", comment.created_at),
                    comment.body.clone(),
                    format!("URL: {}", comment.html_url),
                    "---".to_string(),
                ]
                .join("\n")
            })
            .collect();
        out.push_str(&entries.join("\n"));
        out.push_str("\n\n");
    }

    if !review_comments.is_empty() {
        out.push_str("## Code Review Comments\n\n");
        let entries: Vec<String> = review_comments
            .iter()
            .map(|comment| {
                let location = match comment.position {
                    Some(position) => format!("{} (position {})", comment.path, position),
                    None => comment.path.clone(),
                };
                [
                    format!("Comment by: {}", comment.user.login),
                    format!("Date: {}", comment.created_at),
                    format!("File: {location}"),
                    comment.body.clone(),
                    format!("URL: {}", comment.html_url),
                    "---".to_string(),
                ]
                .join("\n")
            })
            .collect();
        out.push_str(&entries.join("\n"));
    }

    out
}

/// Render the changed files of a pull request with their commentable
/// positions
pub fn format_file_changes(file_changes: &[FileChangeInfo], pr_number: u64) -> String {
    let entries: Vec<String> = file_changes
        .iter()
        .map(|file| {
            let positions = if file.positions.is_empty() {
                "None".to_string()
            } else {
                file.positions
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let patch = match &file.patch {
                Some(patch) => format!("\nPatch:\n{patch}"),
                None => String::new(),
            };
            [
                format!("File: {}", file.filename),
                format!("Status: {}", file.status),
                format!(
                    "Changes: +{}/-{} (total: {})",
                    file.additions, file.deletions, file.changes
                ),
                format!("Comment Positions: {positions}"),
                patch,
                "---".to_string(),
            ]
            .join("\n")
        })
        .collect();

    format!("Changes in PR #{pr_number}:\n\n{}", entries.join("\n\n"))
}

/// Render a single pull request's details
pub fn format_pull_request(pr: &PullRequest) -> String {
    let reviewers = if pr.requested_reviewers.is_empty() {
        "None".to_string()
    } else {
        pr.requested_reviewers
            .iter()
            .map(|user| user.login.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };

    [
        format!("PR #{}: {}", pr.number, pr.title),
        format!("State: {}", pr.state),
        format!("Created by: {} on {}", pr.user.login, pr.created_at),
        format!("{} -> {}", pr.head.label, pr.base.label),
        format!("Requested reviewers: {reviewers}"),
        format!("URL: {}", pr.html_url),
        String::new(),
        pr.body.clone().unwrap_or_else(|| "(no description)".to_string()),
    ]
    .join("\n")
}
