//! Diff position indexing
//!
//! GitHub's review-comment API addresses lines by their position within the
//! patch's own textual layout, not by file line number: a 1-based counter
//! over every line of the patch blob, hunk headers included. This module
//! computes the positions eligible for comments (added lines) using exactly
//! that counting scheme so the ordinals stay bit-compatible with the API.

use crate::types::{FileChangeInfo, PullRequestFile};

/// Commentable positions within a patch, in encounter order.
///
/// A line is commentable iff it begins with `+` and is not a `+++` file
/// header. Binary files carry no patch and yield no positions.
pub fn comment_positions(patch: Option<&str>) -> Vec<u32> {
    let Some(patch) = patch else {
        return Vec::new();
    };

    let mut positions = Vec::new();
    let mut position: u32 = 0;
    for line in patch.split('\n') {
        position += 1;
        if line.starts_with('+') && !line.starts_with("+++") {
            positions.push(position);
        }
    }
    positions
}

/// Attach commentable positions to each changed file
pub fn enrich_file_changes(files: Vec<PullRequestFile>) -> Vec<FileChangeInfo> {
    files
        .into_iter()
        .map(|file| {
            let positions = comment_positions(file.patch.as_deref());
            FileChangeInfo {
                filename: file.filename,
                status: file.status,
                additions: file.additions,
                deletions: file.deletions,
                changes: file.changes,
                patch: file.patch,
                positions,
            }
        })
        .collect()
}
