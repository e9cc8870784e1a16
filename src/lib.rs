//! GitHub Pull Request MCP Library
//!
//! MCP-compatible tools for managing GitHub pull requests, backed by the
//! REST API with dual-transport authentication: direct HTTPS calls with a
//! personal access token, or the authenticated `gh` CLI as a fallback.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use gh_pr_mcp::GhPrMcpServer;
//!
//! let server = GhPrMcpServer::new();
//! // Use with in-memory transport or serve via stdio
//! ```
//!
//! # Features
//! - Pull requests: create, update, list, view, diff
//! - Reviews: request reviewers, add review comments at diff positions
//! - Comments: add and retrieve conversation and code review comments
//!
//! # Requirements
//! - `GITHUB_PERSONAL_ACCESS_TOKEN` set, or `gh` installed and
//!   authenticated (`gh auth login`)

pub mod api;
pub mod auth;
pub mod diff;
pub mod error;
pub mod format;
pub mod params;
pub mod server;
pub mod types;

pub use api::GitHubApi;
pub use auth::GitHubAuth;
pub use error::{GitHubError, GitHubResult};
pub use server::GhPrMcpServer;
