//! GitHub Pull Request MCP Server
//!
//! Serves pull-request management tools over stdio. Authentication resolves
//! once per process: a personal access token from
//! `GITHUB_PERSONAL_ACCESS_TOKEN` when available and valid, otherwise the
//! authenticated `gh` CLI.
//!
//! # Usage
//!
//! Run directly:
//! ```bash
//! gh-pr-mcp
//! ```
//!
//! Or configure in `.mcp.json`:
//! ```json
//! {
//!   "mcpServers": {
//!     "gh-pr": {
//!       "command": "./target/release/gh-pr-mcp"
//!     }
//!   }
//! }
//! ```

use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gh_pr_mcp::GhPrMcpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout is used for MCP protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive("gh_pr_mcp=info".parse()?))
        .init();

    tracing::info!("Starting GitHub PR MCP Server");

    let server = GhPrMcpServer::new();

    // Resolve credentials up front so misconfiguration shows at startup.
    // Errors are not fatal here - each tool call re-attempts resolution.
    match server.api().auth().ensure_authenticated().await {
        Ok(()) => {
            let auth = server.api().auth();
            match (auth.method().await, auth.user_login().await) {
                (Ok(method), Ok(login)) => {
                    tracing::info!(%method, user = %login, "GitHub authentication ready");
                }
                (Ok(method), Err(e)) => {
                    tracing::warn!(%method, "authenticated but user lookup failed: {e}");
                }
                _ => {}
            }
        }
        Err(e) => tracing::warn!("GitHub authentication check failed: {e}"),
    }

    // Create stdio transport and serve
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");

    // Wait for shutdown
    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(())
}
