//! sibyl MCP server binary.
//!
//! Serves the AI and file tools over stdio. Provider settings come from the
//! environment (`AI_PROVIDER`, `GOOGLE_CLOUD_PROJECT`, `GEMINI_API_KEY`, ...).
//!
//! Usage:
//!   GEMINI_API_KEY=... AI_PROVIDER=gemini cargo run -p sibyl-mcp -- --root ~/src/project
//!
//! Test with MCP inspector:
//!   npx @modelcontextprotocol/inspector cargo run -p sibyl-mcp

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{EnvFilter, fmt};

use sibyl_kernel::{FileTools, Generator, ProviderConfig, Workspace, backend_for};
use sibyl_mcp::SibylMcp;

const ENV_WORKSPACE_ROOT: &str = "SIBYL_WORKSPACE_ROOT";

/// MCP server exposing Gemini-backed answer tools and sandboxed file tools.
#[derive(Parser, Debug)]
#[command(name = "sibyl-mcp")]
#[command(about = "MCP server for generative answers and workspace file tools")]
struct Args {
    /// Workspace root for the file tools [env: SIBYL_WORKSPACE_ROOT, default: cwd]
    #[arg(long)]
    root: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,
}

/// RUST_LOG directives when set and valid, otherwise the `--debug` level.
fn log_filter(rust_log: Option<&str>, debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the MCP protocol
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), args.debug))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Arc::new(ProviderConfig::from_env().context("invalid AI provider configuration")?);
    let backend = backend_for(&config);
    let generator = Arc::new(Generator::new(config.clone(), backend));

    let root = match args.root.or_else(|| std::env::var_os(ENV_WORKSPACE_ROOT).map(PathBuf::from)) {
        Some(root) => root,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let workspace = Workspace::new(&root)
        .with_context(|| format!("invalid workspace root {}", root.display()))?;
    let files = Arc::new(FileTools::new(Arc::new(workspace)));

    tracing::info!(
        provider = %config.provider,
        model = %config.model_id,
        streaming = config.use_streaming,
        max_retries = config.max_retries,
        root = %files.workspace().root().display(),
        "Starting sibyl-mcp"
    );

    let service = SibylMcp::new(generator, files)
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("MCP server error: {:?}", e);
        })?;

    tracing::info!("sibyl-mcp server ready");

    // In-flight calls are dropped when the transport closes
    service.waiting().await?;

    tracing::info!("sibyl-mcp server shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(filter: EnvFilter) -> String {
        filter.to_string().to_lowercase()
    }

    #[test]
    fn test_rust_log_level_wins_over_debug_flag() {
        assert_eq!(directives(log_filter(Some("warn"), true)), "warn");
        assert_eq!(directives(log_filter(Some("error"), false)), "error");
    }

    #[test]
    fn test_rust_log_targets_are_kept() {
        let filter = directives(log_filter(Some("sibyl_kernel=trace"), false));
        assert!(filter.contains("sibyl_kernel=trace"), "{filter}");
        assert!(!filter.contains("info"), "{filter}");
    }

    #[test]
    fn test_falls_back_to_flag_level() {
        assert_eq!(directives(log_filter(None, false)), "info");
        assert_eq!(directives(log_filter(None, true)), "debug");
        assert_eq!(directives(log_filter(Some("  "), true)), "debug");
    }
}
