//! Web Search MCP Server
//!
//! Web search via DuckDuckGo over the MCP stdio transport.
//!
//! # Configuration
//! Pass `--config PATH`, set `WEBSEARCH_CONFIG_PATH`, or create
//! `~/.websearch-mcp/config.toml`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mcp_common::{serve_stdio, FatalError, LogFormat, ServeOptions};
use websearch_mcp::{Config, WebSearchMcpServer};

#[derive(Parser, Debug)]
#[command(name = "websearch-mcp", version, about = "MCP server providing DuckDuckGo web search")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "WEBSEARCH_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Maximum number of tool calls running at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Log format on stderr (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("websearch-mcp: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), FatalError> {
    mcp_common::init_tracing("websearch_mcp", cli.log_format).map_err(FatalError::Logging)?;

    tracing::info!("Starting Web Search MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref()).map_err(FatalError::Config)?;
    if let Some(n) = cli.max_concurrency {
        config.server.max_concurrency = n;
    }
    config.validate().map_err(FatalError::Config)?;

    let options = ServeOptions {
        max_concurrency: config.server.max_concurrency,
        call_timeout: config.call_timeout(),
    };

    let server = WebSearchMcpServer::new(config).map_err(FatalError::Startup)?;

    tracing::info!(
        "Server running (max_concurrency: {}, call_timeout: {}s), waiting for requests...",
        options.max_concurrency,
        options.call_timeout.as_secs()
    );
    serve_stdio(server, options)
        .await
        .map_err(FatalError::Transport)?;

    tracing::info!("Server shutting down");
    Ok(())
}
