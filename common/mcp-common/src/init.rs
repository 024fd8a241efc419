//! Server initialization utilities
//!
//! Logging setup and the fatal-error vocabulary shared by MCP server
//! binaries. stdout belongs to the protocol, so everything here writes to
//! stderr.

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines without ANSI colors
    #[default]
    Text,
    /// One JSON object per event, for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("text") {
            Ok(Self::Text)
        } else {
            Err(format!("unknown log format '{s}' (expected 'text' or 'json')"))
        }
    }
}

/// Initialize tracing/logging for an MCP server
///
/// Filtering follows `RUST_LOG`, with `info` enabled for `crate_name` by
/// default.
///
/// ```rust,ignore
/// mcp_common::init_tracing("websearch_mcp", LogFormat::Json)?;
/// ```
pub fn init_tracing(crate_name: &str, format: LogFormat) -> anyhow::Result<()> {
    let directive = format!("{}=info", crate_name);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?,
    }

    Ok(())
}

/// Conditions that end the process before or outside a session
///
/// Each maps to its own exit status so a supervising host can tell them
/// apart without parsing stderr.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("failed to load configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("failed to initialize the server: {0:#}")]
    Startup(anyhow::Error),

    #[error("stdio transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("failed to initialize logging: {0:#}")]
    Logging(anyhow::Error),
}

impl FatalError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FatalError::Config(_) => 2,
            FatalError::Startup(_) => 3,
            FatalError::Transport(_) => 4,
            FatalError::Logging(_) => 5,
        }
    }
}
