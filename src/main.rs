use anyhow::Result;
use avstack_mcp::aviationstack::{AviationstackClient, ClientConfig};
use avstack_mcp::mcp::McpServer;
use clap::Parser;

/// avstack-mcp - Aviationstack MCP server
///
/// Serves aviation-data tools over MCP (JSON-RPC 2.0 on stdio), backed by
/// the Aviationstack REST API.
///
/// The AVIATIONSTACK_API_KEY environment variable is required. Timeout,
/// retry and backoff settings can be tuned via flags or the matching
/// AVIATIONSTACK_* environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Aviationstack API base URL
    #[arg(long = "base-url", env = "AVIATIONSTACK_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout-seconds",
        env = "AVIATIONSTACK_TIMEOUT_SECONDS",
        value_name = "SECONDS"
    )]
    timeout_seconds: Option<f64>,

    /// Retries allowed after the initial attempt
    #[arg(
        long = "max-retries",
        env = "AVIATIONSTACK_MAX_RETRIES",
        value_name = "COUNT"
    )]
    max_retries: Option<usize>,

    /// Base exponential backoff interval in seconds
    #[arg(
        long = "backoff-seconds",
        env = "AVIATIONSTACK_RETRY_BACKOFF_SECONDS",
        value_name = "SECONDS"
    )]
    backoff_seconds: Option<f64>,
}

impl Cli {
    fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(backoff) = self.backoff_seconds {
            config.backoff_seconds = backoff;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // All logging goes to stderr; stdout carries the MCP framing.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = cli.apply(ClientConfig::from_env()?);
    let client = AviationstackClient::new(config)?;

    McpServer::new(client).run().await
}
