use std::path::PathBuf;

use basecamp_core::{OAuthConfig, TokenStore};
use basecamp_mcp_runtime::McpRuntimeConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "basecamp-mcp",
    version,
    about = "Basecamp MCP server — tool surface for the Basecamp 3 API over stdio"
)]
struct Cli {
    /// OAuth client id from launchpad.37signals.com/integrations
    #[arg(long, env = "BASECAMP_CLIENT_ID", default_value = "")]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "BASECAMP_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    client_secret: String,

    /// Basecamp account id; the stored credential's account id wins when both exist
    #[arg(long, env = "BASECAMP_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Explicit access token; skips the credential store and refresh entirely
    #[arg(long, env = "BASECAMP_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// User-Agent sent to Basecamp; it must identify the integration
    #[arg(
        long,
        env = "BASECAMP_USER_AGENT",
        default_value = "Basecamp MCP (github.com/basecamp-mcp/basecamp-mcp)"
    )]
    user_agent: String,

    /// Return full API payloads by default instead of compact projections
    #[arg(long, env = "BASECAMP_FULL_RESPONSES")]
    full_responses: bool,

    /// Credentials file path (defaults to the platform config directory)
    #[arg(long, env = "BASECAMP_CREDENTIALS_PATH")]
    credentials_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    // Stdout carries the protocol; everything else goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match cli.credentials_path {
        Some(path) => TokenStore::at_path(path),
        None => TokenStore::new(),
    };
    let config = McpRuntimeConfig {
        user_agent: cli.user_agent,
        account_id: cli.account_id,
        access_token: cli.access_token,
        oauth: OAuthConfig::new(cli.client_id, cli.client_secret),
        compact_default: !cli.full_responses,
        api_base_url: None,
    };

    let code = basecamp_mcp_runtime::run(config, store).await;
    std::process::exit(code);
}
