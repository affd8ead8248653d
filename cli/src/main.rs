use std::path::PathBuf;

use basecamp_core::{OAuthConfig, TokenStore};
use clap::{Parser, Subcommand};
use serde_json::json;

mod commands;

#[derive(Parser)]
#[command(
    name = "bcq",
    version,
    about = "Basecamp CLI — manage the stored OAuth credential and query the API"
)]
struct Cli {
    /// OAuth client id from launchpad.37signals.com/integrations
    #[arg(long, env = "BASECAMP_CLIENT_ID", default_value = "")]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "BASECAMP_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    client_secret: String,

    /// Basecamp account id; discovered during login when omitted
    #[arg(long, env = "BASECAMP_ACCOUNT_ID")]
    account_id: Option<String>,

    /// User-Agent sent to Basecamp; it must identify the integration
    #[arg(
        long,
        env = "BASECAMP_USER_AGENT",
        default_value = "Basecamp MCP (github.com/basecamp-mcp/basecamp-mcp)"
    )]
    user_agent: String,

    /// Credentials file path (defaults to the platform config directory)
    #[arg(long, env = "BASECAMP_CREDENTIALS_PATH")]
    credentials_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stored OAuth credential
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List the projects visible to the authenticated account
    Projects {
        /// Print full API payloads instead of compact projections
        #[arg(long)]
        full: bool,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Authenticate via the browser and store the credential
    Login,
    /// Show the stored credential's state without touching the network
    Status,
    /// Refresh the stored access token if it has expired
    Refresh,
    /// Delete the stored credential
    Logout,
}

fn exit_error(message: &str) -> ! {
    let err = json!({
        "error": "cli_error",
        "message": message
    });
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let store = match cli.credentials_path {
        Some(path) => TokenStore::at_path(path),
        None => TokenStore::new(),
    };
    let oauth = OAuthConfig::new(cli.client_id, cli.client_secret);

    let result = match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login => {
                commands::auth::login(store, oauth, cli.account_id.as_deref(), &cli.user_agent)
                    .await
            }
            AuthCommands::Status => commands::auth::status(&store),
            AuthCommands::Refresh => commands::auth::refresh(store, oauth).await,
            AuthCommands::Logout => commands::auth::logout(&store),
        },
        Commands::Projects { full } => {
            commands::projects::list(store, oauth, &cli.user_agent, full).await
        }
    };

    if let Err(err) = result {
        exit_error(&err.to_string());
    }
}
