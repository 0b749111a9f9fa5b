pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::{ApiClient, RemoteError};

#[derive(Parser)]
#[command(name = "clearance")]
#[command(about = "Clearance CLI - manage security levels and access grants")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, conflicts_with = "json", help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "CLEARANCE_URL", help = "Server base URL")]
    pub server: Option<String>,

    #[arg(long, global = true, env = "CLEARANCE_TOKEN", hide_env_values = true, help = "Bearer token")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Security level management")]
    Level {
        #[command(subcommand)]
        cmd: commands::level::LevelCommands,
    },

    #[command(about = "Grant, revoke and check access")]
    Access {
        #[command(subcommand)]
        cmd: commands::access::AccessCommands,
    },

    #[command(about = "Mint a development bearer token")]
    Token(commands::token::TokenArgs),

    #[command(about = "Check server health")]
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// `--text`/`--json` win over CLEARANCE_FORMAT; text is the fallback
    pub fn from_cli(cli: &Cli) -> Self {
        Self::resolve(cli.text, cli.json, std::env::var("CLEARANCE_FORMAT").ok().as_deref())
    }

    fn resolve(text: bool, json: bool, default: Option<&str>) -> Self {
        match (text, json, default) {
            (true, _, _) => OutputFormat::Text,
            (_, true, _) => OutputFormat::Json,
            (_, _, Some(format)) if format.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let saved = config::load_session_config()?;
    let server_url = config::resolve_server_url(cli.server, &saved);
    let client = ApiClient::new(server_url.clone(), config::resolve_token(cli.token, &saved))?;

    let result = match cli.command {
        Commands::Level { cmd } => commands::level::handle(cmd, &client, output_format.clone()).await,
        Commands::Access { cmd } => commands::access::handle(cmd, &client, output_format.clone()).await,
        Commands::Token(args) => commands::token::handle(args, &server_url, output_format.clone()).await,
        Commands::Ping => {
            let data = client.health().await?;
            utils::output_success(&output_format, &format!("{} is up", server_url), data)
        }
    };

    // Server-side rejections get the structured error output
    if let Err(e) = &result {
        if let Some(remote) = e.downcast_ref::<RemoteError>() {
            utils::output_error(&output_format, &remote.message, Some(&remote.code))?;
        }
    }
    result
}
