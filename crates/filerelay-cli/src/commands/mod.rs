//! CLI command definitions and dispatch.

pub mod receive;
pub mod roster;
pub mod send;
pub mod token;

use clap::{Parser, Subcommand};

use filerelay_core::config::AppConfig;
use filerelay_core::error::AppError;
use filerelay_core::types::UserId;

use crate::output::OutputFormat;

/// FileRelay: send files to online users through a relay
#[derive(Debug, Parser)]
#[command(name = "filerelay", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (loads config/default.toml + config/{env}.toml)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Relay server base URL
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Connection token (required when the server runs in jwt mode)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send one or more files to an online user
    Send(send::SendArgs),
    /// Wait for incoming files
    Receive(receive::ReceiveArgs),
    /// List online users
    Roster,
    /// Mint a connection token (development)
    Token(token::TokenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.env)?;
        let ctx = Context {
            server: self.server.trim_end_matches('/').to_string(),
            token: self.token.clone(),
            format: self.format,
            config,
        };

        match &self.command {
            Commands::Send(args) => send::execute(args, &ctx).await,
            Commands::Receive(args) => receive::execute(args, &ctx).await,
            Commands::Roster => roster::execute(&ctx).await,
            Commands::Token(args) => token::execute(args, &ctx),
        }
    }
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Relay base URL without trailing slash
    pub server: String,
    /// Connection token
    pub token: Option<String>,
    /// Output format
    pub format: OutputFormat,
    /// Loaded configuration
    pub config: AppConfig,
}

/// Helper: load configuration for the given environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Helper: validate a user id argument
pub fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    let id = UserId::new(raw.trim());
    if id.is_empty() {
        return Err(AppError::validation("User id must not be empty"));
    }
    Ok(id)
}
