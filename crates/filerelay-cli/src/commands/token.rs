//! `token` command: mint a connection token for development.

use clap::Args;

use filerelay_auth::JwtEncoder;
use filerelay_core::error::AppError;
use filerelay_core::types::PublicProfile;

use super::{Context, parse_user_id};
use crate::output::{self, OutputFormat};

/// Arguments for the token command
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Logical user id (token subject)
    #[arg(short, long)]
    pub user: String,

    /// Display name
    #[arg(short, long)]
    pub name: String,

    /// Human-facing user code (defaults to the user id)
    #[arg(long)]
    pub code: Option<String>,

    /// Avatar URL
    #[arg(long, default_value = "")]
    pub avatar: String,
}

/// Execute the token command
pub fn execute(args: &TokenArgs, ctx: &Context) -> Result<(), AppError> {
    let id = parse_user_id(&args.user)?;
    let profile = PublicProfile {
        user_id: args.code.clone().unwrap_or_else(|| id.to_string()),
        id,
        name: args.name.clone(),
        avatar: args.avatar.clone(),
    };

    let token = JwtEncoder::new(&ctx.config.auth).issue(&profile)?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "userId": profile.id,
                "ttlMinutes": ctx.config.auth.token_ttl_minutes,
            });
            println!("{json}");
        }
        OutputFormat::Table => {
            output::print_kv("User", profile.id.as_str());
            output::print_kv("Expires in", &format!("{} min", ctx.config.auth.token_ttl_minutes));
            println!("{token}");
        }
    }
    Ok(())
}
