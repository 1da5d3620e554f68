//! `roster` command: list online users.

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use filerelay_core::error::{AppError, ErrorKind};
use filerelay_core::types::PublicProfile;

use super::Context;
use crate::output;

#[derive(Debug, Deserialize)]
struct PresenceEnvelope {
    data: PresenceData,
}

#[derive(Debug, Deserialize)]
struct PresenceData {
    users: Vec<PublicProfile>,
}

/// Roster row for table output
#[derive(Debug, Serialize, Tabled)]
struct RosterRow {
    /// Position in join order
    #[tabled(rename = "#")]
    position: usize,
    /// Logical id
    id: String,
    /// Display name
    name: String,
    /// User code
    code: String,
}

/// Execute the roster command
pub async fn execute(ctx: &Context) -> Result<(), AppError> {
    let url = format!("{}/api/presence", ctx.server);
    let mut request = reqwest::Client::new().get(&url);
    if let Some(token) = &ctx.token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
        AppError::with_source(ErrorKind::Transport, format!("Failed to reach {url}"), e)
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::external(format!("Relay answered {status}")));
    }
    let envelope: PresenceEnvelope = response.json().await.map_err(|e| {
        AppError::with_source(ErrorKind::Serialization, "Malformed presence response", e)
    })?;

    let rows: Vec<RosterRow> = envelope
        .data
        .users
        .into_iter()
        .enumerate()
        .map(|(i, p)| RosterRow {
            position: i + 1,
            id: p.id.to_string(),
            name: p.name,
            code: p.user_id,
        })
        .collect();

    output::print_list(&rows, ctx.format);
    Ok(())
}
