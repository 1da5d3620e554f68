//! Presence handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::extractors::RequestIdentity;
use crate::state::AppState;

/// GET /api/presence: current roster in join order.
pub async fn roster(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
) -> Json<ApiResponse<PresenceResponse>> {
    let users = state.engine.gateway.roster();
    tracing::debug!(
        caller = identity.as_ref().map(|i| i.user_id.as_str()).unwrap_or("-"),
        count = users.len(),
        "Roster requested"
    );

    Json(ApiResponse::ok(PresenceResponse {
        count: users.len(),
        users,
    }))
}
