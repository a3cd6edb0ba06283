use super::require_admin;
use crate::http::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use domain::{CommunityId, ReactionAction, ReactionEvent, UserId};
use serde::{Deserialize, Serialize};

/// Reaction notification pushed by the chat bridge.
#[derive(Deserialize)]
pub struct ReactionRequest {
    pub mirror_message_id: u64,
    pub user_id: UserId,
    pub emoji: String,
    pub action: ReactionAction,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Serialize)]
pub struct AppliedResponse {
    pub applied: bool,
}

#[derive(Serialize)]
pub struct ReconciledResponse {
    pub reconciled: usize,
}

pub async fn ingest_reaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(community): Path<u64>,
    Json(payload): Json<ReactionRequest>,
) -> Result<Json<AppliedResponse>, ApiError> {
    require_admin(&headers, &state)?;
    let event = ReactionEvent {
        community_id: CommunityId::new(community),
        mirror_message_id: payload.mirror_message_id,
        user_id: payload.user_id,
        emoji: payload.emoji,
        action: payload.action,
        is_bot: payload.is_bot,
    };
    let applied = state.engine.apply_reaction_event(&event).await?;
    Ok(Json(AppliedResponse { applied }))
}

pub async fn community_available(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(community): Path<u64>,
) -> Result<Json<ReconciledResponse>, ApiError> {
    require_admin(&headers, &state)?;
    let reconciled = state
        .engine
        .community_available(CommunityId::new(community), state.surface.as_ref())
        .await?;
    Ok(Json(ReconciledResponse { reconciled }))
}
