use super::require_admin;
use crate::http::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use domain::{CommunityId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct BlockRequest {
    pub reviewer_id: UserId,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct UnblockQuery {
    pub reviewer_id: UserId,
}

#[derive(Serialize)]
pub struct BlockedResponse {
    pub blocked: bool,
}

#[derive(Serialize)]
pub struct BlockChangeResponse {
    pub changed: bool,
}

pub async fn is_blocked(
    State(state): State<AppState>,
    Path((community, user_id)): Path<(u64, UserId)>,
) -> Result<Json<BlockedResponse>, ApiError> {
    let blocked = state
        .engine
        .is_blocked(CommunityId::new(community), user_id)
        .await?;
    Ok(Json(BlockedResponse { blocked }))
}

pub async fn block(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community, user_id)): Path<(u64, UserId)>,
    Json(payload): Json<BlockRequest>,
) -> Result<Json<BlockChangeResponse>, ApiError> {
    require_admin(&headers, &state)?;
    let changed = state
        .engine
        .block(
            CommunityId::new(community),
            user_id,
            payload.reviewer_id,
            payload.reason.as_deref(),
        )
        .await?;
    Ok(Json(BlockChangeResponse { changed }))
}

pub async fn unblock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community, user_id)): Path<(u64, UserId)>,
    Query(query): Query<UnblockQuery>,
) -> Result<Json<BlockChangeResponse>, ApiError> {
    require_admin(&headers, &state)?;
    let changed = state
        .engine
        .unblock(CommunityId::new(community), user_id, query.reviewer_id)
        .await?;
    Ok(Json(BlockChangeResponse { changed }))
}
