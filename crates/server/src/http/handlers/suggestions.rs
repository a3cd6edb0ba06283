use super::require_admin;
use crate::http::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::{CommunityId, Suggestion, SuggestionStatus, UserId};
use engine::{Actor, AuthorRef, EngineError, SuggestionStats};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub open: bool,
}

#[derive(Deserialize)]
pub struct TopQuery {
    pub count: Option<usize>,
}

#[derive(Deserialize)]
pub struct CreateSuggestionRequest {
    pub author_id: UserId,
    pub content: String,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    pub reviewer_id: UserId,
    pub remarks: Option<String>,
}

#[derive(Serialize)]
pub struct ChangedResponse {
    pub changed: bool,
}

#[derive(Serialize)]
pub struct CooldownResponse {
    pub remaining_secs: u64,
}

pub async fn list_suggestions(
    State(state): State<AppState>,
    Path(community): Path<u64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let list = state
        .engine
        .list_suggestions(CommunityId::new(community), query.open)
        .await?;
    Ok(Json(list))
}

pub async fn top_suggestions(
    State(state): State<AppState>,
    Path(community): Path<u64>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let top = state
        .engine
        .top_suggestions(CommunityId::new(community), query.count)
        .await?;
    Ok(Json(top))
}

pub async fn create_suggestion(
    State(state): State<AppState>,
    Path(community): Path<u64>,
    Json(payload): Json<CreateSuggestionRequest>,
) -> Result<(StatusCode, Json<Suggestion>), ApiError> {
    let created = state
        .engine
        .create_suggestion(CommunityId::new(community), payload.author_id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_suggestion(
    State(state): State<AppState>,
    Path((community, id)): Path<(u64, i64)>,
) -> Result<Json<Suggestion>, ApiError> {
    let found = state
        .engine
        .get_by_id(CommunityId::new(community), id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("suggestion #{}", id)))?;
    Ok(Json(found))
}

pub async fn get_by_mirror(
    State(state): State<AppState>,
    Path((community, message_id)): Path<(u64, u64)>,
) -> Result<Json<Suggestion>, ApiError> {
    let found = state
        .engine
        .get_by_mirror_id(CommunityId::new(community), message_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("mirror message {}", message_id)))?;
    Ok(Json(found))
}

pub async fn list_by_author(
    State(state): State<AppState>,
    Path((community, user_id)): Path<(u64, UserId)>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let list = state
        .engine
        .list_by_author(CommunityId::new(community), user_id)
        .await?;
    Ok(Json(list))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path((community, user_id)): Path<(u64, UserId)>,
) -> Json<AuthorRef> {
    Json(state.engine.author(CommunityId::new(community), user_id).await)
}

pub async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community, id)): Path<(u64, i64)>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<ChangedResponse>, ApiError> {
    require_admin(&headers, &state)?;
    let status: SuggestionStatus = payload.status.parse().map_err(EngineError::from)?;

    let changed = state
        .engine
        .set_status(
            CommunityId::new(community),
            id,
            status,
            Actor::Reviewer(payload.reviewer_id),
            payload.remarks.as_deref(),
        )
        .await?;
    Ok(Json(ChangedResponse { changed }))
}

pub async fn stats(
    State(state): State<AppState>,
    Path(community): Path<u64>,
) -> Result<Json<SuggestionStats>, ApiError> {
    Ok(Json(state.engine.stats(CommunityId::new(community)).await?))
}

pub async fn cooldown(
    State(state): State<AppState>,
    Path((community, user_id)): Path<(u64, UserId)>,
) -> Result<Json<CooldownResponse>, ApiError> {
    let remaining = state
        .engine
        .remaining_cooldown(CommunityId::new(community), user_id)
        .await?;
    // round up so half a second left never reads as 0
    let remaining_secs = remaining
        .as_secs()
        .saturating_add(u64::from(remaining.subsec_nanos() > 0));
    Ok(Json(CooldownResponse { remaining_secs }))
}
