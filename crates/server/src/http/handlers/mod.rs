pub mod blocks;
pub mod reactions;
pub mod suggestions;

use super::error::ApiError;
use crate::state::AppState;
use axum::http::{HeaderMap, StatusCode};

/// Staff routes carry `Authorization: Bearer <admin_token>`.
pub(crate) fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<(), ApiError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Auth(
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header",
        ))?;
    let expected_token = format!("Bearer {}", state.admin_token);
    if auth_header != expected_token {
        return Err(ApiError::Auth(StatusCode::FORBIDDEN, "Invalid Admin Token"));
    }
    Ok(())
}
