use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::EngineError;
use serde_json::json;
use tracing::error;

pub enum ApiError {
    Engine(EngineError),
    /// Missing (401) or wrong (403) admin token.
    Auth(StatusCode, &'static str),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let e = match self {
            ApiError::Auth(status, msg) => {
                return (status, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Engine(e) => e,
        };

        let status = match &e {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            EngineError::Blocked(_) => StatusCode::FORBIDDEN,
            EngineError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            EngineError::Persistence(_) | EngineError::Collaborator(_) => {
                error!("Request failed: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response();
            }
        };

        let body = match &e {
            EngineError::CooldownActive { remaining } => json!({
                "error": e.to_string(),
                "retry_after_secs": remaining.as_secs(),
            }),
            _ => json!({ "error": e.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
