use super::handlers::{blocks, reactions, suggestions};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    let cors = if allowed_origins == "*" {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
            CorsLayer::new()
                .allow_methods(METHODS)
                .allow_origin(Any)
                .allow_headers(Any)
        } else {
            tracing::info!("CORS enabled for origins: {:?}", origins);
            CorsLayer::new()
                .allow_methods(METHODS)
                .allow_origin(origins)
                .allow_headers(Any)
        }
    };

    let community = Router::new()
        .route(
            "/suggestions",
            get(suggestions::list_suggestions).post(suggestions::create_suggestion),
        )
        .route("/suggestions/:id", get(suggestions::get_suggestion))
        .route("/suggestions/:id/status", put(suggestions::set_status))
        .route("/top", get(suggestions::top_suggestions))
        .route("/stats", get(suggestions::stats))
        .route("/mirror/:message_id", get(suggestions::get_by_mirror))
        .route("/authors/:user_id", get(suggestions::get_author))
        .route("/authors/:user_id/suggestions", get(suggestions::list_by_author))
        .route("/cooldown/:user_id", get(suggestions::cooldown))
        .route(
            "/blocks/:user_id",
            get(blocks::is_blocked)
                .put(blocks::block)
                .delete(blocks::unblock),
        )
        .route("/reactions", post(reactions::ingest_reaction))
        .route("/available", post(reactions::community_available));

    Router::new()
        .nest("/api/communities/:community", community)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
