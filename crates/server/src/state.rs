use engine::{Engine, ReactionSurface};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    // reaction counts are pulled from here when a community becomes available
    pub surface: Arc<dyn ReactionSurface>,
    pub admin_token: String,
}
