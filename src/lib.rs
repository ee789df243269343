pub mod chat;
pub mod config;
pub mod db;
pub mod presence;

mod appresult;

use axum::{extract::FromRef, http::Method, Router};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use chat::ConversationService;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: ConversationService,
}

/// Builds the full HTTP surface: the chat socket plus CORS open to any origin.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .merge(chat::router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
