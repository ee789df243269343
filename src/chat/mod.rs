mod events;
mod service;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use events::{
    ClientEvent, ErrorPayload, IncomingMessage, OpenConversationPayload, RegisterPayload, SendMessagePayload,
    ServerEvent,
};
pub use service::{ConversationService, SendOutcome};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
}
