use serde::{Deserialize, Serialize};

use crate::{db::Message, AppResult};

/// Frames a client may send, as `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Register(RegisterPayload),
    #[serde(alias = "openChat")]
    OpenConversation(OpenConversationPayload),
    SendMessage(SendMessagePayload),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterPayload {
    #[serde(alias = "userId")]
    pub identity: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationPayload {
    pub user_id: String,
    pub contact_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
}

impl ClientEvent {
    pub fn from_slice(frame: &[u8]) -> AppResult<Self> {
        Ok(serde_json::from_slice(frame)?)
    }
}

/// Frames the server pushes to a single connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ChatHistory(Vec<Message>),
    ReceiveMessage(IncomingMessage),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub sender_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload { message: message.into() })
    }

    pub fn to_frame(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
