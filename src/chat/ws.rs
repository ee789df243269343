use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::task::{JoinError, JoinSet};

use crate::presence::ConnectionHandle;

use super::{
    events::{ClientEvent, OpenConversationPayload, RegisterPayload, SendMessagePayload, ServerEvent},
    ConversationService,
};

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    State(service): State<ConversationService>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve_connection(service, stream))
}

async fn serve_connection(service: ConversationService, stream: WebSocket) {
    let (connection, mut outbound) = ConnectionHandle::open();
    let (mut sender, mut receiver) = stream.split();
    tracing::info!(connection = %connection.id(), "client connected");

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::error!(%err, "failed to encode outbound event");
                    continue;
                }
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Each event runs in its own task so a slow store call never holds up
    // later frames from the same socket.
    let mut handlers = JoinSet::new();
    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                log_join(joined);
                continue;
            }
        };
        let Some(Ok(msg)) = msg else {
            break;
        };

        let parsed = match &msg {
            Message::Text(text) => ClientEvent::from_slice(text.as_str().as_bytes()),
            Message::Binary(bytes) => ClientEvent::from_slice(bytes),
            Message::Close(_) => break,
            _ => continue,
        };

        match parsed {
            Ok(event) => {
                let service = service.clone();
                let connection = connection.clone();
                handlers.spawn(async move { dispatch(&service, &connection, event).await });
            }
            Err(err) => {
                tracing::warn!(%err, connection = %connection.id(), "rejected malformed frame");
                if let Err(err) = connection.push(ServerEvent::error(err.to_string())) {
                    tracing::debug!(%err, "error event not delivered");
                }
            }
        }
    }

    service.disconnect(&connection).await;
    writer.abort();

    // A register still in flight could re-add this handle after the cleanup
    // above, so sweep once more when the stragglers finish.
    if !handlers.is_empty() {
        tokio::spawn(async move {
            while let Some(joined) = handlers.join_next().await {
                log_join(joined);
            }
            service.disconnect(&connection).await;
        });
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        tracing::error!(%err, "event handler panicked");
    }
}

/// Runs one inbound event to completion. Store failures end here: they are
/// logged and the client gets no reply.
async fn dispatch(service: &ConversationService, connection: &ConnectionHandle, event: ClientEvent) {
    match event {
        ClientEvent::Register(RegisterPayload { identity, role }) => {
            service.register(connection, identity, role).await;
        }
        ClientEvent::OpenConversation(OpenConversationPayload { user_id, contact_id }) => {
            if let Err(err) = service.open_conversation(connection, &user_id, &contact_id).await {
                tracing::error!(%err, %user_id, %contact_id, "failed to load chat history");
            }
        }
        ClientEvent::SendMessage(SendMessagePayload { sender_id, receiver_id, message }) => {
            if let Err(err) = service.send_message(&sender_id, &receiver_id, &message).await {
                tracing::error!(%err, %sender_id, %receiver_id, "failed to store message");
            }
        }
    }
}
