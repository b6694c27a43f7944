//! WebSocket upgrade handler for the push channel.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Read the caller's identity from the query string
//! 2. Upgrade to WebSocket
//! 3. Register a handle and join the caller's user room
//! 4. Forward outbound messages and process join/leave/signal/ping
//! 5. Disconnect the handle from every room on teardown

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::domain::foundation::{DomainError, ErrorCode, Role, Timestamp, UserId};
use crate::domain::sync::Room;
use crate::ports::ConversationRepository;

use super::{
    messages::{ClientMessage, ConnectedMessage, RoomAck, ServerMessage},
    rooms::{HandleId, RoomRegistry},
    signaling::{RelayOutcome, SignalingRelay},
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<RoomRegistry>,
    pub relay: SignalingRelay,
    pub conversations: Arc<dyn ConversationRepository>,
}

impl WebSocketState {
    pub fn new(
        registry: Arc<RoomRegistry>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            relay: SignalingRelay::new(Arc::clone(&registry)),
            registry,
            conversations,
        }
    }
}

/// Identity supplied at connect time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub user_id: String,
    pub role: Role,
}

/// Checks whether `user` may subscribe to `room`.
///
/// - a user room only by its owner
/// - a conversation room only by a participant
/// - the vehicle-requests feed only by officers and admins
pub async fn authorize_join(
    conversations: &dyn ConversationRepository,
    user: &UserId,
    role: Role,
    room: &Room,
) -> Result<(), DomainError> {
    match room {
        Room::User(owner) if owner == user => Ok(()),
        Room::User(_) => Err(DomainError::new(
            ErrorCode::Forbidden,
            "Cannot join another user's room",
        )),
        Room::VehicleRequests if role.follows_vehicle_requests() => Ok(()),
        Room::VehicleRequests => Err(DomainError::new(
            ErrorCode::Forbidden,
            "Only officers and admins follow vehicle requests",
        )),
        Room::Conversation(id) => {
            let conversation = conversations.find_conversation(id).await?.ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ConversationNotFound,
                    format!("Conversation {} not found", id),
                )
            })?;
            conversation.ensure_participant(user)
        }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws?userId=<id>&role=<admin|officer|resident>`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<WebSocketState>,
) -> Response {
    let user = match UserId::new(params.user_id) {
        Ok(user) => user,
        Err(_) => {
            return (axum::http::StatusCode::BAD_REQUEST, "Invalid user id").into_response();
        }
    };
    let role = params.role;

    ws.on_upgrade(move |socket| handle_socket(socket, user, role, state))
}

/// Handle an established WebSocket connection until either side closes.
async fn handle_socket(socket: WebSocket, user: UserId, role: Role, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let (handle, mut outbound) = state.registry.register(user.clone()).await;
    state.registry.subscribe(&Room::user(&user), &handle).await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        handle_id: handle.to_string(),
        user_id: user.clone(),
        rooms: state.registry.rooms_of(&handle).await,
        timestamp: Timestamp::now().to_rfc3339(),
    });
    if let Err(e) = send_message(&mut sender, &connected).await {
        tracing::debug!(handle_id = %handle, "Failed to send connected message: {}", e);
        state.registry.disconnect(&handle).await;
        return;
    }
    tracing::info!(handle_id = %handle, user_id = %user, role = %role, "Push client connected");

    // Forward everything queued for this handle. Ends when the registry
    // drops the handle's sender (disconnect or hub stop).
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = send_message(&mut sender, &message).await {
                tracing::debug!(handle_id = %handle, "Send error, closing connection: {}", e);
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_user = user.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => {
                            handle_client_message(&recv_state, handle, &recv_user, role, message)
                                .await
                        }
                        Err(e) => Some(ServerMessage::error(
                            ErrorCode::ValidationFailed.to_string(),
                            format!("Malformed message: {}", e),
                        )),
                    };
                    if let Some(reply) = reply {
                        recv_state.registry.send_direct(&handle, reply).await;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(handle_id = %handle, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(handle_id = %handle, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(handle_id = %handle, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let left = state.registry.disconnect(&handle).await;
    tracing::info!(handle_id = %handle, rooms = left.len(), "Push client disconnected");
}

/// Processes one client message, returning the direct reply if any.
async fn handle_client_message(
    state: &WebSocketState,
    handle: HandleId,
    user: &UserId,
    role: Role,
    message: ClientMessage,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::Join { room } => {
            if let Err(err) = authorize_join(state.conversations.as_ref(), user, role, &room).await
            {
                tracing::debug!(handle_id = %handle, room = %room, "Join refused: {}", err);
                return Some(err.into());
            }
            if !state.registry.subscribe(&room, &handle).await {
                tracing::warn!(handle_id = %handle, room = %room, "Join on unregistered handle");
                return Some(ServerMessage::error(
                    ErrorCode::InternalError.to_string(),
                    format!("Connection is not registered; could not join {}", room),
                ));
            }
            Some(ServerMessage::Joined(RoomAck { room }))
        }
        ClientMessage::Leave { room } => {
            state.registry.unsubscribe(&room, &handle).await;
            Some(ServerMessage::Left(RoomAck { room }))
        }
        ClientMessage::Signal { target, payload } => {
            if let RelayOutcome::NoTarget = state.relay.relay(user, &target, payload).await {
                tracing::debug!(handle_id = %handle, target = %target, "Signal not delivered");
            }
            None
        }
        ClientMessage::Ping => Some(ServerMessage::pong()),
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the push endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}
