/// WebSocket endpoint for the real-time relay
///
/// # Endpoint
///
/// `GET /v1/ws?token=<access token>` (or `Authorization: Bearer …`)
///
/// The handshake requires a valid bearer credential and is rejected
/// otherwise. After upgrade the server sends a `connected` frame carrying
/// the connection id; clients echo that id in the `x-connection-id` header
/// of REST mutations so their own broadcasts are not delivered back to
/// them.
///
/// # Client frames
///
/// - `join:board` / `leave:board`, `join:project` / `leave:project`:
///   room membership. Joining checks project membership at join time.
/// - `task:update`, `task:move`, `comment:new`: relay frames, i.e. an
///   already-applied mutation the server re-emits to the room as
///   `task:updated` / `task:moved` / `comment:added`. The relay carries no
///   state of its own; it never touches the database.
///
/// Delivery is at-most-once: lagged subscribers skip frames and a
/// disconnected client re-fetches board state on reconnect.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use corkboard_shared::auth::{access, jwt, middleware::extract_bearer_token};
use corkboard_shared::models::comment::Comment;
use corkboard_shared::models::task::Task;
use corkboard_shared::realtime::{BoardEvent, RoomId};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// How often to send WebSocket Ping frames
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong before considering the connection dead
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Outbound frames buffered per connection
const OUTBOUND_BUFFER: usize = 256;

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Access token; alternative to the Authorization header
    pub token: Option<String>,
}

/// Frames sent by clients
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data")]
enum ClientFrame {
    #[serde(rename = "join:board")]
    JoinBoard { board_id: Uuid },

    #[serde(rename = "leave:board")]
    LeaveBoard { board_id: Uuid },

    #[serde(rename = "join:project")]
    JoinProject { project_id: Uuid },

    #[serde(rename = "leave:project")]
    LeaveProject { project_id: Uuid },

    /// Relay: a task edit this client already applied via REST
    #[serde(rename = "task:update")]
    TaskUpdate { board_id: Uuid, task: Task },

    /// Relay: a move this client already applied via REST
    #[serde(rename = "task:move")]
    TaskMove {
        board_id: Uuid,
        task_id: Uuid,
        source_column_id: Uuid,
        dest_column_id: Uuid,
        dest_index: usize,
        version: i64,
    },

    /// Relay: a comment this client already created via REST
    #[serde(rename = "comment:new")]
    CommentNew {
        board_id: Uuid,
        task_id: Uuid,
        comment: Comment,
    },
}

/// Server status frames (room events are serialized [`BoardEvent`]s)
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data")]
enum ServerFrame {
    #[serde(rename = "connected")]
    Connected { connection_id: Uuid },

    #[serde(rename = "room:joined")]
    RoomJoined { room: RoomId },

    #[serde(rename = "room:left")]
    RoomLeft { room: RoomId },

    #[serde(rename = "error")]
    Error { message: String },
}

/// WebSocket upgrade handler
///
/// Authenticates before upgrading; an invalid or missing credential
/// rejects the handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = match query.token {
        Some(token) => token,
        None => extract_bearer_token(&headers)?.to_string(),
    };

    let claims = jwt::validate_access_token(&token, state.jwt_secret())?;
    let user_id = claims.sub;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let connection_id = Uuid::new_v4();
    tracing::debug!(connection_id = %connection_id, user_id = %user_id, "WebSocket connected");

    let (sender, receiver) = socket.split();
    let (forward_tx, forward_rx) = mpsc::channel::<Arc<str>>(OUTBOUND_BUFFER);

    let mut connection = Connection {
        state,
        user_id,
        connection_id,
        forward_tx,
        rooms: HashMap::new(),
    };

    run_socket_loop(&mut connection, sender, receiver, forward_rx).await;

    // Drop all room forwarders on disconnect.
    for (_, handle) in connection.rooms.drain() {
        handle.abort();
    }
    tracing::debug!(connection_id = %connection_id, "WebSocket disconnected");
}

struct Connection {
    state: AppState,
    user_id: Uuid,
    connection_id: Uuid,
    forward_tx: mpsc::Sender<Arc<str>>,
    /// Active room subscriptions and their forwarder tasks
    rooms: HashMap<RoomId, JoinHandle<()>>,
}

/// Core WebSocket loop with ping/pong keepalive
///
/// Combines room-event forwarding, client frame handling, and periodic
/// ping/pong health checking in a single select loop. If no Pong arrives
/// within [`PONG_TIMEOUT`] after a Ping, the connection is considered dead.
async fn run_socket_loop(
    connection: &mut Connection,
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut forward_rx: mpsc::Receiver<Arc<str>>,
) {
    // Tell the client its connection id for REST origin tagging.
    if send_frame(
        &mut sender,
        &ServerFrame::Connected {
            connection_id: connection.connection_id,
        },
    )
    .await
    .is_err()
    {
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            payload = forward_rx.recv() => {
                match payload {
                    Some(payload) => {
                        if sender.send(Message::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(frame) = parse_frame(&mut sender, &text).await {
                            handle_client_frame(connection, &mut sender, frame).await;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ignore Binary and client Pings (axum answers them)
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

async fn parse_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    text: &str,
) -> Option<ClientFrame> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            let _ = send_frame(
                sender,
                &ServerFrame::Error {
                    message: format!("Malformed frame: {}", e),
                },
            )
            .await;
            None
        }
    }
}

async fn handle_client_frame(
    connection: &mut Connection,
    sender: &mut SplitSink<WebSocket, Message>,
    frame: ClientFrame,
) {
    match frame {
        ClientFrame::JoinBoard { board_id } => {
            let allowed = access::require_board_member(
                &connection.state.db,
                board_id,
                connection.user_id,
            )
            .await
            .is_ok();
            join_room(connection, sender, RoomId::Board(board_id), allowed).await;
        }
        ClientFrame::JoinProject { project_id } => {
            let allowed = access::require_project_member(
                &connection.state.db,
                project_id,
                connection.user_id,
            )
            .await
            .is_ok();
            join_room(connection, sender, RoomId::Project(project_id), allowed).await;
        }
        ClientFrame::LeaveBoard { board_id } => {
            leave_room(connection, sender, RoomId::Board(board_id)).await;
        }
        ClientFrame::LeaveProject { project_id } => {
            leave_room(connection, sender, RoomId::Project(project_id)).await;
        }
        ClientFrame::TaskUpdate { board_id, task } => {
            relay(
                connection,
                sender,
                board_id,
                BoardEvent::TaskUpdated { board_id, task },
            )
            .await;
        }
        ClientFrame::TaskMove {
            board_id,
            task_id,
            source_column_id,
            dest_column_id,
            dest_index,
            version,
        } => {
            relay(
                connection,
                sender,
                board_id,
                BoardEvent::TaskMoved {
                    board_id,
                    task_id,
                    source_column_id,
                    dest_column_id,
                    dest_index,
                    version,
                },
            )
            .await;
        }
        ClientFrame::CommentNew {
            board_id,
            task_id,
            comment,
        } => {
            relay(
                connection,
                sender,
                board_id,
                BoardEvent::CommentAdded {
                    board_id,
                    task_id,
                    comment,
                },
            )
            .await;
        }
    }
}

async fn join_room(
    connection: &mut Connection,
    sender: &mut SplitSink<WebSocket, Message>,
    room: RoomId,
    allowed: bool,
) {
    if !allowed {
        let _ = send_frame(
            sender,
            &ServerFrame::Error {
                message: "Not authorized to join this room".to_string(),
            },
        )
        .await;
        return;
    }

    if connection.rooms.contains_key(&room) {
        return;
    }

    let mut rx = connection.state.rooms.subscribe(room);
    let tx = connection.forward_tx.clone();
    let own_id = connection.connection_id;

    // Forward room frames, dropping our own publications.
    let handle = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(publication) => {
                    if publication.origin == own_id {
                        continue;
                    }
                    if tx.send(publication.payload).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Room subscriber lagged, frames skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    connection.rooms.insert(room, handle);
    let _ = send_frame(sender, &ServerFrame::RoomJoined { room }).await;
}

async fn leave_room(
    connection: &mut Connection,
    sender: &mut SplitSink<WebSocket, Message>,
    room: RoomId,
) {
    if let Some(handle) = connection.rooms.remove(&room) {
        handle.abort();
        let _ = send_frame(sender, &ServerFrame::RoomLeft { room }).await;
    }
}

/// Re-emits an already-applied mutation to the board's room
///
/// Requires the connection to have joined the room (membership was checked
/// at join time). The sender is excluded through the origin id.
async fn relay(
    connection: &Connection,
    sender: &mut SplitSink<WebSocket, Message>,
    board_id: Uuid,
    event: BoardEvent,
) {
    let room = RoomId::Board(board_id);
    if !connection.rooms.contains_key(&room) {
        let _ = send_frame(
            sender,
            &ServerFrame::Error {
                message: "Join the board room before relaying events".to_string(),
            },
        )
        .await;
        return;
    }

    connection
        .state
        .broadcast(room, connection.connection_id, &event);
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server frame");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_parsing() {
        let board_id = Uuid::new_v4();
        let json = format!(r#"{{"type":"join:board","data":{{"board_id":"{}"}}}}"#, board_id);
        let frame: ClientFrame = serde_json::from_str(&json).unwrap();
        assert!(matches!(frame, ClientFrame::JoinBoard { board_id: id } if id == board_id));
    }

    #[test]
    fn test_task_move_relay_frame_parsing() {
        let json = serde_json::json!({
            "type": "task:move",
            "data": {
                "board_id": Uuid::new_v4(),
                "task_id": Uuid::new_v4(),
                "source_column_id": Uuid::new_v4(),
                "dest_column_id": Uuid::new_v4(),
                "dest_index": 3,
                "version": 9,
            }
        });
        let frame: ClientFrame = serde_json::from_value(json).unwrap();
        match frame {
            ClientFrame::TaskMove {
                dest_index,
                version,
                ..
            } => {
                assert_eq!(dest_index, 3);
                assert_eq!(version, 9);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame_is_rejected() {
        assert!(serde_json::from_str::<ClientFrame>("{\"type\":\"nope\"}").is_err());
    }

    #[test]
    fn test_server_frame_wire_format() {
        let frame = ServerFrame::Connected {
            connection_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "connected");
        assert_eq!(
            json["data"]["connection_id"],
            "00000000-0000-0000-0000-000000000000"
        );
    }
}
