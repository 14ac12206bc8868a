use crate::domain::ports::Payload;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::hub::ConnectionHandle;
use crate::interface_adapters::protocol::parse_client_message;
use crate::interface_adapters::state::AppState;
use crate::use_cases::InboundEvent;
use crate::use_cases::presence::validate_name;

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::sync::Arc;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, serde::Deserialize)]
pub struct ConnectQuery {
    // Registers the connection right after the upgrade when present.
    #[serde(default)]
    name: Option<String>,
}

enum LoopControl {
    Continue,
    Disconnect,
}

struct ConnCtx {
    conn_id: String,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_msgs: u32,
    close_frame: Option<CloseFrame>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let name = query.name.filter(|name| !name.trim().is_empty());

    // Reject bad names before upgrading so the client gets a plain HTTP error.
    let name = match name.as_deref().map(validate_name).transpose() {
        Ok(name) => name,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.client_message(),
                }),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| {
        let conn_id = Uuid::new_v4().to_string();
        let span = info_span!("conn", conn_id = %conn_id, player = tracing::field::Empty);
        handle_socket(socket, state, conn_id, name).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    conn_id: String,
    name: Option<String>,
) {
    // Open the outbound queue before registering so the ack has somewhere to go.
    let mut handle = state.hub.open(&conn_id, state.outbound_capacity).await;
    let connections = state.hub.connection_count().await;
    info!(connections, "client connected");

    let mut ctx = ConnCtx {
        conn_id,
        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,
        invalid_msgs: 0,
        close_frame: None,
    };

    if let Some(name) = name {
        dispatch(&state, &ctx.conn_id, InboundEvent::Register { name }).await;
    }

    run_client_loop(&mut socket, &state, &mut handle, &mut ctx).await;

    // The queue stays open until teardown is done so sends to it never report `Gone`.
    finish_connection(&state, &ctx.conn_id).await;
    drop(handle);

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_msgs = ctx.invalid_msgs,
        "connection stats"
    );
    info!("client disconnected");
}

async fn run_client_loop(
    socket: &mut WebSocket,
    state: &AppState,
    handle: &mut ConnectionHandle,
    ctx: &mut ConnCtx,
) {
    let ConnectionHandle { outbound, shutdown } = handle;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(state, incoming, ctx).await {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            // Replies and broadcasts queued by the dispatcher.
            Some(payload) = outbound.recv() => {
                match forward_payload(payload, socket, ctx).await {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            // A newer connection registered the same player name.
            _ = shutdown.notified() => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                });
                info!("connection replaced by newer session");
                true
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }
}

async fn handle_incoming_ws(
    state: &AppState,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match parse_client_message(&text) {
                    Ok(event) => {
                        dispatch(state, &ctx.conn_id, event).await;
                        LoopControl::Continue
                    }
                    Err(err) => {
                        ctx.invalid_msgs += 1;
                        warn!(bytes = text.len(), error = %err, "failed to parse client message");
                        state.dispatcher.reject(&ctx.conn_id, &err).await;

                        if ctx.invalid_msgs > state.max_invalid_messages {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return LoopControl::Disconnect;
                        }
                        LoopControl::Continue
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                LoopControl::Disconnect
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(_) => LoopControl::Disconnect,
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            info!("websocket closed");
            LoopControl::Disconnect
        }
    }
}

// Marks the player offline while the outbox is still registered, so a concurrent broadcast
// cannot see this connection as gone and release it before `playerLeft` goes out.
async fn finish_connection(state: &AppState, conn_id: &str) {
    dispatch(state, conn_id, InboundEvent::Disconnect).await;
    state.hub.remove(conn_id).await;
}

// Runs one event and applies its transport-level side effects.
async fn dispatch(state: &AppState, conn_id: &str, event: InboundEvent) {
    let registering = match &event {
        InboundEvent::Register { name } => Some(name.trim().to_string()),
        _ => None,
    };

    // Errors were already answered to the client and logged by the dispatcher.
    let Ok(summary) = state.dispatcher.dispatch(conn_id, event).await else {
        return;
    };

    if let Some(name) = registering {
        Span::current().record("player", name.as_str());
    }
    if let Some(old) = summary.superseded
        && !state.hub.close(&old).await
    {
        debug!(old_connection = %old, "superseded connection is not on this server");
    }
}

async fn forward_payload(payload: Payload, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = payload.len();
    match socket.send(Message::Text(payload.as_ref().into())).await {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send message");
            LoopControl::Disconnect
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PlayerStore;
    use crate::domain::systems::movement::{Direction, MoveCommand};
    use crate::interface_adapters::hub::ConnectionHub;
    use crate::interface_adapters::protocol::JsonEncoder;
    use crate::interface_adapters::state::{InMemoryPlayerStore, SystemClock};
    use crate::use_cases::{DispatcherSettings, EventDispatcher};
    use serde_json::Value;

    fn build_state(store: InMemoryPlayerStore) -> AppState {
        let hub = ConnectionHub::new();
        let dispatcher = EventDispatcher::new(
            store,
            hub.clone(),
            SystemClock,
            JsonEncoder,
            DispatcherSettings::default(),
        );
        AppState {
            dispatcher: Arc::new(dispatcher),
            hub,
            outbound_capacity: 8,
            max_invalid_messages: 10,
        }
    }

    fn drain(handle: &mut ConnectionHandle) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(payload) = handle.outbound.try_recv() {
            frames.push(serde_json::from_str(&payload).expect("frame should be json"));
        }
        frames
    }

    fn register(name: &str) -> InboundEvent {
        InboundEvent::Register {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn when_connection_finishes_then_others_hear_player_left_and_the_outbox_is_removed() {
        let store = InMemoryPlayerStore::new();
        let state = build_state(store.clone());
        let _alice_handle = state.hub.open("conn-a", 8).await;
        let mut bob_handle = state.hub.open("conn-b", 8).await;
        dispatch(&state, "conn-a", register("Alice")).await;
        dispatch(&state, "conn-b", register("Bob")).await;
        drain(&mut bob_handle);

        finish_connection(&state, "conn-a").await;

        let to_bob = drain(&mut bob_handle);
        assert_eq!(to_bob.len(), 1);
        assert_eq!(to_bob[0]["action"], "playerLeft");
        assert_eq!(to_bob[0]["name"], "Alice");
        assert_eq!(state.hub.connection_count().await, 1);
        let alice = store.get("Alice").await.expect("get").expect("alice stored");
        assert!(!alice.online);
        assert_eq!(alice.connection_id, None);
    }

    #[tokio::test]
    async fn when_broadcast_races_a_finishing_connection_then_player_left_still_goes_out() {
        let store = InMemoryPlayerStore::new();
        let state = build_state(store.clone());
        let _alice_handle = state.hub.open("conn-a", 8).await;
        let mut bob_handle = state.hub.open("conn-b", 8).await;
        dispatch(&state, "conn-a", register("Alice")).await;
        dispatch(&state, "conn-b", register("Bob")).await;
        drain(&mut bob_handle);

        // Alice's socket loop has ended but her queue is still held; a broadcast now
        // must be delivered, not treated as a stale connection.
        dispatch(
            &state,
            "conn-b",
            InboundEvent::MovePlayer {
                name: "Bob".to_string(),
                command: MoveCommand::Step(Direction::Right),
            },
        )
        .await;
        assert!(store.get("Alice").await.expect("get").expect("alice stored").online);

        finish_connection(&state, "conn-a").await;

        let left: Vec<Value> = drain(&mut bob_handle)
            .into_iter()
            .filter(|frame| frame["action"] == "playerLeft")
            .collect();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["name"], "Alice");
    }
}
