//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::room::{Outbox, RoomError};
use crate::game::PlayerIdentity;
use crate::http::middleware::verify_jwt;
use crate::lobby::RoomRegistry;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::ingress::{sanitize_input, sanitize_join_code, MAX_FRAME_BYTES};
use crate::ws::protocol::{ClientMsg, ConnectionId, ServerMsg};

/// Per-connection outbound queue depth
pub const OUTBOX_CAPACITY: usize = 256;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT issued by the account service
    pub token: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    match verify_jwt(&query.token, &state.config.jwt_secret) {
        Ok(claims) => {
            let identity = claims.into_identity();
            info!(account_id = %identity.account_id, "WebSocket upgrade for authenticated user");
            ws.max_message_size(16 * MAX_FRAME_BYTES)
                .on_upgrade(move |socket| handle_socket(socket, identity, state))
        }
        Err(e) => {
            warn!(error = %e, "WebSocket auth failed");
            e.into_response()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, identity: PlayerIdentity, state: AppState) {
    let conn: ConnectionId = Uuid::new_v4();
    info!(conn = %conn, name = %identity.display_name, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        connection_id: conn,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(conn = %conn, error = %e, "Failed to send welcome");
        return;
    }

    let (outbox, outbox_rx) = mpsc::channel::<ServerMsg>(OUTBOX_CAPACITY);
    let session = Session {
        conn,
        identity,
        outbox,
        registry: state.registry.clone(),
        limiter: ConnectionRateLimiter::new(state.config.input_rate_limit),
    };

    run_session(session, ws_sink, ws_stream, outbox_rx).await;

    info!(conn = %conn, "WebSocket connection closed");
}

/// Everything the reader loop needs to act for one connection
struct Session {
    conn: ConnectionId,
    identity: PlayerIdentity,
    outbox: Outbox,
    registry: Arc<RoomRegistry>,
    limiter: ConnectionRateLimiter,
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session: Session,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbox_rx: mpsc::Receiver<ServerMsg>,
) {
    let conn = session.conn;

    // Writer task: room messages -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn = %conn, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> registry
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if text.len() > MAX_FRAME_BYTES {
                    warn!(conn = %conn, bytes = text.len(), "Oversized frame dropped");
                    continue;
                }
                if !session.limiter.check() {
                    warn!(conn = %conn, "Rate limited inbound message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => session.dispatch(msg),
                    Err(e) => {
                        debug!(conn = %conn, error = %e, "Ignoring unparsable client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(conn = %conn, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn = %conn, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(conn = %conn, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Disconnect is an implicit leave
    session.registry.leave_room(&conn);
    writer_handle.abort();
}

impl Session {
    fn dispatch(&self, msg: ClientMsg) {
        match msg {
            ClientMsg::CreateRoom => {
                let result = self.registry.create_room(
                    self.conn,
                    self.identity.clone(),
                    self.outbox.clone(),
                );
                if let Err(e) = result {
                    self.reject(e);
                }
            }
            ClientMsg::JoinRoom { code } => {
                let code = sanitize_join_code(code.as_ref());
                let result = self.registry.join_room(
                    self.conn,
                    &code,
                    self.identity.clone(),
                    self.outbox.clone(),
                );
                if let Err(e) = result {
                    info!(conn = %self.conn, room = %code, error = %e, "Join rejected");
                    self.reject(e);
                }
            }
            ClientMsg::Input(raw) => {
                self.registry.route_input(&self.conn, &sanitize_input(&raw));
            }
            ClientMsg::LeaveRoom => self.registry.leave_room(&self.conn),
            ClientMsg::Ping { t } => self.reply(ServerMsg::Pong { t }),
        }
    }

    fn reject(&self, e: RoomError) {
        self.reply(ServerMsg::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        });
    }

    fn reply(&self, msg: ServerMsg) {
        if let Err(TrySendError::Full(_)) = self.outbox.try_send(msg) {
            warn!(conn = %self.conn, "Outbound queue full, dropping reply");
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomSettings;
    use crate::game::room::tests::{drain, identity};
    use serde_json::json;

    fn session() -> (Session, mpsc::Receiver<ServerMsg>) {
        let (results_tx, _results_rx) = mpsc::channel(4);
        let (outbox, rx) = mpsc::channel(16);
        let session = Session {
            conn: Uuid::new_v4(),
            identity: identity("tester"),
            outbox,
            registry: Arc::new(RoomRegistry::new(RoomSettings::default(), results_tx)),
            limiter: ConnectionRateLimiter::new(10),
        };
        (session, rx)
    }

    #[test]
    fn test_ping_gets_pong() {
        let (session, mut rx) = session();
        session.dispatch(ClientMsg::Ping { t: 42 });
        let msgs = drain(&mut rx);
        assert!(matches!(msgs.as_slice(), [ServerMsg::Pong { t: 42 }]));
    }

    #[test]
    fn test_garbage_join_code_is_not_found() {
        let (session, mut rx) = session();
        session.dispatch(ClientMsg::JoinRoom {
            code: Some(json!({ "nested": true })),
        });
        let msgs = drain(&mut rx);
        assert!(matches!(msgs.as_slice(), [ServerMsg::Error { code, .. }] if code == "not_found"));
    }

    #[test]
    fn test_create_then_join_by_lowercase_code() {
        let (host, mut host_rx) = session();
        host.dispatch(ClientMsg::CreateRoom);
        let code = match &drain(&mut host_rx)[0] {
            ServerMsg::RoomCreated { code, .. } => code.clone(),
            other => panic!("unexpected {other:?}"),
        };

        let (outbox, mut guest_rx) = mpsc::channel(16);
        let guest = Session {
            conn: Uuid::new_v4(),
            identity: identity("guest"),
            outbox,
            registry: host.registry.clone(),
            limiter: ConnectionRateLimiter::new(10),
        };
        // Scheduler spawn needs a runtime
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            guest.dispatch(ClientMsg::JoinRoom {
                code: Some(json!(format!(" {} ", code.to_lowercase()))),
            });
        });

        let msgs = drain(&mut guest_rx);
        assert!(matches!(&msgs[0], ServerMsg::RoomJoined { code: c, name } if *c == code && name == "guest"));
        assert_eq!(host.registry.active_players(), 2);
    }
}
