//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::roster::PlayerId;
use crate::game::session::Session;
use crate::util::rate_limit::ConnectionRateLimiter;

use super::connection::Connection;
use super::frame::{MessageTag, ProtocolError};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Display name; the server picks one when absent
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query.name, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, name: Option<String>, state: AppState) {
    let (conn_id, player_id, mut outbox) = state.session.connect(name);
    info!(conn_id = %conn_id, player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer task: State frames -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if let Err(e) = ws_sink.send(Message::Binary(frame.to_vec())).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> incoming byte buffer -> player controls
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    let mut connection = Connection::accepting(MessageTag::Controls);

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Binary(data)) => {
                if !rate_limiter.check() {
                    warn!(conn_id = %conn_id, "Input rate limit exceeded, closing connection");
                    break;
                }
                connection.receive(&data);
                if let Err(e) = drain_controls(&mut connection, &state.session, player_id) {
                    warn!(conn_id = %conn_id, error = %e, "Protocol violation, closing connection");
                    break;
                }
            }
            Ok(Message::Text(_)) => {
                warn!(conn_id = %conn_id, "Received text message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.session.disconnect(conn_id);
    writer_handle.abort();

    info!(conn_id = %conn_id, player_id = %player_id, "WebSocket connection closed");
}

/// Decode every complete frame buffered so far into the player's controls.
/// Returns how many Controls frames were merged.
pub fn drain_controls(
    connection: &mut Connection,
    session: &Session,
    player_id: PlayerId,
) -> Result<usize, ProtocolError> {
    let mut merged = 0;
    while let Some(frame) = connection.next_frame()? {
        match frame.tag {
            MessageTag::Controls => {
                session.merge_controls(player_id, &frame.payload)?;
                merged += 1;
            }
            other => return Err(ProtocolError::UnexpectedMessage(other)),
        }
    }
    Ok(merged)
}
