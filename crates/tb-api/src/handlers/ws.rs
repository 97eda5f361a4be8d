//! WebSocket upgrade endpoint

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::state::AppState;

/// GET /ws
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let broadcaster = state.broadcaster.clone();
    let send_buffer = state.realtime_send_buffer;
    ws.on_upgrade(move |socket| tb_realtime::ws::handle_socket(socket, broadcaster, send_buffer))
}
