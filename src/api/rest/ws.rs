use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::matching::MatchEvent;
use crate::state::AppState;

/// Optional subscription scope. A carrier app passes its carrier id, a
/// requester app its requester id; an unscoped connection sees the full
/// event stream.
#[derive(Deserialize, Default)]
pub struct WsScope {
    pub carrier_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
}

impl WsScope {
    fn wants(&self, event: &MatchEvent) -> bool {
        if self.carrier_id.is_none() && self.requester_id.is_none() {
            return true;
        }
        if let Some(carrier_id) = self.carrier_id {
            if event.carrier_id == Some(carrier_id) {
                return true;
            }
        }
        if let Some(requester_id) = self.requester_id {
            if event.requester_id == requester_id {
                return true;
            }
        }
        false
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(scope): Query<WsScope>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, scope))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, scope: WsScope) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.events_tx.subscribe();

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if !scope.wants(&event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize match event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}
