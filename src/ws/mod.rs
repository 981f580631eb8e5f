pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::feed::{ChangeEvent, GameSubscription};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::now_rfc3339;
use handlers::Connection;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session token from `POST /api/session`
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request (token present: {})",
        params.token.is_some()
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Serialize and send one message; false once the peer is gone
async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let identity = state.sessions.resolve(params.token.as_deref()).await;
    let mut conn = Connection::new(identity);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        user_id: conn.identity.current_user_id(),
        server_now: now_rfc3339(),
    };
    if !send(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    // Feed of the joined game; replaced whenever the connection switches games
    let mut subscription: Option<GameSubscription> = None;

    'conn: loop {
        tokio::select! {
            event = async {
                match &mut subscription {
                    Some(sub) => sub.recv().await,
                    None => std::future::pending::<Option<ChangeEvent>>().await,
                }
            } => {
                let Some(event) = event else {
                    subscription = None;
                    continue;
                };
                for msg in handlers::render_event(&event, &conn, &state).await {
                    if !send(&mut sender, &msg).await {
                        break 'conn;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &mut conn, &state).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        // Subscribe before replying; the snapshot covers what the
                        // feed published before the subscription existed
                        let snapshot =
                            handlers::follow_game(&conn, &mut subscription, &state).await;

                        for msg in response.iter().chain(snapshot.iter()) {
                            if !send(&mut sender, msg).await {
                                tracing::error!("Failed to send response");
                                break 'conn;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(
        "WebSocket connection closed (game {:?})",
        conn.game_id.as_deref()
    );
}
