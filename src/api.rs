//! HTTP API endpoints.
//!
//! Sessions for websocket clients, a public lookup of games by join code and
//! a health check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Session;
use crate::error::GameError;
use crate::state::AppState;
use crate::types::*;

/// Public view of a game, safe to show before joining
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub code: String,
    pub mode: GameMode,
    pub phase: GamePhase,
    pub current_round: u32,
    pub total_rounds: u32,
    pub players: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Routes under `/api` plus `/healthz`
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", post(create_session))
        .route("/api/games/{code}", get(get_game_summary))
        .route("/healthz", get(healthz))
}

/// Mint an anonymous session.
///
/// POST /api/session
pub async fn create_session(State(state): State<Arc<AppState>>) -> Json<Session> {
    Json(state.sessions.issue().await)
}

/// Look up a game by join code.
///
/// GET /api/games/{code}
pub async fn get_game_summary(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<GameSummary>, GameError> {
    let game = state
        .get_game_by_code(&code)
        .await?
        .ok_or_else(|| GameError::NotFound("Game".to_string()))?;
    let players = state.get_players(&game.id).await?.len();

    Ok(Json(GameSummary {
        code: game.code,
        mode: game.mode,
        phase: game.phase,
        current_round: game.current_round,
        total_rounds: game.total_rounds,
        players,
    }))
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionIdentity;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        routes().with_state(state)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = app(Arc::new(AppState::new()))
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_session_is_resolvable() {
        let state = Arc::new(AppState::new());
        let response = app(state.clone())
            .oneshot(Request::post("/api/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let token = body["token"].as_str().unwrap();
        let identity = state.sessions.resolve(Some(token)).await;
        assert_eq!(
            identity,
            SessionIdentity::user(body["user_id"].as_str().unwrap())
        );
    }

    #[tokio::test]
    async fn test_game_summary_by_code() {
        let state = Arc::new(AppState::new());
        let (game, _) = state
            .create_game(&SessionIdentity::user("u1"), "Ann", GameMode::Classic, Some(4))
            .await
            .unwrap();

        let uri = format!("/api/games/{}", game.code.to_lowercase());
        let response = app(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["code"], game.code.as_str());
        assert_eq!(body["phase"], "lobby");
        assert_eq!(body["total_rounds"], 4);
        assert_eq!(body["players"], 1);
    }

    #[tokio::test]
    async fn test_unknown_code_is_404() {
        let response = app(Arc::new(AppState::new()))
            .oneshot(Request::get("/api/games/NOPE22").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_FOUND");
    }
}
