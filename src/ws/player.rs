//! Player message handlers
//!
//! Creating and joining games, clue and vote submission, and state recovery.

use crate::auth::IdentityProvider;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::state::{valid_transitions, AppState};
use crate::types::*;
use crate::ws::handlers::Connection;
use std::sync::Arc;

pub async fn handle_create_game(
    state: &Arc<AppState>,
    conn: &mut Connection,
    display_name: String,
    mode: GameMode,
    total_rounds: Option<u32>,
) -> Option<ServerMessage> {
    match state
        .create_game(&conn.identity, &display_name, mode, total_rounds)
        .await
    {
        Ok((game, player)) => {
            conn.game_id = Some(game.id.clone());
            let valid_transitions = valid_transitions(&game);
            Some(ServerMessage::GameJoined {
                game,
                player,
                is_host: true,
                valid_transitions,
            })
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_join_game(
    state: &Arc<AppState>,
    conn: &mut Connection,
    code: String,
    display_name: String,
) -> Option<ServerMessage> {
    tracing::info!("Join request for code {}", code);
    match state.join_game(&conn.identity, &code, &display_name).await {
        Ok((game, player)) => {
            conn.game_id = Some(game.id.clone());
            let valid_transitions = valid_transitions(&game);
            Some(ServerMessage::GameJoined {
                is_host: player.is_host,
                game,
                player,
                valid_transitions,
            })
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_submit_clue(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
    text: String,
) -> Option<ServerMessage> {
    match state.submit_clue(identity, game_id, &text).await {
        Ok(clue) => Some(ServerMessage::ClueAccepted { clue }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_submit_vote(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
    suspect_id: PlayerId,
) -> Option<ServerMessage> {
    match state.submit_vote(identity, game_id, &suspect_id).await {
        Ok(vote) => Some(ServerMessage::VoteAccepted { vote }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_get_state(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> Option<ServerMessage> {
    Some(
        game_state(state, identity, game_id)
            .await
            .unwrap_or_else(ServerMessage::from),
    )
}

async fn game_state(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> GameResult<ServerMessage> {
    let game = state
        .get_game(game_id)
        .await?
        .ok_or_else(|| GameError::NotFound("Game".to_string()))?;
    let player = state.get_current_player(identity, game_id).await?;
    let players = state.get_players(game_id).await?;

    // Words stay hidden from anyone without a seat
    let round = match (&player, game.phase) {
        (Some(_), GamePhase::Clue | GamePhase::Voting | GamePhase::Reveal) => {
            Some(state.get_round_view(identity, game_id).await?)
        }
        _ => None,
    };
    let progress = state.get_progress(game_id).await?;

    Ok(ServerMessage::GameState {
        valid_transitions: valid_transitions(&game),
        game,
        player,
        players,
        round,
        progress,
    })
}
