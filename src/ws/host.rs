//! Host command handlers
//!
//! Every handler here goes through a phase transition. The game core checks
//! that the caller hosts the game; a non-host gets `NOT_AUTHORIZED` back.

use crate::auth::IdentityProvider;
use crate::error::GameResult;
use crate::protocol::ServerMessage;
use crate::state::{valid_transitions, AppState, TransitionOutcome};
use crate::types::GamePhase;
use std::sync::Arc;

/// Reply to the host with the new phase, or the error
fn phase_reply(result: GameResult<TransitionOutcome>) -> Option<ServerMessage> {
    match result {
        Ok(outcome) => Some(ServerMessage::phase(
            &outcome.game,
            valid_transitions(&outcome.game),
        )),
        Err(e) => {
            tracing::info!("Host command rejected: {}", e);
            Some(e.into())
        }
    }
}

pub async fn handle_start_game(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> Option<ServerMessage> {
    tracing::info!("Host starting game {}", game_id);
    phase_reply(state.start_game(identity, game_id).await)
}

pub async fn handle_advance_to_voting(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> Option<ServerMessage> {
    phase_reply(state.advance_to_voting(identity, game_id).await)
}

pub async fn handle_reveal_and_score(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> Option<ServerMessage> {
    phase_reply(state.reveal_and_score(identity, game_id).await)
}

pub async fn handle_start_next_round(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> Option<ServerMessage> {
    phase_reply(state.start_next_round(identity, game_id).await)
}

pub async fn handle_end_game(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
) -> Option<ServerMessage> {
    tracing::info!("Host ending game {}", game_id);
    phase_reply(state.end_game(identity, game_id).await)
}

pub async fn handle_transition_phase(
    state: &Arc<AppState>,
    identity: &dyn IdentityProvider,
    game_id: &str,
    phase: GamePhase,
) -> Option<ServerMessage> {
    phase_reply(state.transition_phase(identity, game_id, phase).await)
}
