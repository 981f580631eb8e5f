//! WebSocket message dispatch
//!
//! Entry point for client messages and for turning change feed events into
//! per-connection server messages. Host authority is enforced by the game
//! core, so dispatch only needs to know which game the connection joined.

use crate::auth::SessionIdentity;
use crate::feed::{ChangeEvent, GameSubscription, Record};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{valid_transitions, AppState};
use crate::types::*;
use std::sync::Arc;

use super::{host, player};

/// Per-connection context
#[derive(Debug, Clone)]
pub struct Connection {
    pub identity: SessionIdentity,
    /// Game this connection created or joined
    pub game_id: Option<GameId>,
}

impl Connection {
    pub fn new(identity: SessionIdentity) -> Self {
        Self {
            identity,
            game_id: None,
        }
    }
}

/// Macro to fetch the connection's game and return early if it has none
macro_rules! joined_game {
    ($conn:expr) => {
        match $conn.game_id.clone() {
            Some(game_id) => game_id,
            None => {
                return Some(ServerMessage::Error {
                    code: "NO_GAME".to_string(),
                    msg: "Create or join a game first".to_string(),
                })
            }
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateGame {
            display_name,
            mode,
            total_rounds,
        } => player::handle_create_game(state, conn, display_name, mode, total_rounds).await,

        ClientMessage::JoinGame { code, display_name } => {
            player::handle_join_game(state, conn, code, display_name).await
        }

        ClientMessage::SubmitClue { text } => {
            let game_id = joined_game!(conn);
            player::handle_submit_clue(state, &conn.identity, &game_id, text).await
        }

        ClientMessage::SubmitVote { suspect_id } => {
            let game_id = joined_game!(conn);
            player::handle_submit_vote(state, &conn.identity, &game_id, suspect_id).await
        }

        ClientMessage::GetState => {
            let game_id = joined_game!(conn);
            player::handle_get_state(state, &conn.identity, &game_id).await
        }

        // Host commands
        ClientMessage::StartGame => {
            let game_id = joined_game!(conn);
            host::handle_start_game(state, &conn.identity, &game_id).await
        }

        ClientMessage::AdvanceToVoting => {
            let game_id = joined_game!(conn);
            host::handle_advance_to_voting(state, &conn.identity, &game_id).await
        }

        ClientMessage::RevealAndScore => {
            let game_id = joined_game!(conn);
            host::handle_reveal_and_score(state, &conn.identity, &game_id).await
        }

        ClientMessage::StartNextRound => {
            let game_id = joined_game!(conn);
            host::handle_start_next_round(state, &conn.identity, &game_id).await
        }

        ClientMessage::EndGame => {
            let game_id = joined_game!(conn);
            host::handle_end_game(state, &conn.identity, &game_id).await
        }

        ClientMessage::TransitionPhase { phase } => {
            let game_id = joined_game!(conn);
            host::handle_transition_phase(state, &conn.identity, &game_id, phase).await
        }
    }
}

/// Point `subscription` at the connection's game.
///
/// On a switch, returns the current player list: joins published between the
/// game being joined and the subscription starting are otherwise missed.
pub async fn follow_game(
    conn: &Connection,
    subscription: &mut Option<GameSubscription>,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let game_id = conn.game_id.as_ref()?;
    if subscription.as_ref().map(|s| s.game_id()) == Some(game_id) {
        return None;
    }
    *subscription = Some(state.feed.subscribe(game_id));

    match state.get_players(game_id).await {
        Ok(players) => Some(ServerMessage::Players { players }),
        Err(e) => {
            tracing::warn!("Could not load players for game {}: {}", game_id, e);
            None
        }
    }
}

/// Messages a connection should receive for a change in its game.
///
/// Raw records are never forwarded: rounds carry both words and the odd
/// player, so each connection only gets its own view of a round.
pub async fn render_event(
    event: &ChangeEvent,
    conn: &Connection,
    state: &Arc<AppState>,
) -> Vec<ServerMessage> {
    let mut out = Vec::new();

    match &event.record {
        Record::Game(game) => {
            out.push(ServerMessage::phase(game, valid_transitions(game)));

            match game.phase {
                GamePhase::Clue => match state.get_round_view(&conn.identity, &game.id).await {
                    Ok(round) => out.push(ServerMessage::Round { round }),
                    // Spectators and players without a seat this round
                    Err(e) => tracing::debug!("No round view for connection: {}", e),
                },
                GamePhase::Reveal => {
                    match (
                        state.reveal_summary(&game.id).await,
                        state.leaderboard(&game.id).await,
                    ) {
                        (Ok(summary), Ok(leaderboard)) => {
                            out.push(ServerMessage::Reveal {
                                summary,
                                leaderboard,
                            })
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            tracing::warn!("Could not build reveal for game {}: {}", game.id, e)
                        }
                    }
                }
                GamePhase::Finished => {
                    if let Ok(players) = state.get_players(&game.id).await {
                        out.push(ServerMessage::Players { players });
                    }
                }
                GamePhase::Lobby | GamePhase::Voting => {}
            }
        }

        // Announced through the game update that commits with it
        Record::Round(_) => {}

        Record::Clue(_) | Record::Vote(_) => match state.get_progress(&event.game_id).await {
            Ok(Some(progress)) => out.push(ServerMessage::Progress { progress }),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not load progress: {}", e),
        },

        Record::Player(_) => match state.get_players(&event.game_id).await {
            Ok(players) => out.push(ServerMessage::Players { players }),
            Err(e) => tracing::warn!("Could not load players: {}", e),
        },
    }

    out
}
