use crate::error::GameError;
use crate::state::{RevealSummary, Standing};
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateGame {
        display_name: String,
        #[serde(default)]
        mode: GameMode,
        /// Falls back to the server default
        #[serde(default)]
        total_rounds: Option<u32>,
    },
    JoinGame {
        code: String,
        display_name: String,
    },
    SubmitClue {
        text: String,
    },
    SubmitVote {
        suspect_id: PlayerId,
    },
    /// Resend the full state of the joined game
    GetState,
    // Host-only messages
    StartGame,
    AdvanceToVoting,
    RevealAndScore,
    StartNextRound,
    EndGame,
    TransitionPhase {
        phase: GamePhase,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        /// None until the connection presents a valid session token
        user_id: Option<UserId>,
        server_now: String,
    },
    /// Sent to the caller after creating or joining a game
    GameJoined {
        game: Game,
        player: Player,
        is_host: bool,
        valid_transitions: Vec<GamePhase>,
    },
    /// Full snapshot of the joined game, e.g. after a reconnect
    GameState {
        game: Game,
        player: Option<Player>,
        players: Vec<Player>,
        /// The caller's private view of the current round
        round: Option<RoundView>,
        progress: Option<RoundProgress>,
        valid_transitions: Vec<GamePhase>,
    },
    Phase {
        phase: GamePhase,
        round_no: u32,
        total_rounds: u32,
        server_now: String,
        valid_transitions: Vec<GamePhase>,
    },
    /// Private: only ever sent to the player the view belongs to
    Round {
        round: RoundView,
    },
    Progress {
        progress: RoundProgress,
    },
    /// Players ordered by score
    Players {
        players: Vec<Player>,
    },
    Reveal {
        summary: RevealSummary,
        leaderboard: Vec<Standing>,
    },
    ClueAccepted {
        clue: Clue,
    },
    VoteAccepted {
        vote: Vote,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn phase(game: &Game, valid_transitions: Vec<GamePhase>) -> Self {
        ServerMessage::Phase {
            phase: game.phase,
            round_no: game.current_round,
            total_rounds: game.total_rounds,
            server_now: now_rfc3339(),
            valid_transitions,
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}
