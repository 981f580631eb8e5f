use crate::store::StoreError;
use crate::types::GamePhase;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Everything a game operation can reject with.
/// Precondition failures are never partially applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Only the host can do that")]
    NotAuthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid phase transition from {from} to {to}")]
    IllegalTransition { from: GamePhase, to: GamePhase },

    #[error("Game changed during the {expected} phase while the request was in flight")]
    PhaseConflict { expected: GamePhase },

    #[error("Action requires the {expected} phase, game is in {actual}")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },

    #[error("Need at least {required} players, found {found}")]
    InsufficientPlayers { found: usize, required: usize },

    #[error("Voting requires at least one clue")]
    NoClues,

    #[error("Reveal requires at least one vote")]
    NoVotes,

    #[error("Cannot vote for yourself")]
    SelfVote,

    #[error("Word pair pool is empty")]
    PoolExhausted,

    #[error("Invalid clue: {0}")]
    InvalidClue(String),

    #[error("Display name must be 1 to {max} characters")]
    InvalidDisplayName { max: usize },

    #[error("Round count must be between 1 and {max}")]
    InvalidRoundCount { max: u32 },

    #[error("Game has ended")]
    GameFinished,

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotAuthenticated => "NOT_AUTHENTICATED",
            GameError::NotAuthorized => "NOT_AUTHORIZED",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            GameError::PhaseConflict { .. } => "PHASE_CONFLICT",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::NoClues => "NO_CLUES",
            GameError::NoVotes => "NO_VOTES",
            GameError::SelfVote => "SELF_VOTE",
            GameError::PoolExhausted => "POOL_EXHAUSTED",
            GameError::InvalidClue(_) => "INVALID_CLUE",
            GameError::InvalidDisplayName { .. } => "INVALID_DISPLAY_NAME",
            GameError::InvalidRoundCount { .. } => "INVALID_ROUND_COUNT",
            GameError::GameFinished => "GAME_FINISHED",
            GameError::Storage(_) => "STORAGE_FAILURE",
        }
    }
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PhaseMismatch { expected, .. } => GameError::PhaseConflict { expected },
            StoreError::Missing(what) => GameError::NotFound(what),
            StoreError::Conflict(msg) | StoreError::Unavailable(msg) => GameError::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_game_errors() {
        let err: GameError = StoreError::PhaseMismatch {
            expected: GamePhase::Voting,
            actual: GamePhase::Finished,
        }
        .into();
        assert_eq!(
            err,
            GameError::PhaseConflict {
                expected: GamePhase::Voting
            }
        );

        let err: GameError = StoreError::Missing("Round".to_string()).into();
        assert_eq!(err.code(), "NOT_FOUND");

        let err: GameError = StoreError::Unavailable("disk on fire".to_string()).into();
        assert_eq!(err.code(), "STORAGE_FAILURE");
    }

    #[test]
    fn test_error_messages() {
        let err = GameError::IllegalTransition {
            from: GamePhase::Lobby,
            to: GamePhase::Voting,
        };
        assert_eq!(err.to_string(), "Invalid phase transition from lobby to voting");
    }
}
