//! Durable storage boundary.
//!
//! The game core never keeps records in process memory between operations;
//! every read and write goes through a [`GameStore`]. Implementations must
//! enforce the uniqueness constraints listed on each method and must apply a
//! [`PhaseUpdate`] atomically.

mod memory;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::*;

pub use memory::MemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    /// Conditional phase update found the game in a different phase
    #[error("Expected phase {expected}, found {actual}")]
    PhaseMismatch {
        expected: GamePhase,
        actual: GamePhase,
    },

    /// A referenced parent record does not exist
    #[error("{0} not found")]
    Missing(String),

    /// Backend failure (I/O, connection, ...)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of an insert-or-replace write
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub record: T,
    /// True when an existing record for the same key was overwritten
    pub replaced: bool,
}

/// A single conditional game update: "move game from `from` to `to`, fail if
/// the stored phase is no longer `from`". Carries everything the transition
/// writes so it commits or fails as one unit.
#[derive(Debug, Clone)]
pub struct PhaseUpdate {
    pub game_id: GameId,
    pub from: GamePhase,
    pub to: GamePhase,
    /// New value for `current_round`, if it changes
    pub current_round: Option<u32>,
    /// Round to insert; unique on (game_id, round_number)
    pub new_round: Option<Round>,
    /// Points to add to each player's score
    pub score_deltas: HashMap<PlayerId, u32>,
    /// Votes the score batch was computed from; the update fails with
    /// `Conflict` when the stored votes for that round differ
    pub scored_votes: Option<(RoundId, Vec<Vote>)>,
}

impl PhaseUpdate {
    pub fn new(game_id: &GameId, from: GamePhase, to: GamePhase) -> Self {
        Self {
            game_id: game_id.clone(),
            from,
            to,
            current_round: None,
            new_round: None,
            score_deltas: HashMap::new(),
            scored_votes: None,
        }
    }

    pub fn with_round(mut self, round: Round) -> Self {
        self.current_round = Some(round.round_number);
        self.new_round = Some(round);
        self
    }

    pub fn with_scores(mut self, deltas: HashMap<PlayerId, u32>) -> Self {
        self.score_deltas = deltas;
        self
    }

    pub fn with_scored_votes(mut self, round_id: &RoundId, votes: Vec<Vote>) -> Self {
        self.scored_votes = Some((round_id.clone(), votes));
        self
    }
}

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Insert a new game together with its host player.
    /// Unique on the join code.
    async fn insert_game(&self, game: Game, host: Player) -> StoreResult<()>;

    async fn get_game(&self, game_id: &str) -> StoreResult<Option<Game>>;

    async fn find_game_by_code(&self, code: &str) -> StoreResult<Option<Game>>;

    /// Unique on (game_id, user_id)
    async fn insert_player(&self, player: Player) -> StoreResult<()>;

    async fn find_player_by_user(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<Player>>;

    /// Players of a game in join order
    async fn list_players(&self, game_id: &str) -> StoreResult<Vec<Player>>;

    async fn get_round(&self, game_id: &str, round_number: u32) -> StoreResult<Option<Round>>;

    /// Rounds of a game ordered by round number
    async fn list_rounds(&self, game_id: &str) -> StoreResult<Vec<Round>>;

    /// Insert or replace, keyed by (round_id, player_id).
    /// Fails with `PhaseMismatch` unless the round's game is in `phase`, and
    /// with `Conflict` if the round is no longer the game's current one.
    async fn upsert_clue(&self, clue: Clue, phase: GamePhase) -> StoreResult<Upserted<Clue>>;

    async fn list_clues(&self, round_id: &str) -> StoreResult<Vec<Clue>>;

    /// Insert or replace, keyed by (round_id, voter_id). Same phase guard as
    /// `upsert_clue`.
    async fn upsert_vote(&self, vote: Vote, phase: GamePhase) -> StoreResult<Upserted<Vote>>;

    async fn list_votes(&self, round_id: &str) -> StoreResult<Vec<Vote>>;

    async fn list_word_pairs(&self) -> StoreResult<Vec<WordPair>>;

    /// Apply a conditional phase transition atomically and return the updated game
    async fn transition(&self, update: PhaseUpdate) -> StoreResult<Game>;
}
