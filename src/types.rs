use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;
pub type RoundId = String;
pub type ClueId = String;
pub type VoteId = String;
pub type WordPairId = String;
/// Stable identity of a signed-in user (not a player: one user has one player per game)
pub type UserId = String;

/// Minimum number of players needed to start a game or a round
pub const MIN_PLAYERS: usize = 3;

/// Default number of rounds per game
pub const DEFAULT_TOTAL_ROUNDS: u32 = 5;

/// Upper bound for the configurable round count
pub const MAX_TOTAL_ROUNDS: u32 = 20;

/// Maximum display name length (in characters)
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Lobby,
    Clue,
    Voting,
    Reveal,
    Finished,
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::Finished)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Clue => "clue",
            GamePhase::Voting => "voting",
            GamePhase::Reveal => "reveal",
            GamePhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// In classic mode players are told whether they are the odd one out.
/// In blind mode everybody only sees their word.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Classic,
    Blind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub code: String,
    pub host_id: UserId,
    pub mode: GameMode,
    pub phase: GamePhase,
    /// 0 while in the lobby, otherwise 1..=total_rounds
    pub current_round: u32,
    pub total_rounds: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub game_id: GameId,
    pub user_id: UserId,
    pub display_name: String,
    pub score: u32,
    pub is_host: bool,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Round {
    pub id: RoundId,
    pub game_id: GameId,
    pub round_number: u32,
    pub group_word: String,
    pub odd_word: String,
    #[serde(default)]
    pub category: Option<String>,
    pub odd_player_id: PlayerId,
    pub created_at: String,
}

impl Round {
    /// What a single player gets to see of this round while it is running
    pub fn view_for(&self, player_id: &PlayerId, mode: GameMode) -> RoundView {
        let is_odd = self.odd_player_id == *player_id;
        RoundView {
            round_number: self.round_number,
            word: if is_odd {
                self.odd_word.clone()
            } else {
                self.group_word.clone()
            },
            role: match mode {
                GameMode::Classic if is_odd => Some(PlayerRole::Odd),
                GameMode::Classic => Some(PlayerRole::Regular),
                GameMode::Blind => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerRole {
    Regular,
    Odd,
}

/// Private per-player projection of a round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundView {
    pub round_number: u32,
    pub word: String,
    /// Only disclosed in classic mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<PlayerRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clue {
    pub id: ClueId,
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub clue_text: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub id: VoteId,
    pub round_id: RoundId,
    pub voter_id: PlayerId,
    pub suspect_id: PlayerId,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordPair {
    pub id: WordPairId,
    pub group_word: String,
    pub odd_word: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Submission counts for the current round, surfaced to the host as a quorum hint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundProgress {
    pub round_number: u32,
    pub players: usize,
    pub clues: usize,
    pub votes: usize,
}

impl RoundProgress {
    pub fn all_clues_in(&self) -> bool {
        self.players > 0 && self.clues >= self.players
    }

    pub fn all_votes_in(&self) -> bool {
        self.players > 0 && self.votes >= self.players
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn new_id() -> String {
    ulid::Ulid::new().to_string()
}
