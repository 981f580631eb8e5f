use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::{GameStore, PhaseUpdate, StoreError, StoreResult, Upserted};
use crate::types::*;

#[derive(Default)]
struct Tables {
    games: HashMap<GameId, Game>,
    /// join code -> game id
    codes: HashMap<String, GameId>,
    /// insertion order doubles as join order
    players: Vec<Player>,
    rounds: HashMap<(GameId, u32), Round>,
    clues: HashMap<(RoundId, PlayerId), Clue>,
    votes: HashMap<(RoundId, PlayerId), Vote>,
    word_pairs: Vec<WordPair>,
}

impl Tables {
    /// Check that a clue or vote for `round_id` may be written now: the round
    /// exists, is its game's current round, and the game is in `phase`.
    fn check_open_round(&self, round_id: &str, phase: GamePhase) -> StoreResult<()> {
        let round = self
            .rounds
            .values()
            .find(|r| r.id == round_id)
            .ok_or_else(|| StoreError::Missing("Round".to_string()))?;
        let game = self
            .games
            .get(&round.game_id)
            .ok_or_else(|| StoreError::Missing("Game".to_string()))?;

        if game.phase != phase {
            return Err(StoreError::PhaseMismatch {
                expected: phase,
                actual: game.phase,
            });
        }
        if game.current_round != round.round_number {
            return Err(StoreError::Conflict(format!(
                "round {} of game {} is closed",
                round.round_number, game.id
            )));
        }
        Ok(())
    }

    /// Whether the stored votes for a round are exactly `scored`
    fn votes_match(&self, round_id: &str, scored: &[Vote]) -> bool {
        let mut stored: Vec<(&str, &str)> = self
            .votes
            .values()
            .filter(|v| v.round_id == round_id)
            .map(|v| (v.id.as_str(), v.suspect_id.as_str()))
            .collect();
        let mut expected: Vec<(&str, &str)> = scored
            .iter()
            .map(|v| (v.id.as_str(), v.suspect_id.as_str()))
            .collect();
        stored.sort_unstable();
        expected.sort_unstable();
        stored == expected
    }
}

/// In-process store. All tables sit behind one lock so multi-record writes
/// (game + host player, phase + round + scores) commit together.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    submission_delay_ms: AtomicU64,
    transition_delay_ms: AtomicU64,
}

impl MemoryStore {
    /// Store seeded with the built-in word pair pool
    pub fn new() -> Self {
        Self::with_word_pairs(crate::words::default_pool())
    }

    pub fn with_word_pairs(word_pairs: Vec<WordPair>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                word_pairs,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Make every following call fail with `Unavailable` (for exercising failure paths)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every following call (for exercising timeouts)
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay clue and vote writes before they take the lock
    pub fn delay_submissions(&self, delay: Duration) {
        self.submission_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay phase transitions before they take the lock
    pub fn delay_transitions(&self, delay: Duration) {
        self.transition_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn pause(millis: &AtomicU64) {
        let millis = millis.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    async fn gate(&self) -> StoreResult<()> {
        Self::pause(&self.latency_ms).await;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn insert_game(&self, game: Game, host: Player) -> StoreResult<()> {
        self.gate().await?;
        let mut tables = self.tables.write().await;

        if tables.codes.contains_key(&game.code) {
            return Err(StoreError::Conflict(format!("join code {}", game.code)));
        }
        if tables.games.contains_key(&game.id) {
            return Err(StoreError::Conflict(format!("game {}", game.id)));
        }

        tables.codes.insert(game.code.clone(), game.id.clone());
        tables.games.insert(game.id.clone(), game);
        tables.players.push(host);
        Ok(())
    }

    async fn get_game(&self, game_id: &str) -> StoreResult<Option<Game>> {
        self.gate().await?;
        Ok(self.tables.read().await.games.get(game_id).cloned())
    }

    async fn find_game_by_code(&self, code: &str) -> StoreResult<Option<Game>> {
        self.gate().await?;
        let tables = self.tables.read().await;
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.games.get(id))
            .cloned())
    }

    async fn insert_player(&self, player: Player) -> StoreResult<()> {
        self.gate().await?;
        let mut tables = self.tables.write().await;

        if !tables.games.contains_key(&player.game_id) {
            return Err(StoreError::Missing("Game".to_string()));
        }
        if tables
            .players
            .iter()
            .any(|p| p.game_id == player.game_id && p.user_id == player.user_id)
        {
            return Err(StoreError::Conflict(format!(
                "user {} already in game {}",
                player.user_id, player.game_id
            )));
        }

        tables.players.push(player);
        Ok(())
    }

    async fn find_player_by_user(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<Player>> {
        self.gate().await?;
        Ok(self
            .tables
            .read()
            .await
            .players
            .iter()
            .find(|p| p.game_id == game_id && p.user_id == user_id)
            .cloned())
    }

    async fn list_players(&self, game_id: &str) -> StoreResult<Vec<Player>> {
        self.gate().await?;
        Ok(self
            .tables
            .read()
            .await
            .players
            .iter()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn get_round(&self, game_id: &str, round_number: u32) -> StoreResult<Option<Round>> {
        self.gate().await?;
        Ok(self
            .tables
            .read()
            .await
            .rounds
            .get(&(game_id.to_string(), round_number))
            .cloned())
    }

    async fn list_rounds(&self, game_id: &str) -> StoreResult<Vec<Round>> {
        self.gate().await?;
        let mut rounds: Vec<Round> = self
            .tables
            .read()
            .await
            .rounds
            .values()
            .filter(|r| r.game_id == game_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.round_number);
        Ok(rounds)
    }

    async fn upsert_clue(&self, clue: Clue, phase: GamePhase) -> StoreResult<Upserted<Clue>> {
        self.gate().await?;
        Self::pause(&self.submission_delay_ms).await;
        let mut tables = self.tables.write().await;

        tables.check_open_round(&clue.round_id, phase)?;

        let key = (clue.round_id.clone(), clue.player_id.clone());
        let (record, replaced) = match tables.clues.get(&key) {
            // Keep the original id so the record stays the same row
            Some(existing) => (
                Clue {
                    id: existing.id.clone(),
                    ..clue
                },
                true,
            ),
            None => (clue, false),
        };
        tables.clues.insert(key, record.clone());
        Ok(Upserted { record, replaced })
    }

    async fn list_clues(&self, round_id: &str) -> StoreResult<Vec<Clue>> {
        self.gate().await?;
        let mut clues: Vec<Clue> = self
            .tables
            .read()
            .await
            .clues
            .values()
            .filter(|c| c.round_id == round_id)
            .cloned()
            .collect();
        clues.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(clues)
    }

    async fn upsert_vote(&self, vote: Vote, phase: GamePhase) -> StoreResult<Upserted<Vote>> {
        self.gate().await?;
        Self::pause(&self.submission_delay_ms).await;
        let mut tables = self.tables.write().await;

        tables.check_open_round(&vote.round_id, phase)?;

        let key = (vote.round_id.clone(), vote.voter_id.clone());
        let (record, replaced) = match tables.votes.get(&key) {
            Some(existing) => (
                Vote {
                    id: existing.id.clone(),
                    ..vote
                },
                true,
            ),
            None => (vote, false),
        };
        tables.votes.insert(key, record.clone());
        Ok(Upserted { record, replaced })
    }

    async fn list_votes(&self, round_id: &str) -> StoreResult<Vec<Vote>> {
        self.gate().await?;
        let mut votes: Vec<Vote> = self
            .tables
            .read()
            .await
            .votes
            .values()
            .filter(|v| v.round_id == round_id)
            .cloned()
            .collect();
        votes.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(votes)
    }

    async fn list_word_pairs(&self) -> StoreResult<Vec<WordPair>> {
        self.gate().await?;
        Ok(self.tables.read().await.word_pairs.clone())
    }

    async fn transition(&self, update: PhaseUpdate) -> StoreResult<Game> {
        self.gate().await?;
        Self::pause(&self.transition_delay_ms).await;
        let mut tables = self.tables.write().await;

        // Validate everything before the first mutation
        let game = tables
            .games
            .get(&update.game_id)
            .ok_or_else(|| StoreError::Missing("Game".to_string()))?;
        if game.phase != update.from {
            return Err(StoreError::PhaseMismatch {
                expected: update.from,
                actual: game.phase,
            });
        }

        if let Some(round) = &update.new_round {
            let key = (round.game_id.clone(), round.round_number);
            if round.game_id != update.game_id || tables.rounds.contains_key(&key) {
                return Err(StoreError::Conflict(format!(
                    "round {} of game {}",
                    round.round_number, round.game_id
                )));
            }
        }

        if let Some((round_id, votes)) = &update.scored_votes {
            if !tables.votes_match(round_id, votes) {
                return Err(StoreError::Conflict(format!(
                    "votes for round {} changed",
                    round_id
                )));
            }
        }

        for player_id in update.score_deltas.keys() {
            if !tables
                .players
                .iter()
                .any(|p| p.id == *player_id && p.game_id == update.game_id)
            {
                return Err(StoreError::Missing(format!("Player {}", player_id)));
            }
        }

        // Apply
        if let Some(round) = update.new_round {
            tables
                .rounds
                .insert((round.game_id.clone(), round.round_number), round);
        }

        for player in tables
            .players
            .iter_mut()
            .filter(|p| p.game_id == update.game_id)
        {
            if let Some(delta) = update.score_deltas.get(&player.id) {
                player.score += delta;
            }
        }

        let game = tables
            .games
            .get_mut(&update.game_id)
            .ok_or_else(|| StoreError::Missing("Game".to_string()))?;
        game.phase = update.to;
        if let Some(round_no) = update.current_round {
            game.current_round = round_no;
        }
        game.updated_at = now_rfc3339();

        Ok(game.clone())
    }
}
