use rand::seq::IndexedRandom;
use rand::Rng;

use super::AppState;
use crate::auth::IdentityProvider;
use crate::error::{GameError, GameResult};
use crate::types::*;
use crate::words::select_word_pair;

/// Pick the round's odd player uniformly at random.
/// Draws are independent between rounds.
pub fn assign_odd_player<R: Rng + ?Sized>(player_ids: &[PlayerId], rng: &mut R) -> Option<PlayerId> {
    player_ids.choose(rng).cloned()
}

/// Whether another round follows the current one
pub fn should_continue(game: &Game) -> bool {
    game.current_round < game.total_rounds
}

impl AppState {
    /// Draw the next round for a game (word pair and odd player).
    /// Nothing is written here; the round is persisted together with the
    /// phase change that starts it.
    pub async fn start_round(&self, game: &Game, players: &[Player]) -> GameResult<Round> {
        if players.len() < MIN_PLAYERS {
            return Err(GameError::InsufficientPlayers {
                found: players.len(),
                required: MIN_PLAYERS,
            });
        }

        let pool = self.store_call(self.store.list_word_pairs()).await?;
        if pool.is_empty() {
            tracing::error!("Word pair pool is empty, cannot start round for game {}", game.id);
        }
        let player_ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();

        let (pair, odd_player_id) = self.with_rng(|rng| {
            let pair = select_word_pair(&pool, rng)?;
            let odd = assign_odd_player(&player_ids, rng).ok_or(GameError::InsufficientPlayers {
                found: 0,
                required: MIN_PLAYERS,
            })?;
            Ok::<_, GameError>((pair, odd))
        })?;

        Ok(Round {
            id: new_id(),
            game_id: game.id.clone(),
            round_number: game.current_round + 1,
            group_word: pair.group_word,
            odd_word: pair.odd_word,
            category: pair.category,
            odd_player_id,
            created_at: now_rfc3339(),
        })
    }

    /// The round the game is currently on, if it has started
    pub async fn get_current_round(&self, game_id: &str) -> GameResult<Option<Round>> {
        let game = self.load_game(game_id).await?;
        if game.current_round == 0 {
            return Ok(None);
        }
        self.store_call(self.store.get_round(&game.id, game.current_round))
            .await
    }

    /// Like `get_current_round`, but a missing round is an error
    pub(crate) async fn require_current_round(&self, game: &Game) -> GameResult<Round> {
        if game.current_round == 0 {
            return Err(GameError::NotFound("Round".to_string()));
        }
        self.store_call(self.store.get_round(&game.id, game.current_round))
            .await?
            .ok_or_else(|| GameError::NotFound("Round".to_string()))
    }

    pub async fn get_rounds(&self, game_id: &str) -> GameResult<Vec<Round>> {
        self.store_call(self.store.list_rounds(game_id)).await
    }

    /// The caller's private view of the current round (their word, and their
    /// role in classic mode)
    pub async fn get_round_view(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<RoundView> {
        let player = self.require_player(identity, game_id).await?;
        let game = self.load_game(game_id).await?;
        let round = self.require_current_round(&game).await?;
        Ok(round.view_for(&player.id, game.mode))
    }

    /// Submission counts for the current round
    pub async fn get_progress(&self, game_id: &str) -> GameResult<Option<RoundProgress>> {
        let game = self.load_game(game_id).await?;
        let Some(round) = self
            .store_call(self.store.get_round(&game.id, game.current_round))
            .await?
        else {
            return Ok(None);
        };

        let players = self.store_call(self.store.list_players(&game.id)).await?;
        let clues = self.store_call(self.store.list_clues(&round.id)).await?;
        let votes = self.store_call(self.store.list_votes(&round.id)).await?;

        Ok(Some(RoundProgress {
            round_number: round.round_number,
            players: players.len(),
            clues: clues.len(),
            votes: votes.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::GameConfig;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_assign_odd_player_picks_a_member() {
        let ids: Vec<PlayerId> = vec!["a".into(), "b".into(), "c".into()];
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        for _ in 0..300 {
            let odd = assign_odd_player(&ids, &mut rng).unwrap();
            assert!(ids.contains(&odd));
            seen.insert(odd);
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(assign_odd_player(&[], &mut rng), None);
    }

    #[test]
    fn test_should_continue() {
        let mut game = Game {
            id: "g".into(),
            code: "ABCDEF".into(),
            host_id: "h".into(),
            mode: GameMode::Classic,
            phase: GamePhase::Reveal,
            current_round: 4,
            total_rounds: 5,
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
        };
        assert!(should_continue(&game));
        game.current_round = 5;
        assert!(!should_continue(&game));
    }

    #[tokio::test]
    async fn test_build_round_needs_three_players() {
        let state = AppState::new().seeded(5);
        let (game, players) = lobby(&state, 1, 5).await;

        let result = state.start_round(&game, &players).await;
        assert_eq!(
            result.unwrap_err(),
            GameError::InsufficientPlayers {
                found: 2,
                required: 3
            }
        );
    }

    #[tokio::test]
    async fn test_build_round_with_three_players() {
        let state = AppState::new().seeded(5);
        let (game, players) = lobby(&state, 2, 5).await;

        let round = state.start_round(&game, &players).await.unwrap();
        assert_eq!(round.round_number, 1);
        assert_eq!(round.game_id, game.id);
        assert_ne!(round.group_word, round.odd_word);
        assert!(players.iter().any(|p| p.id == round.odd_player_id));
    }

    #[tokio::test]
    async fn test_build_round_empty_pool() {
        let store = Arc::new(MemoryStore::with_word_pairs(Vec::new()));
        let state = AppState::with_store(store, GameConfig::default());
        let (game, players) = lobby(&state, 2, 5).await;

        let result = state.start_round(&game, &players).await;
        assert_eq!(result.unwrap_err(), GameError::PoolExhausted);
    }

    #[tokio::test]
    async fn test_round_view_for_players() {
        let state = AppState::new().seeded(11);
        let (game, players) = lobby(&state, 3, 5).await;
        state.start_game(&host(), &game.id).await.unwrap();
        let round = state.get_current_round(&game.id).await.unwrap().unwrap();

        for player in &players {
            let view = state
                .get_round_view(&identity_of(player), &game.id)
                .await
                .unwrap();
            if player.id == round.odd_player_id {
                assert_eq!(view.word, round.odd_word);
                assert_eq!(view.role, Some(PlayerRole::Odd));
            } else {
                assert_eq!(view.word, round.group_word);
                assert_eq!(view.role, Some(PlayerRole::Regular));
            }
        }
    }

    #[tokio::test]
    async fn test_progress_counts() {
        let state = AppState::new();
        let (game, players) = lobby(&state, 2, 5).await;
        assert_eq!(state.get_progress(&game.id).await.unwrap(), None);

        state.start_game(&host(), &game.id).await.unwrap();
        state
            .submit_clue(&identity_of(&players[1]), &game.id, "fluffy")
            .await
            .unwrap();

        let progress = state.get_progress(&game.id).await.unwrap().unwrap();
        assert_eq!(progress.round_number, 1);
        assert_eq!(progress.players, 3);
        assert_eq!(progress.clues, 1);
        assert_eq!(progress.votes, 0);
        assert!(!progress.all_clues_in());
    }
}
