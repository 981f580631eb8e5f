use super::AppState;
use crate::auth::IdentityProvider;
use crate::error::{GameError, GameResult};
use crate::feed::{ChangeKind, Record};
use crate::scoring::is_vote_valid;
use crate::types::*;

impl AppState {
    /// Cast (or change) the caller's vote for the current round
    pub async fn submit_vote(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
        suspect_id: &str,
    ) -> GameResult<Vote> {
        let voter = self.require_player(identity, game_id).await?;
        let game = self.load_game(game_id).await?;
        if game.phase != GamePhase::Voting {
            return Err(GameError::WrongPhase {
                expected: GamePhase::Voting,
                actual: game.phase,
            });
        }

        if !is_vote_valid(&voter.id, suspect_id) {
            return Err(GameError::SelfVote);
        }

        let players = self.store_call(self.store.list_players(&game.id)).await?;
        if !players.iter().any(|p| p.id == suspect_id) {
            return Err(GameError::NotFound("Suspect".to_string()));
        }

        let round = self.require_current_round(&game).await?;
        let vote = Vote {
            id: new_id(),
            round_id: round.id.clone(),
            voter_id: voter.id.clone(),
            suspect_id: suspect_id.to_string(),
            submitted_at: now_rfc3339(),
        };

        let upserted = self
            .guarded_write(GamePhase::Voting, self.store.upsert_vote(vote, GamePhase::Voting))
            .await?;
        let kind = if upserted.replaced {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };

        tracing::debug!(
            "Player {} voted in round {} of game {}",
            voter.id,
            round.round_number,
            game.id
        );
        self.publish(&game.id, kind, Record::Vote(upserted.record.clone()));
        Ok(upserted.record)
    }

    /// All votes of a round in submission order
    pub async fn get_votes_for_round(&self, round_id: &str) -> GameResult<Vec<Vote>> {
        self.store_call(self.store.list_votes(round_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::GameConfig;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    /// Game in the voting phase of round 1, with one clue in
    async fn in_voting(state: &AppState) -> (Game, Vec<Player>, Round) {
        let (game, players) = lobby(state, 3, 5).await;
        let round = state
            .start_game(&host(), &game.id)
            .await
            .unwrap()
            .round
            .unwrap();
        state
            .submit_clue(&identity_of(&players[0]), &game.id, "clue")
            .await
            .unwrap();
        state.advance_to_voting(&host(), &game.id).await.unwrap();
        (game, players, round)
    }

    #[tokio::test]
    async fn test_submit_vote() {
        let state = AppState::new();
        let (game, players, round) = in_voting(&state).await;

        let vote = state
            .submit_vote(&identity_of(&players[1]), &game.id, &players[2].id)
            .await
            .unwrap();
        assert_eq!(vote.voter_id, players[1].id);
        assert_eq!(vote.suspect_id, players[2].id);
        assert_eq!(vote.round_id, round.id);
    }

    #[tokio::test]
    async fn test_changing_vote_keeps_one_row() {
        let state = AppState::new();
        let (game, players, round) = in_voting(&state).await;
        let me = identity_of(&players[1]);

        let first = state
            .submit_vote(&me, &game.id, &players[2].id)
            .await
            .unwrap();
        let second = state
            .submit_vote(&me, &game.id, &players[3].id)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let votes = state.get_votes_for_round(&round.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].suspect_id, players[3].id);
    }

    #[tokio::test]
    async fn test_self_vote_rejected() {
        let state = AppState::new();
        let (game, players, round) = in_voting(&state).await;

        let result = state
            .submit_vote(&identity_of(&players[1]), &game.id, &players[1].id)
            .await;
        assert_eq!(result.unwrap_err(), GameError::SelfVote);
        assert!(state.get_votes_for_round(&round.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suspect_must_be_in_game() {
        let state = AppState::new();
        let (game, players, _) = in_voting(&state).await;

        let result = state
            .submit_vote(&identity_of(&players[1]), &game.id, "nobody")
            .await;
        assert_eq!(result.unwrap_err(), GameError::NotFound("Suspect".to_string()));
    }

    #[tokio::test]
    async fn test_vote_outside_voting_phase() {
        let state = AppState::new();
        let (game, players) = lobby(&state, 2, 5).await;
        state.start_game(&host(), &game.id).await.unwrap();

        let result = state
            .submit_vote(&identity_of(&players[1]), &game.id, &players[2].id)
            .await;
        assert_eq!(
            result.unwrap_err(),
            GameError::WrongPhase {
                expected: GamePhase::Voting,
                actual: GamePhase::Clue
            }
        );
    }

    #[tokio::test]
    async fn test_vote_for_player_without_clue_is_allowed() {
        let state = AppState::new();
        let (game, players, _) = in_voting(&state).await;

        // Only players[0] gave a clue
        let result = state
            .submit_vote(&identity_of(&players[1]), &game.id, &players[3].id)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_vote_in_flight_when_host_reveals() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_store(store.clone(), GameConfig::default());
        let (game, players, round) = in_voting(&state).await;
        state
            .submit_vote(&identity_of(&players[1]), &game.id, &players[2].id)
            .await
            .unwrap();

        // The late vote passes the phase check, then the host reveals before it is written
        store.delay_submissions(Duration::from_millis(100));
        let late = identity_of(&players[2]);
        let (late_vote, revealed) = tokio::join!(
            state.submit_vote(&late, &game.id, &players[1].id),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                state.reveal_and_score(&host(), &game.id).await
            }
        );

        let applied = revealed.unwrap().scoring.unwrap();
        assert_eq!(
            late_vote.unwrap_err(),
            GameError::WrongPhase {
                expected: GamePhase::Voting,
                actual: GamePhase::Reveal
            }
        );
        assert_eq!(state.get_votes_for_round(&round.id).await.unwrap().len(), 1);

        // What the reveal screen shows matches the points that were applied
        let summary = state.reveal_summary(&game.id).await.unwrap();
        assert_eq!(summary.scoring, applied);
        assert_eq!(summary.votes.len(), 1);
        let stored = state.get_players(&game.id).await.unwrap();
        for player in &stored {
            assert_eq!(player.score, applied.delta_for(&player.id));
        }
    }
}
