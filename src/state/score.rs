use serde::Serialize;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::scoring::{calculate_scoring, RoundScoring};
use crate::types::*;

/// One vote as shown on the reveal screen
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoteResult {
    pub voter_id: PlayerId,
    pub suspect_id: PlayerId,
    pub correct: bool,
}

/// Everything the reveal screen needs for the current round
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevealSummary {
    pub round_number: u32,
    pub odd_player_id: PlayerId,
    pub group_word: String,
    pub odd_word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub votes: Vec<VoteResult>,
    pub scoring: RoundScoring,
}

/// Leaderboard row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Standing {
    pub rank: usize,
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
}

impl AppState {
    /// Outcome of the current round. Only available once it has been revealed.
    pub async fn reveal_summary(&self, game_id: &str) -> GameResult<RevealSummary> {
        let game = self.load_game(game_id).await?;
        if !matches!(game.phase, GamePhase::Reveal | GamePhase::Finished) {
            return Err(GameError::WrongPhase {
                expected: GamePhase::Reveal,
                actual: game.phase,
            });
        }

        let round = self.require_current_round(&game).await?;
        let votes = self.store_call(self.store.list_votes(&round.id)).await?;
        let players = self.store_call(self.store.list_players(&game.id)).await?;
        let player_ids: Vec<PlayerId> = players.into_iter().map(|p| p.id).collect();

        // Recomputed from the stored votes; the scores themselves were applied at reveal
        let scoring = calculate_scoring(&votes, &round.odd_player_id, &player_ids);

        let votes = votes
            .into_iter()
            .map(|v| VoteResult {
                correct: v.suspect_id == round.odd_player_id,
                voter_id: v.voter_id,
                suspect_id: v.suspect_id,
            })
            .collect();

        Ok(RevealSummary {
            round_number: round.round_number,
            odd_player_id: round.odd_player_id,
            group_word: round.group_word,
            odd_word: round.odd_word,
            category: round.category,
            votes,
            scoring,
        })
    }

    /// Standings by score. Tied players share a rank.
    pub async fn leaderboard(&self, game_id: &str) -> GameResult<Vec<Standing>> {
        let players = self.get_players(game_id).await?;

        let mut standings: Vec<Standing> = Vec::with_capacity(players.len());
        for (i, player) in players.into_iter().enumerate() {
            let rank = match standings.last() {
                Some(prev) if prev.score == player.score => prev.rank,
                _ => i + 1,
            };
            standings.push(Standing {
                rank,
                player_id: player.id,
                display_name: player.display_name,
                score: player.score,
            });
        }
        Ok(standings)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    /// Play round 1 up to the reveal. `accusers` of the non-odd players vote
    /// for the odd player, the rest vote for someone else.
    async fn reveal_round(state: &AppState, guests: usize, accusers: usize) -> (Game, Vec<Player>, Round) {
        let (game, players) = lobby(state, guests, 3).await;
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

        let others: Vec<&Player> = players
            .iter()
            .filter(|p| p.id != round.odd_player_id)
            .collect();
        for (i, voter) in others.iter().enumerate() {
            let suspect = if i < accusers {
                round.odd_player_id.clone()
            } else {
                others[(i + 1) % others.len()].id.clone()
            };
            state
                .submit_vote(&identity_of(voter), &game.id, &suspect)
                .await
                .unwrap();
        }
        state.reveal_and_score(&host(), &game.id).await.unwrap();
        (game, players, round)
    }

    #[tokio::test]
    async fn test_summary_requires_reveal() {
        let state = AppState::new();
        let (game, _) = lobby(&state, 2, 3).await;
        state.start_game(&host(), &game.id).await.unwrap();

        let result = state.reveal_summary(&game.id).await;
        assert!(matches!(result.unwrap_err(), GameError::WrongPhase { .. }));
    }

    #[tokio::test]
    async fn test_summary_when_odd_player_escapes() {
        let state = AppState::new().seeded(13);
        // 5 players, 4 voters, 1 of them finds the odd player
        let (game, _, round) = reveal_round(&state, 4, 1).await;

        let summary = state.reveal_summary(&game.id).await.unwrap();
        assert_eq!(summary.round_number, 1);
        assert_eq!(summary.odd_player_id, round.odd_player_id);
        assert_eq!(summary.group_word, round.group_word);
        assert_eq!(summary.odd_word, round.odd_word);
        assert_eq!(summary.votes.len(), 4);
        assert_eq!(summary.votes.iter().filter(|v| v.correct).count(), 1);
        assert!(summary.scoring.odd_player_escaped);

        let players = state.get_players(&game.id).await.unwrap();
        assert_eq!(players[0].id, round.odd_player_id);
        assert_eq!(players[0].score, 2);
    }

    #[tokio::test]
    async fn test_summary_when_odd_player_caught() {
        let state = AppState::new().seeded(17);
        // 5 players, 4 voters, 3 of them find the odd player
        let (game, _, round) = reveal_round(&state, 4, 3).await;

        let summary = state.reveal_summary(&game.id).await.unwrap();
        assert!(!summary.scoring.odd_player_escaped);
        assert_eq!(summary.scoring.correct_votes, 3);
        assert_eq!(summary.scoring.delta_for(&round.odd_player_id), 0);

        let players = state.get_players(&game.id).await.unwrap();
        let total: u32 = players.iter().map(|p| p.score).sum();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_summary_still_available_after_finish() {
        let state = AppState::new().seeded(3);
        let (game, _, _) = reveal_round(&state, 2, 2).await;
        state.end_game(&host(), &game.id).await.unwrap();

        assert!(state.reveal_summary(&game.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_ties_together() {
        let state = AppState::new().seeded(8);
        // 4 players, 3 voters, all of them find the odd player: 1/1/1/0
        let (game, _, round) = reveal_round(&state, 3, 3).await;

        let board = state.leaderboard(&game.id).await.unwrap();
        let ranks: Vec<usize> = board.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 1, 1, 4]);
        assert_eq!(board[3].player_id, round.odd_player_id);
        assert_eq!(board[3].score, 0);
    }
}
