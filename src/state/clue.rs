use super::AppState;
use crate::auth::IdentityProvider;
use crate::error::{GameError, GameResult};
use crate::feed::{ChangeKind, Record};
use crate::types::*;

impl AppState {
    /// Submit (or replace) the caller's clue for the current round
    pub async fn submit_clue(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
        clue_text: &str,
    ) -> GameResult<Clue> {
        let player = self.require_player(identity, game_id).await?;
        let game = self.load_game(game_id).await?;
        if game.phase != GamePhase::Clue {
            return Err(GameError::WrongPhase {
                expected: GamePhase::Clue,
                actual: game.phase,
            });
        }

        let text = clue_text.trim();
        if text.is_empty() {
            return Err(GameError::InvalidClue("clue cannot be empty".to_string()));
        }
        if text.chars().count() > self.config.max_clue_chars {
            return Err(GameError::InvalidClue(format!(
                "clue is longer than {} characters",
                self.config.max_clue_chars
            )));
        }

        let round = self.require_current_round(&game).await?;
        let clue = Clue {
            id: new_id(),
            round_id: round.id.clone(),
            player_id: player.id.clone(),
            clue_text: text.to_string(),
            submitted_at: now_rfc3339(),
        };

        let upserted = self
            .guarded_write(GamePhase::Clue, self.store.upsert_clue(clue, GamePhase::Clue))
            .await?;
        let kind = if upserted.replaced {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };

        tracing::debug!(
            "Player {} {} clue for round {}",
            player.id,
            if upserted.replaced {
                "replaced their"
            } else {
                "submitted a"
            },
            round.round_number
        );
        self.publish(&game.id, kind, Record::Clue(upserted.record.clone()));
        Ok(upserted.record)
    }

    /// All clues of a round in submission order
    pub async fn get_clues_for_round(&self, round_id: &str) -> GameResult<Vec<Clue>> {
        self.store_call(self.store.list_clues(round_id)).await
    }
}
