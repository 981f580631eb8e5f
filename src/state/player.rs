use super::AppState;
use crate::auth::IdentityProvider;
use crate::error::GameResult;
use crate::types::*;

impl AppState {
    /// Players ordered by score, highest first. Ties keep join order.
    pub async fn get_players(&self, game_id: &str) -> GameResult<Vec<Player>> {
        let mut players = self.store_call(self.store.list_players(game_id)).await?;
        players.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(players)
    }

    /// The caller's player record in a game, if they joined it
    pub async fn get_current_player(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<Option<Player>> {
        let Some(user_id) = identity.current_user_id() else {
            return Ok(None);
        };
        self.store_call(self.store.find_player_by_user(game_id, &user_id))
            .await
    }
}
