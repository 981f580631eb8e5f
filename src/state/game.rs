use rand::Rng;

use super::AppState;
use crate::auth::{require_user, IdentityProvider};
use crate::error::{GameError, GameResult};
use crate::feed::{ChangeKind, Record};
use crate::store::StoreError;
use crate::types::*;

/// Join code alphabet (excludes 0/O and 1/I to avoid confusion)
pub const JOIN_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LENGTH: usize = 6;

/// Give up on finding a free join code after this many draws
const MAX_CODE_ATTEMPTS: usize = 32;

/// Generate a random join code
pub fn generate_join_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_CHARS[rng.random_range(0..JOIN_CODE_CHARS.len())] as char)
        .collect()
}

fn validate_display_name(display_name: &str) -> GameResult<String> {
    let trimmed = display_name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_DISPLAY_NAME_CHARS {
        return Err(GameError::InvalidDisplayName {
            max: MAX_DISPLAY_NAME_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

impl AppState {
    /// Create a new game hosted by the caller. The host joins as its first player.
    pub async fn create_game(
        &self,
        identity: &dyn IdentityProvider,
        display_name: &str,
        mode: GameMode,
        total_rounds: Option<u32>,
    ) -> GameResult<(Game, Player)> {
        let user_id = require_user(identity)?;
        let display_name = validate_display_name(display_name)?;
        let total_rounds = total_rounds.unwrap_or(self.config.default_total_rounds);
        if !(1..=MAX_TOTAL_ROUNDS).contains(&total_rounds) {
            return Err(GameError::InvalidRoundCount {
                max: MAX_TOTAL_ROUNDS,
            });
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.with_rng(|rng| generate_join_code(rng));

            // Cheap pre-check; the store's uniqueness constraint is authoritative
            if self
                .store_call(self.store.find_game_by_code(&code))
                .await?
                .is_some()
            {
                continue;
            }

            let now = now_rfc3339();
            let game = Game {
                id: new_id(),
                code,
                host_id: user_id.clone(),
                mode,
                phase: GamePhase::Lobby,
                current_round: 0,
                total_rounds,
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            let host = Player {
                id: new_id(),
                game_id: game.id.clone(),
                user_id: user_id.clone(),
                display_name: display_name.clone(),
                score: 0,
                is_host: true,
                joined_at: now,
            };

            match self
                .bounded(self.store.insert_game(game.clone(), host.clone()))
                .await?
            {
                Ok(()) => {
                    tracing::info!(
                        "Game {} created with code {} by user {}",
                        game.id,
                        game.code,
                        user_id
                    );
                    self.publish(&game.id, ChangeKind::Insert, Record::Game(game.clone()));
                    self.publish(&game.id, ChangeKind::Insert, Record::Player(host.clone()));
                    return Ok((game, host));
                }
                // Lost a race for this code, draw another
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!("No free join code after {} attempts", MAX_CODE_ATTEMPTS);
        Err(GameError::Storage("could not allocate a join code".to_string()))
    }

    /// Join a game by code. Joining a game twice returns the existing player.
    pub async fn join_game(
        &self,
        identity: &dyn IdentityProvider,
        code: &str,
        display_name: &str,
    ) -> GameResult<(Game, Player)> {
        let user_id = require_user(identity)?;
        let game = self
            .get_game_by_code(code)
            .await?
            .ok_or_else(|| GameError::NotFound("Game".to_string()))?;

        if game.phase == GamePhase::Finished {
            return Err(GameError::GameFinished);
        }

        if let Some(existing) = self
            .store_call(self.store.find_player_by_user(&game.id, &user_id))
            .await?
        {
            tracing::info!("User {} rejoined game {}", user_id, game.id);
            return Ok((game, existing));
        }

        let player = Player {
            id: new_id(),
            game_id: game.id.clone(),
            user_id: user_id.clone(),
            display_name: validate_display_name(display_name)?,
            score: 0,
            is_host: false,
            joined_at: now_rfc3339(),
        };

        match self.bounded(self.store.insert_player(player.clone())).await? {
            Ok(()) => {}
            // A concurrent join for the same user won the insert
            Err(StoreError::Conflict(_)) => {
                let existing = self
                    .store_call(self.store.find_player_by_user(&game.id, &user_id))
                    .await?
                    .ok_or_else(|| GameError::Storage("failed to join game".to_string()))?;
                return Ok((game, existing));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            "Player {} ({}) joined game {}",
            player.display_name,
            player.id,
            game.id
        );
        self.publish(&game.id, ChangeKind::Insert, Record::Player(player.clone()));
        Ok((game, player))
    }

    pub async fn get_game(&self, game_id: &str) -> GameResult<Option<Game>> {
        self.store_call(self.store.get_game(game_id)).await
    }

    /// Look up a game by join code (case-insensitive)
    pub async fn get_game_by_code(&self, code: &str) -> GameResult<Option<Game>> {
        let code = code.trim().to_uppercase();
        self.store_call(self.store.find_game_by_code(&code)).await
    }

    /// Whether the caller hosts the game
    pub async fn is_host(&self, identity: &dyn IdentityProvider, game_id: &str) -> bool {
        match (identity.current_user_id(), self.get_game(game_id).await) {
            (Some(user_id), Ok(Some(game))) => game.host_id == user_id,
            _ => false,
        }
    }
}
