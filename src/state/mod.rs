mod clue;
mod game;
mod phase;
mod player;
mod round;
mod score;
mod vote;

pub use game::{generate_join_code, JOIN_CODE_CHARS, JOIN_CODE_LENGTH};
pub use phase::{is_valid_phase_transition, valid_transitions, TransitionOutcome};
pub use round::{assign_odd_player, should_continue};
pub use score::{RevealSummary, Standing, VoteResult};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::auth::{require_user, IdentityProvider, SessionRegistry};
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::feed::{ChangeFeed, ChangeKind, Record};
use crate::store::{GameStore, MemoryStore, StoreError, StoreResult};
use crate::types::*;

/// Shared application state.
///
/// Holds no game records itself: every operation reads and writes through
/// the store, so concurrent handlers only share the collaborators.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GameStore>,
    /// Change notifications for connected clients
    pub feed: ChangeFeed,
    /// Anonymous sessions handed out over HTTP
    pub sessions: SessionRegistry,
    pub config: GameConfig,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// In-memory store with the built-in word pool
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), GameConfig::default())
    }

    pub fn with_store(store: Arc<dyn GameStore>, config: GameConfig) -> Self {
        Self {
            store,
            feed: ChangeFeed::new(),
            sessions: SessionRegistry::new(),
            config,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Deterministic random draws (word pairs, odd players, join codes)
    pub fn seeded(self, seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            ..self
        }
    }

    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    /// Run a store call under the configured timeout, leaving store errors untouched
    pub(crate) async fn bounded<T>(
        &self,
        call: impl Future<Output = StoreResult<T>>,
    ) -> GameResult<StoreResult<T>> {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| {
                tracing::error!(
                    "Store call timed out after {:?}",
                    self.config.store_timeout
                );
                GameError::Storage(format!(
                    "store call timed out after {:?}",
                    self.config.store_timeout
                ))
            })
    }

    /// Run a store call under the configured timeout
    pub(crate) async fn store_call<T>(
        &self,
        call: impl Future<Output = StoreResult<T>>,
    ) -> GameResult<T> {
        self.bounded(call).await?.map_err(|e| {
            tracing::error!("Store call failed: {}", e);
            e.into()
        })
    }

    /// Run a phase-guarded clue or vote write. The store re-checks the phase
    /// under its lock, so a submission racing a host transition fails here
    /// even after the caller's own phase check passed.
    pub(crate) async fn guarded_write<T>(
        &self,
        phase: GamePhase,
        call: impl Future<Output = StoreResult<T>>,
    ) -> GameResult<T> {
        match self.bounded(call).await? {
            Ok(record) => Ok(record),
            Err(StoreError::PhaseMismatch { expected, actual }) => {
                tracing::debug!("Submission arrived after the game left {}", expected);
                Err(GameError::WrongPhase { expected, actual })
            }
            Err(StoreError::Conflict(msg)) => {
                tracing::debug!("Submission lost a race with the next round: {}", msg);
                Err(GameError::PhaseConflict { expected: phase })
            }
            Err(e) => {
                tracing::error!("Store call failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub(crate) fn publish(&self, game_id: &GameId, kind: ChangeKind, record: Record) {
        self.feed.publish(game_id, kind, record);
    }

    /// Fetch a game or fail with `NotFound`
    pub(crate) async fn load_game(&self, game_id: &str) -> GameResult<Game> {
        self.store_call(self.store.get_game(game_id))
            .await?
            .ok_or_else(|| GameError::NotFound("Game".to_string()))
    }

    /// Caller must be signed in and be the game's host
    pub(crate) async fn authorize_host(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<Game> {
        let user_id = require_user(identity)?;
        let game = self.load_game(game_id).await?;
        if game.host_id != user_id {
            tracing::warn!(
                "User {} attempted a host action on game {}",
                user_id,
                game.id
            );
            return Err(GameError::NotAuthorized);
        }
        Ok(game)
    }

    /// Caller must be signed in and have joined the game
    pub(crate) async fn require_player(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<Player> {
        let user_id = require_user(identity)?;
        self.store_call(self.store.find_player_by_user(game_id, &user_id))
            .await?
            .ok_or_else(|| GameError::NotFound("Player".to_string()))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::SessionIdentity;

    pub fn host() -> SessionIdentity {
        SessionIdentity::user("host-user")
    }

    pub fn guest(n: usize) -> SessionIdentity {
        SessionIdentity::user(format!("guest-{}", n))
    }

    /// Game in the lobby with the host plus `guests` joined players
    pub async fn lobby(state: &AppState, guests: usize, total_rounds: u32) -> (Game, Vec<Player>) {
        let (game, host_player) = state
            .create_game(&host(), "Host", GameMode::Classic, Some(total_rounds))
            .await
            .unwrap();
        let mut players = vec![host_player];
        for n in 0..guests {
            let (_, player) = state
                .join_game(&guest(n), &game.code, &format!("Guest {}", n))
                .await
                .unwrap();
            players.push(player);
        }
        (game, players)
    }

    /// Identity of the user behind a player
    pub fn identity_of(player: &Player) -> SessionIdentity {
        SessionIdentity::user(player.user_id.clone())
    }
}
