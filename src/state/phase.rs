//! Phase state machine.
//!
//! Every transition is a host action and commits as one conditional store
//! update: if the stored phase moved on in the meantime the transition fails
//! with `PhaseConflict` and nothing is written.

use serde::Serialize;

use super::AppState;
use crate::auth::IdentityProvider;
use crate::error::{GameError, GameResult};
use crate::feed::{ChangeKind, Record};
use crate::scoring::{calculate_scoring, RoundScoring};
use crate::store::{PhaseUpdate, StoreError};
use crate::types::*;

use super::round::should_continue;

/// Result of a committed transition
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransitionOutcome {
    pub game: Game,
    /// Round created by this transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<Round>,
    /// Scoring applied by this transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<RoundScoring>,
}

impl TransitionOutcome {
    fn game(game: Game) -> Self {
        Self {
            game,
            round: None,
            scoring: None,
        }
    }
}

/// Check if a phase transition is allowed at all (preconditions aside)
pub fn is_valid_phase_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;

    match (from, to) {
        (Lobby, Clue) => true,
        (Clue, Voting) => true,
        (Voting, Reveal) => true,
        // Next round
        (Reveal, Clue) => true,

        // Host can end a running game at any point
        (Clue, Finished) | (Voting, Finished) | (Reveal, Finished) => true,

        _ => false,
    }
}

/// Phases the host can move the game to right now
pub fn valid_transitions(game: &Game) -> Vec<GamePhase> {
    use GamePhase::*;

    match game.phase {
        Lobby => vec![Clue],
        Clue => vec![Voting, Finished],
        Voting => vec![Reveal, Finished],
        Reveal if should_continue(game) => vec![Clue, Finished],
        Reveal => vec![Finished],
        Finished => vec![],
    }
}

fn ensure_phase(game: &Game, from: GamePhase, to: GamePhase) -> GameResult<()> {
    if game.phase != from || !is_valid_phase_transition(from, to) {
        return Err(GameError::IllegalTransition {
            from: game.phase,
            to,
        });
    }
    Ok(())
}

impl AppState {
    /// lobby → clue: needs at least three players, creates round 1
    pub async fn start_game(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<TransitionOutcome> {
        let game = self.authorize_host(identity, game_id).await?;
        self.begin_first_round(game).await
    }

    /// clue → voting: needs at least one clue this round
    pub async fn advance_to_voting(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<TransitionOutcome> {
        let game = self.authorize_host(identity, game_id).await?;
        self.open_voting(game).await
    }

    /// voting → reveal: needs at least one vote, scores the round
    pub async fn reveal_and_score(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<TransitionOutcome> {
        let game = self.authorize_host(identity, game_id).await?;
        self.reveal(game).await
    }

    /// reveal → clue with a fresh round, or reveal → finished after the last round
    pub async fn start_next_round(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<TransitionOutcome> {
        let game = self.authorize_host(identity, game_id).await?;
        if game.phase == GamePhase::Reveal && !should_continue(&game) {
            return self.finish(game).await;
        }
        self.begin_next_round(game).await
    }

    /// Host ends the game early (or after the last reveal)
    pub async fn end_game(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
    ) -> GameResult<TransitionOutcome> {
        let game = self.authorize_host(identity, game_id).await?;
        self.finish(game).await
    }

    /// Generic entry point: move the game to `to` if that is a legal step
    pub async fn transition_phase(
        &self,
        identity: &dyn IdentityProvider,
        game_id: &str,
        to: GamePhase,
    ) -> GameResult<TransitionOutcome> {
        let game = self.authorize_host(identity, game_id).await?;
        tracing::info!(
            "Host transitioning game {} from {} to {}",
            game.id,
            game.phase,
            to
        );

        match (game.phase, to) {
            (GamePhase::Lobby, GamePhase::Clue) => self.begin_first_round(game).await,
            (GamePhase::Clue, GamePhase::Voting) => self.open_voting(game).await,
            (GamePhase::Voting, GamePhase::Reveal) => self.reveal(game).await,
            (GamePhase::Reveal, GamePhase::Clue) if should_continue(&game) => {
                self.begin_next_round(game).await
            }
            (_, GamePhase::Finished) => self.finish(game).await,
            (from, to) => Err(GameError::IllegalTransition { from, to }),
        }
    }

    async fn begin_first_round(&self, game: Game) -> GameResult<TransitionOutcome> {
        ensure_phase(&game, GamePhase::Lobby, GamePhase::Clue)?;
        self.commit_new_round(game).await
    }

    async fn begin_next_round(&self, game: Game) -> GameResult<TransitionOutcome> {
        ensure_phase(&game, GamePhase::Reveal, GamePhase::Clue)?;
        if !should_continue(&game) {
            return Err(GameError::IllegalTransition {
                from: game.phase,
                to: GamePhase::Clue,
            });
        }
        self.commit_new_round(game).await
    }

    /// Draw the next round and commit it together with the move to `clue`
    async fn commit_new_round(&self, game: Game) -> GameResult<TransitionOutcome> {
        let players = self.store_call(self.store.list_players(&game.id)).await?;
        let round = self.start_round(&game, &players).await?;

        let update =
            PhaseUpdate::new(&game.id, game.phase, GamePhase::Clue).with_round(round.clone());
        let updated = self.commit(update).await?;

        tracing::info!(
            "Game {} started round {}/{} (odd player {})",
            updated.id,
            round.round_number,
            updated.total_rounds,
            round.odd_player_id
        );
        self.publish(&updated.id, ChangeKind::Insert, Record::Round(round.clone()));
        self.publish(&updated.id, ChangeKind::Update, Record::Game(updated.clone()));

        Ok(TransitionOutcome {
            game: updated,
            round: Some(round),
            scoring: None,
        })
    }

    async fn open_voting(&self, game: Game) -> GameResult<TransitionOutcome> {
        ensure_phase(&game, GamePhase::Clue, GamePhase::Voting)?;

        let round = self.require_current_round(&game).await?;
        let clues = self.store_call(self.store.list_clues(&round.id)).await?;
        if clues.is_empty() {
            return Err(GameError::NoClues);
        }

        let updated = self
            .commit(PhaseUpdate::new(&game.id, GamePhase::Clue, GamePhase::Voting))
            .await?;

        tracing::info!(
            "Game {} round {} open for votes ({} clues)",
            updated.id,
            round.round_number,
            clues.len()
        );
        self.publish(&updated.id, ChangeKind::Update, Record::Game(updated.clone()));
        Ok(TransitionOutcome::game(updated))
    }

    async fn reveal(&self, game: Game) -> GameResult<TransitionOutcome> {
        ensure_phase(&game, GamePhase::Voting, GamePhase::Reveal)?;

        let round = self.require_current_round(&game).await?;
        let votes = self.store_call(self.store.list_votes(&round.id)).await?;
        if votes.is_empty() {
            return Err(GameError::NoVotes);
        }

        let players = self.store_call(self.store.list_players(&game.id)).await?;
        let player_ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let scoring = calculate_scoring(&votes, &round.odd_player_id, &player_ids);

        let deltas = scoring
            .deltas
            .iter()
            .filter(|(_, points)| **points > 0)
            .map(|(id, points)| (id.clone(), *points))
            .collect();

        // Phase change and score batch commit together or not at all, and only
        // if no vote was cast or changed since the votes above were read
        let updated = self
            .commit(
                PhaseUpdate::new(&game.id, GamePhase::Voting, GamePhase::Reveal)
                    .with_scores(deltas)
                    .with_scored_votes(&round.id, votes),
            )
            .await?;

        tracing::info!(
            "Game {} round {} revealed: {}/{} correct votes, odd player {}",
            updated.id,
            round.round_number,
            scoring.correct_votes,
            scoring.total_votes,
            if scoring.odd_player_escaped {
                "escaped"
            } else {
                "caught"
            }
        );

        self.publish(&updated.id, ChangeKind::Update, Record::Game(updated.clone()));
        match self.store_call(self.store.list_players(&updated.id)).await {
            Ok(players) => {
                for player in players
                    .into_iter()
                    .filter(|p| scoring.delta_for(&p.id) > 0)
                {
                    self.publish(&updated.id, ChangeKind::Update, Record::Player(player));
                }
            }
            // Scores are committed; only the notifications are lost
            Err(e) => tracing::warn!("Could not publish score updates: {}", e),
        }

        Ok(TransitionOutcome {
            game: updated,
            round: None,
            scoring: Some(scoring),
        })
    }

    async fn finish(&self, game: Game) -> GameResult<TransitionOutcome> {
        ensure_phase(&game, game.phase, GamePhase::Finished)?;

        let updated = self
            .commit(PhaseUpdate::new(&game.id, game.phase, GamePhase::Finished))
            .await?;

        tracing::info!(
            "Game {} finished after round {}/{}",
            updated.id,
            updated.current_round,
            updated.total_rounds
        );
        self.publish(&updated.id, ChangeKind::Update, Record::Game(updated.clone()));
        Ok(TransitionOutcome::game(updated))
    }

    /// Apply a conditional update; a lost race surfaces as `PhaseConflict`
    async fn commit(&self, update: PhaseUpdate) -> GameResult<Game> {
        let expected = update.from;
        match self.bounded(self.store.transition(update)).await? {
            Ok(game) => Ok(game),
            Err(StoreError::Conflict(msg)) => {
                tracing::warn!("Transition lost a race: {}", msg);
                Err(GameError::PhaseConflict { expected })
            }
            Err(e @ StoreError::PhaseMismatch { .. }) => {
                tracing::warn!("Transition lost a race: {}", e);
                Err(e.into())
            }
            Err(e) => {
                tracing::error!("Transition failed: {}", e);
                Err(e.into())
            }
        }
    }
}
