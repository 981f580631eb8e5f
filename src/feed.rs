//! Change feed: every successful write publishes a [`ChangeEvent`] so
//! connected clients can stay in sync without polling.

use crate::types::*;
use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the broadcast buffer before slow subscribers start lagging
const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Games,
    Players,
    Rounds,
    Clues,
    Votes,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "table", content = "row", rename_all = "lowercase")]
pub enum Record {
    Game(Game),
    Player(Player),
    Round(Round),
    Clue(Clue),
    Vote(Vote),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChangeEvent {
    pub game_id: GameId,
    pub kind: ChangeKind,
    pub record: Record,
}

impl ChangeEvent {
    pub fn table(&self) -> Table {
        match self.record {
            Record::Game(_) => Table::Games,
            Record::Player(_) => Table::Players,
            Record::Round(_) => Table::Rounds,
            Record::Clue(_) => Table::Clues,
            Record::Vote(_) => Table::Votes,
        }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, game_id: &GameId, kind: ChangeKind, record: Record) {
        let event = ChangeEvent {
            game_id: game_id.clone(),
            kind,
            record,
        };
        tracing::debug!(
            "Feed event: {:?} {:?} for game {}",
            event.kind,
            event.table(),
            game_id
        );
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Subscribe to the events of a single game
    pub fn subscribe(&self, game_id: &GameId) -> GameSubscription {
        GameSubscription {
            game_id: game_id.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GameSubscription {
    game_id: GameId,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl GameSubscription {
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Next event for this game, or `None` once the feed is gone
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.game_id == self.game_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Feed subscriber for game {} lagged, skipped {} events",
                        self.game_id,
                        skipped
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(round_id: &str) -> Vote {
        Vote {
            id: new_id(),
            round_id: round_id.to_string(),
            voter_id: "p1".to_string(),
            suspect_id: "p2".to_string(),
            submitted_at: now_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_subscription_filters_by_game() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(&"g2".to_string());

        feed.publish(&"g1".to_string(), ChangeKind::Insert, Record::Vote(vote("r1")));
        feed.publish(&"g2".to_string(), ChangeKind::Update, Record::Vote(vote("r2")));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.game_id, "g2");
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.table(), Table::Votes);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new();
        feed.publish(&"g1".to_string(), ChangeKind::Insert, Record::Vote(vote("r1")));
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_feed_dropped() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(&"g1".to_string());
        drop(feed);
        assert!(sub.recv().await.is_none());
    }
}
