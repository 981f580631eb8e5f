//! Identity for game operations.
//!
//! The game core only needs "who is calling": a stable [`UserId`] or nothing.
//! Anonymous sessions are minted over HTTP and presented again as a token
//! when opening the websocket.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{GameError, GameResult};
use crate::types::UserId;

/// Source of the calling user's identity
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Identity bound to one connection/request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionIdentity {
    user_id: Option<UserId>,
}

impl SessionIdentity {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}

/// Resolve the caller or fail with `NotAuthenticated`
pub fn require_user(identity: &dyn IdentityProvider) -> GameResult<UserId> {
    identity
        .current_user_id()
        .ok_or(GameError::NotAuthenticated)
}

/// Freshly issued anonymous session
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
}

/// Sessions kept before the oldest are evicted
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Default)]
struct Sessions {
    by_token: HashMap<String, UserId>,
    /// tokens in issue order, oldest first
    issued: VecDeque<String>,
}

/// Session tokens -> user ids. Holds at most `capacity` sessions; issuing
/// past that evicts the oldest, whose token then resolves as anonymous.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<Sessions>>,
    capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            capacity: capacity.max(1),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.by_token.len()
    }

    /// Mint a new anonymous user
    pub async fn issue(&self) -> Session {
        let session = Session {
            user_id: ulid::Ulid::new().to_string(),
            token: ulid::Ulid::new().to_string(),
        };
        let mut sessions = self.sessions.write().await;
        while sessions.issued.len() >= self.capacity {
            let Some(oldest) = sessions.issued.pop_front() else {
                break;
            };
            sessions.by_token.remove(&oldest);
            tracing::debug!("Session registry full, evicted the oldest session");
        }
        sessions
            .by_token
            .insert(session.token.clone(), session.user_id.clone());
        sessions.issued.push_back(session.token.clone());
        drop(sessions);

        tracing::info!("Issued session for user {}", session.user_id);
        session
    }

    /// Identity for a presented token; unknown or missing tokens are anonymous
    pub async fn resolve(&self, token: Option<&str>) -> SessionIdentity {
        let Some(token) = token else {
            return SessionIdentity::anonymous();
        };
        match self.sessions.read().await.by_token.get(token) {
            Some(user_id) => SessionIdentity::user(user_id.clone()),
            None => {
                tracing::warn!("Unknown session token presented");
                SessionIdentity::anonymous()
            }
        }
    }
}
