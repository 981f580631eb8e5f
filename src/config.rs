//! Runtime configuration loaded from environment variables (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::types::{DEFAULT_TOTAL_ROUNDS, MAX_TOTAL_ROUNDS};

/// Tunables for game operations
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Longest clue accepted, in characters (after trimming)
    pub max_clue_chars: usize,
    /// Round count used when a game is created without one
    pub default_total_rounds: u32,
    /// Upper bound on every store call
    pub store_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_clue_chars: 200,
            default_total_rounds: DEFAULT_TOTAL_ROUNDS,
            store_timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// JSON file with word pairs replacing the built-in pool
    pub word_pairs_path: Option<PathBuf>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            word_pairs_path: None,
            game: GameConfig::default(),
        }
    }
}

/// Read and parse an env var, warning and falling back on garbage
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let word_pairs_path = std::env::var("WORD_PAIRS_PATH").ok().and_then(|path| {
            let trimmed = path.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        });

        let mut default_total_rounds =
            env_parse("DEFAULT_TOTAL_ROUNDS", defaults.game.default_total_rounds);
        if !(1..=MAX_TOTAL_ROUNDS).contains(&default_total_rounds) {
            tracing::warn!(
                "DEFAULT_TOTAL_ROUNDS must be between 1 and {}, using {}",
                MAX_TOTAL_ROUNDS,
                DEFAULT_TOTAL_ROUNDS
            );
            default_total_rounds = DEFAULT_TOTAL_ROUNDS;
        }

        Self {
            port: env_parse("PORT", defaults.port),
            word_pairs_path,
            game: GameConfig {
                max_clue_chars: env_parse("MAX_CLUE_CHARS", defaults.game.max_clue_chars),
                default_total_rounds,
                store_timeout: Duration::from_millis(env_parse(
                    "STORE_TIMEOUT_MS",
                    defaults.game.store_timeout.as_millis() as u64,
                )),
            },
        }
    }
}
