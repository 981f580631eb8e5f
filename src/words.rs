//! Word pair pool and the random selection of a round's words.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;

use crate::error::{GameError, GameResult};
use crate::types::WordPair;

/// Built-in pairs: (group word, odd word, category)
const DEFAULT_PAIRS: &[(&str, &str, &str)] = &[
    ("Cat", "Dog", "Animals"),
    ("Lion", "Tiger", "Animals"),
    ("Dolphin", "Shark", "Animals"),
    ("Owl", "Eagle", "Animals"),
    ("Pizza", "Burger", "Food"),
    ("Sushi", "Tacos", "Food"),
    ("Pancake", "Waffle", "Food"),
    ("Apple", "Pear", "Food"),
    ("Coffee", "Tea", "Drinks"),
    ("Wine", "Beer", "Drinks"),
    ("Beach", "Desert", "Places"),
    ("Library", "Museum", "Places"),
    ("Airport", "Train Station", "Places"),
    ("Hospital", "School", "Places"),
    ("Guitar", "Violin", "Music"),
    ("Piano", "Drums", "Music"),
    ("Football", "Rugby", "Sports"),
    ("Tennis", "Badminton", "Sports"),
    ("Skiing", "Snowboarding", "Sports"),
    ("Doctor", "Nurse", "Jobs"),
    ("Firefighter", "Police Officer", "Jobs"),
    ("Winter", "Autumn", "Seasons"),
    ("Moon", "Sun", "Space"),
    ("Rocket", "Airplane", "Vehicles"),
    ("Bicycle", "Motorcycle", "Vehicles"),
    ("Castle", "Palace", "Buildings"),
    ("Vampire", "Zombie", "Monsters"),
    ("Smartphone", "Laptop", "Tech"),
];

/// Entry in a word pair JSON file
#[derive(Debug, Deserialize)]
struct WordPairEntry {
    group_word: String,
    odd_word: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WordPoolError {
    #[error("Failed to read word pair file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse word pair file: {0}")]
    Parse(#[from] serde_json::Error),
}

fn make_pair(group_word: &str, odd_word: &str, category: Option<&str>) -> Option<WordPair> {
    let group_word = group_word.trim();
    let odd_word = odd_word.trim();
    if group_word.is_empty()
        || odd_word.is_empty()
        || group_word.to_lowercase() == odd_word.to_lowercase()
    {
        return None;
    }
    Some(WordPair {
        id: ulid::Ulid::new().to_string(),
        group_word: group_word.to_string(),
        odd_word: odd_word.to_string(),
        category: category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    })
}

pub fn default_pool() -> Vec<WordPair> {
    DEFAULT_PAIRS
        .iter()
        .filter_map(|(group, odd, category)| make_pair(group, odd, Some(category)))
        .collect()
}

/// Load a pool from a JSON array of `{group_word, odd_word, category?}`.
/// Entries with a blank word or two identical words are dropped.
pub fn load_pool(path: &Path) -> Result<Vec<WordPair>, WordPoolError> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<WordPairEntry> = serde_json::from_str(&raw)?;
    let total = entries.len();

    let pool: Vec<WordPair> = entries
        .iter()
        .filter_map(|e| make_pair(&e.group_word, &e.odd_word, e.category.as_deref()))
        .collect();

    if pool.len() < total {
        tracing::warn!(
            "Dropped {} invalid word pairs from {}",
            total - pool.len(),
            path.display()
        );
    }
    tracing::info!("Loaded {} word pairs from {}", pool.len(), path.display());
    Ok(pool)
}

/// Pick one pair uniformly at random
pub fn select_word_pair<R: Rng + ?Sized>(pool: &[WordPair], rng: &mut R) -> GameResult<WordPair> {
    pool.choose(rng).cloned().ok_or(GameError::PoolExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::io::Write;

    #[test]
    fn test_default_pool_is_valid() {
        let pool = default_pool();
        assert_eq!(pool.len(), DEFAULT_PAIRS.len());
        assert!(pool.iter().all(|p| p.group_word != p.odd_word));
        assert!(pool.iter().all(|p| p.category.is_some()));
    }

    #[test]
    fn test_select_from_empty_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            select_word_pair(&[], &mut rng),
            Err(GameError::PoolExhausted)
        );
    }

    #[test]
    fn test_select_covers_pool() {
        let pool = default_pool();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let pair = select_word_pair(&pool, &mut rng).unwrap();
            seen.insert(pair.id);
        }
        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn test_load_pool_drops_invalid_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"group_word": "Salt", "odd_word": "Pepper", "category": "Kitchen"}},
                {{"group_word": "Same", "odd_word": "same"}},
                {{"group_word": " ", "odd_word": "Blank"}},
                {{"group_word": "Ketchup", "odd_word": "Mustard"}}
            ]"#
        )
        .unwrap();

        let pool = load_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].category.as_deref(), Some("Kitchen"));
        assert_eq!(pool[1].category, None);
    }

    #[test]
    fn test_load_pool_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load_pool(file.path()),
            Err(WordPoolError::Parse(_))
        ));
        assert!(matches!(
            load_pool(Path::new("/definitely/not/here.json")),
            Err(WordPoolError::Io(_))
        ));
    }
}
