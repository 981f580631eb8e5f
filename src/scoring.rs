//! Round scoring rules and vote validation.
//!
//! The odd player escapes when fewer than half of all votes point at them.
//! Every voter who found the odd player earns [`CORRECT_VOTE_POINTS`]; an
//! escaped odd player earns [`ESCAPE_BONUS`] and never the voter point.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{PlayerId, Vote};

pub const CORRECT_VOTE_POINTS: u32 = 1;
pub const ESCAPE_BONUS: u32 = 2;

/// Players cannot vote for themselves
pub fn is_vote_valid(voter_id: &str, suspect_id: &str) -> bool {
    voter_id != suspect_id
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoundScoring {
    pub total_votes: usize,
    pub correct_votes: usize,
    pub odd_player_escaped: bool,
    /// Voters who picked the odd player, in vote order
    pub correct_voter_ids: Vec<PlayerId>,
    /// Points to add per player; every player of the round is present
    pub deltas: BTreeMap<PlayerId, u32>,
}

impl RoundScoring {
    pub fn delta_for(&self, player_id: &str) -> u32 {
        self.deltas.get(player_id).copied().unwrap_or(0)
    }
}

/// Compute the outcome of a round from its votes
pub fn calculate_scoring(
    votes: &[Vote],
    odd_player_id: &str,
    all_players: &[PlayerId],
) -> RoundScoring {
    let total_votes = votes.len();

    let mut correct_voter_ids: Vec<PlayerId> = Vec::new();
    for vote in votes.iter().filter(|v| v.suspect_id == odd_player_id) {
        if !correct_voter_ids.contains(&vote.voter_id) {
            correct_voter_ids.push(vote.voter_id.clone());
        }
    }
    let correct_votes = correct_voter_ids.len();

    // correct < total / 2, kept in integers. No votes at all counts as an escape.
    let odd_player_escaped = total_votes == 0 || 2 * correct_votes < total_votes;

    let mut deltas: BTreeMap<PlayerId, u32> =
        all_players.iter().map(|id| (id.clone(), 0)).collect();

    for voter_id in &correct_voter_ids {
        if voter_id != odd_player_id {
            *deltas.entry(voter_id.clone()).or_insert(0) += CORRECT_VOTE_POINTS;
        }
    }
    if odd_player_escaped {
        deltas.insert(odd_player_id.to_string(), ESCAPE_BONUS);
    }

    RoundScoring {
        total_votes,
        correct_votes,
        odd_player_escaped,
        correct_voter_ids,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(voter: &str, suspect: &str) -> Vote {
        Vote {
            id: format!("{}->{}", voter, suspect),
            round_id: "r1".to_string(),
            voter_id: voter.to_string(),
            suspect_id: suspect.to_string(),
            submitted_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn players() -> Vec<PlayerId> {
        ["odd", "p1", "p2", "p3", "p4"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_vote_validity() {
        assert!(!is_vote_valid("p1", "p1"));
        assert!(is_vote_valid("p1", "p2"));
        assert!(is_vote_valid("p2", "p1"));
    }

    #[test]
    fn test_odd_player_escapes_with_one_of_four() {
        let votes = [
            vote("p1", "odd"),
            vote("p2", "p1"),
            vote("p3", "p2"),
            vote("p4", "p3"),
        ];
        let result = calculate_scoring(&votes, "odd", &players());

        assert_eq!(result.correct_votes, 1);
        assert_eq!(result.total_votes, 4);
        assert!(result.odd_player_escaped);
        assert_eq!(result.delta_for("odd"), 2);
        assert_eq!(result.delta_for("p1"), 1);
        assert_eq!(result.delta_for("p2"), 0);
        assert_eq!(result.delta_for("p3"), 0);
        assert_eq!(result.delta_for("p4"), 0);
    }

    #[test]
    fn test_odd_player_caught_by_majority() {
        let votes = [
            vote("p1", "odd"),
            vote("p2", "odd"),
            vote("p3", "odd"),
            vote("p4", "p2"),
        ];
        let result = calculate_scoring(&votes, "odd", &players());

        assert_eq!(result.correct_votes, 3);
        assert!(!result.odd_player_escaped);
        assert_eq!(result.delta_for("odd"), 0);
        assert_eq!(result.delta_for("p1"), 1);
        assert_eq!(result.delta_for("p2"), 1);
        assert_eq!(result.delta_for("p3"), 1);
        assert_eq!(result.delta_for("p4"), 0);
        assert_eq!(result.correct_voter_ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_exactly_half_is_caught() {
        let votes = [vote("p1", "odd"), vote("p2", "p1")];
        let result = calculate_scoring(&votes, "odd", &players());

        assert!(!result.odd_player_escaped);
        assert_eq!(result.delta_for("odd"), 0);
        assert_eq!(result.delta_for("p1"), 1);
        assert_eq!(result.delta_for("p2"), 0);
    }

    #[test]
    fn test_one_of_three_escapes() {
        let votes = [vote("p1", "odd"), vote("p2", "p1"), vote("p3", "p1")];
        let result = calculate_scoring(&votes, "odd", &players());
        assert!(result.odd_player_escaped);
    }

    #[test]
    fn test_zero_votes_is_an_escape() {
        let result = calculate_scoring(&[], "odd", &players());

        assert!(result.odd_player_escaped);
        assert_eq!(result.delta_for("odd"), 2);
        assert!(result.correct_voter_ids.is_empty());
        assert_eq!(result.deltas.values().sum::<u32>(), 2);
    }

    #[test]
    fn test_every_player_gets_an_entry() {
        let votes = [vote("p1", "odd")];
        let result = calculate_scoring(&votes, "odd", &players());
        assert_eq!(result.deltas.len(), players().len());
    }

    #[test]
    fn test_odd_player_never_gets_voter_point() {
        // A malformed self-vote must not let the odd player stack both bonuses
        let votes = [vote("odd", "odd"), vote("p1", "p2"), vote("p2", "p1")];
        let result = calculate_scoring(&votes, "odd", &players());
        assert!(result.odd_player_escaped);
        assert_eq!(result.delta_for("odd"), 2);

        let votes = [vote("odd", "odd"), vote("p1", "odd")];
        let result = calculate_scoring(&votes, "odd", &players());
        assert!(!result.odd_player_escaped);
        assert_eq!(result.delta_for("odd"), 0);
        assert_eq!(result.delta_for("p1"), 1);
    }

    #[test]
    fn test_escape_matches_half_rule_for_all_splits() {
        for total in 0..8usize {
            for correct in 0..=total {
                let mut votes = Vec::new();
                for i in 0..total {
                    let suspect = if i < correct { "odd" } else { "p1" };
                    votes.push(vote(&format!("v{}", i), suspect));
                }
                let result = calculate_scoring(&votes, "odd", &players());
                let expected = total == 0 || (correct as f64) < (total as f64) / 2.0;
                assert_eq!(result.odd_player_escaped, expected, "{}/{}", correct, total);

                let odd_delta = result.delta_for("odd");
                assert!(odd_delta == 0 || odd_delta == ESCAPE_BONUS);
            }
        }
    }
}
