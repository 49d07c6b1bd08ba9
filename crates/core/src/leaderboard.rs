//! Leaderboard ranking.

use serde::{Deserialize, Serialize};

use crate::pagination;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// The metric a leaderboard ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardType {
    #[default]
    Completion,
    Streak,
    Time,
}

impl LeaderboardType {
    /// Lenient parse: unknown or missing values rank by completion.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("streak") => Self::Streak,
            Some("time") => Self::Time,
            _ => Self::Completion,
        }
    }
}

/// Per-user totals a leaderboard can rank by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScore {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub items_completed: i64,
    pub current_streak: i64,
    pub total_time_spent: i64,
}

impl UserScore {
    pub fn score(&self, kind: LeaderboardType) -> i64 {
        match kind {
            LeaderboardType::Completion => self.items_completed,
            LeaderboardType::Streak => self.current_streak,
            LeaderboardType::Time => self.total_time_spent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub score: i64,
    #[serde(flatten)]
    pub user: UserScore,
}

/// Clamp a requested limit into `1..=MAX_LEADERBOARD_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> usize {
    pagination::clamp_limit(limit, DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT) as usize
}

/// Rank users by the selected metric, highest first.
///
/// The sort is stable, so users with equal scores keep their input order.
/// Ranks are 1-based positions in the result, ties included.
pub fn rank(mut users: Vec<UserScore>, kind: LeaderboardType, limit: usize) -> Vec<LeaderboardEntry> {
    users.sort_by(|a, b| b.score(kind).cmp(&a.score(kind)));
    users
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, user)| LeaderboardEntry {
            rank: i + 1,
            score: user.score(kind),
            user,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, completed: i64) -> UserScore {
        UserScore {
            user_id: id,
            username: format!("user{id}"),
            display_name: format!("User {id}"),
            avatar: None,
            items_completed: completed,
            current_streak: 0,
            total_time_spent: completed * 10,
        }
    }

    #[test]
    fn ranks_descending_with_positions() {
        let ranked = rank(
            vec![user(1, 5), user(2, 10), user(3, 3)],
            LeaderboardType::Completion,
            50,
        );
        let scores: Vec<i64> = ranked.iter().map(|e| e.score).collect();
        let ranks: Vec<usize> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(scores, vec![10, 5, 3]);
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank(
            vec![user(1, 4), user(2, 4), user(3, 9)],
            LeaderboardType::Completion,
            50,
        );
        let ids: Vec<i64> = ranked.iter().map(|e| e.user.user_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn limit_truncates() {
        let ranked = rank(
            (1..=10).map(|i| user(i, i)).collect(),
            LeaderboardType::Time,
            3,
        );
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].score, 100);
    }

    #[test]
    fn unknown_type_falls_back_to_completion() {
        assert_eq!(LeaderboardType::parse(Some("karma")), LeaderboardType::Completion);
        assert_eq!(LeaderboardType::parse(None), LeaderboardType::Completion);
        assert_eq!(LeaderboardType::parse(Some("streak")), LeaderboardType::Streak);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(500)), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
    }
}
