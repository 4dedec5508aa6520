//! Leaderboards over the player map
//!
//! Read-only and eventually consistent with flips still in flight. Each entry
//! is taken under its own profile lock, so an entry is internally consistent.
//! Equal keys are ordered by player id ascending.

use crate::games::engine::FlipEngine;
use crate::games::profile::PlayerProfile;
use crate::treasury::{Amount, SignedAmount};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    Wins,
    Wagered,
    NetProfit,
}

/// Journal-free projection of a player profile, ranked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: String,
    pub display_name: String,
    pub total_flips: u64,
    pub total_wins: u64,
    pub current_win_streak: u32,
    pub max_win_streak: u32,
    pub total_wagered: Amount,
    pub total_paid: Amount,
    pub net_profit: SignedAmount,
}

impl LeaderboardEntry {
    fn from_profile(profile: &PlayerProfile) -> Self {
        Self {
            rank: 0,
            player_id: profile.player_id().to_string(),
            display_name: profile.display_name().to_string(),
            total_flips: profile.total_flips(),
            total_wins: profile.total_wins(),
            current_win_streak: profile.current_win_streak(),
            max_win_streak: profile.max_win_streak(),
            total_wagered: profile.total_wagered(),
            total_paid: profile.total_paid(),
            net_profit: profile.net_profit(),
        }
    }

    fn compare(&self, other: &Self, metric: LeaderboardMetric) -> Ordering {
        let by_metric = match metric {
            LeaderboardMetric::Wins => other.total_wins.cmp(&self.total_wins),
            LeaderboardMetric::Wagered => other.total_wagered.cmp(&self.total_wagered),
            LeaderboardMetric::NetProfit => other.net_profit.cmp(&self.net_profit),
        };
        by_metric.then_with(|| self.player_id.cmp(&other.player_id))
    }
}

impl FlipEngine {
    /// Top `limit` players by the given metric, best first
    pub fn leaderboard(&self, metric: LeaderboardMetric, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .profile_handles()
            .iter()
            .map(|handle| LeaderboardEntry::from_profile(&FlipEngine::lock_profile(handle)))
            .collect();

        entries.sort_by(|a, b| a.compare(b, metric));
        entries.truncate(limit);
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }
        entries
    }

    pub fn leaderboard_by_wins(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard(LeaderboardMetric::Wins, limit)
    }

    pub fn leaderboard_by_wagered(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard(LeaderboardMetric::Wagered, limit)
    }

    pub fn leaderboard_by_net_profit(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard(LeaderboardMetric::NetProfit, limit)
    }
}
