//! Per-player counters and recent-round journal
//!
//! Only the engine mutates a live profile, always under that profile's lock.
//! Everything handed to callers is a cloned snapshot.

use crate::games::types::{FlipRound, StreakType};
use crate::journal::BoundedJournal;
use crate::treasury::{Amount, SignedAmount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recent rounds kept per player
pub const PLAYER_JOURNAL_CAP: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    player_id: String,
    display_name: String,
    total_flips: u64,
    total_wins: u64,
    current_win_streak: u32,
    current_loss_streak: u32,
    max_win_streak: u32,
    max_loss_streak: u32,
    total_wagered: Amount,
    total_paid: Amount,
    created_at: DateTime<Utc>,
    last_active: Option<DateTime<Utc>>,
    recent_rounds: BoundedJournal<FlipRound>,
}

impl PlayerProfile {
    pub fn new(player_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            display_name: display_name.into(),
            total_flips: 0,
            total_wins: 0,
            current_win_streak: 0,
            current_loss_streak: 0,
            max_win_streak: 0,
            max_loss_streak: 0,
            total_wagered: Amount::ZERO,
            total_paid: Amount::ZERO,
            created_at: Utc::now(),
            last_active: None,
            recent_rounds: BoundedJournal::with_capacity(PLAYER_JOURNAL_CAP),
        }
    }

    /// Name shown when a player never supplied one
    pub fn default_display_name(player_id: &str) -> String {
        let short: String = player_id.chars().take(8).collect();
        format!("Player_{}", short)
    }

    pub fn record_win(&mut self, wager: Amount, payout: Amount) {
        self.total_flips += 1;
        self.total_wins += 1;
        self.current_win_streak += 1;
        self.current_loss_streak = 0;
        self.max_win_streak = self.max_win_streak.max(self.current_win_streak);
        self.total_wagered = self.total_wagered.saturating_add(wager);
        self.total_paid = self.total_paid.saturating_add(payout);
        self.last_active = Some(Utc::now());
    }

    pub fn record_loss(&mut self, wager: Amount) {
        self.total_flips += 1;
        self.current_loss_streak += 1;
        self.current_win_streak = 0;
        self.max_loss_streak = self.max_loss_streak.max(self.current_loss_streak);
        self.total_wagered = self.total_wagered.saturating_add(wager);
        self.last_active = Some(Utc::now());
    }

    pub fn append_round(&mut self, round: FlipRound) {
        self.recent_rounds.push(round);
    }

    pub(crate) fn set_display_name(&mut self, name: &str) {
        if self.display_name != name {
            self.display_name = name.to_string();
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn total_flips(&self) -> u64 {
        self.total_flips
    }

    pub fn total_wins(&self) -> u64 {
        self.total_wins
    }

    pub fn total_losses(&self) -> u64 {
        self.total_flips - self.total_wins
    }

    pub fn current_win_streak(&self) -> u32 {
        self.current_win_streak
    }

    pub fn current_loss_streak(&self) -> u32 {
        self.current_loss_streak
    }

    pub fn max_win_streak(&self) -> u32 {
        self.max_win_streak
    }

    pub fn max_loss_streak(&self) -> u32 {
        self.max_loss_streak
    }

    pub fn streak_type(&self) -> StreakType {
        if self.current_win_streak > 0 {
            StreakType::WinStreak
        } else if self.current_loss_streak > 0 {
            StreakType::LossStreak
        } else {
            StreakType::None
        }
    }

    pub fn total_wagered(&self) -> Amount {
        self.total_wagered
    }

    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }

    /// `total_paid − total_wagered`
    pub fn net_profit(&self) -> SignedAmount {
        SignedAmount::difference(self.total_paid, self.total_wagered)
    }

    /// Fraction of flips won, 0.0 before the first flip
    pub fn win_rate(&self) -> f64 {
        if self.total_flips == 0 {
            0.0
        } else {
            self.total_wins as f64 / self.total_flips as f64
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.last_active
    }

    pub fn recent_rounds(&self) -> &BoundedJournal<FlipRound> {
        &self.recent_rounds
    }
}
