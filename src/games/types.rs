//! Game vocabulary: sides, wager tiers, streak kinds and settled round records

use crate::treasury::{Amount, UNIT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Coin side, used both for the player's choice and the resolved outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Heads,
    Tails,
}

impl Side {
    pub const fn code(self) -> u8 {
        match self {
            Side::Heads => 0,
            Side::Tails => 1,
        }
    }

    /// Any non-zero code maps to tails
    pub const fn from_code(code: u8) -> Self {
        if code == 0 {
            Side::Heads
        } else {
            Side::Tails
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Side::Heads => "HEADS",
            Side::Tails => "TAILS",
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Side::Heads => Side::Tails,
            Side::Tails => Side::Heads,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Heads => write!(f, "heads"),
            Side::Tails => write!(f, "tails"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heads" | "h" | "0" => Ok(Side::Heads),
            "tails" | "t" | "1" => Ok(Side::Tails),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

/// Wager tier, purely descriptive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum GameTier {
    Peasant,
    Degen,
    Whale,
    Satoshi,
}

impl GameTier {
    pub const ALL: [GameTier; 4] = [GameTier::Peasant, GameTier::Degen, GameTier::Whale, GameTier::Satoshi];

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            GameTier::Peasant => "Peasant",
            GameTier::Degen => "Degen",
            GameTier::Whale => "Whale",
            GameTier::Satoshi => "Satoshi",
        }
    }

    /// Half-open `[min, max)` wager range of the tier
    pub const fn range(self) -> (Amount, Amount) {
        match self {
            GameTier::Peasant => (Amount::from_smallest_unit(UNIT / 100), Amount::from_smallest_unit(UNIT / 2)),
            GameTier::Degen => (Amount::from_smallest_unit(UNIT / 2), Amount::from_coins(2)),
            GameTier::Whale => (Amount::from_coins(2), Amount::from_coins(10)),
            GameTier::Satoshi => (Amount::from_coins(10), Amount::from_coins(100)),
        }
    }

    /// First tier whose range holds the wager; anything else is Satoshi
    pub fn for_wager(wager: Amount) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| {
                let (min, max) = tier.range();
                wager >= min && wager < max
            })
            .unwrap_or(GameTier::Satoshi)
    }
}

impl fmt::Display for GameTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which streak a player is currently on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    None,
    WinStreak,
    LossStreak,
}

/// One resolved single-flip wager. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipRound {
    pub round_id: u64,
    pub player_id: String,
    pub wager: Amount,
    pub choice: Side,
    pub outcome: Side,
    pub won: bool,
    /// Zero on a loss
    pub payout: Amount,
    pub tier: GameTier,
    pub timestamp: DateTime<Utc>,
}

/// One resolved double-flip wager, numbered independently of single flips
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleFlipRound {
    pub round_id: u64,
    pub player_id: String,
    pub wager: Amount,
    pub choices: [Side; 2],
    pub outcomes: [Side; 2],
    /// 0, 1 or 2
    pub wins: u8,
    pub payout: Amount,
    pub timestamp: DateTime<Utc>,
}
