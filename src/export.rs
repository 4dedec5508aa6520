//! JSON export of rounds and leaderboards
//!
//! Amounts are written as decimal strings and timestamps as RFC 3339, so an
//! export read back yields identical records.

use crate::errors::FlipperResult;
use crate::games::{DoubleFlipRound, FlipRound, LeaderboardEntry};

pub fn rounds_to_json(rounds: &[FlipRound]) -> FlipperResult<String> {
    Ok(serde_json::to_string_pretty(rounds)?)
}

pub fn rounds_from_json(json: &str) -> FlipperResult<Vec<FlipRound>> {
    Ok(serde_json::from_str(json)?)
}

pub fn double_flips_to_json(rounds: &[DoubleFlipRound]) -> FlipperResult<String> {
    Ok(serde_json::to_string_pretty(rounds)?)
}

pub fn leaderboard_to_json(entries: &[LeaderboardEntry]) -> FlipperResult<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

pub fn leaderboard_from_json(json: &str) -> FlipperResult<Vec<LeaderboardEntry>> {
    Ok(serde_json::from_str(json)?)
}
