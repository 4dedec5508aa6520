//! Satoshi Flipper - concurrent coin flip engine
//!
//! A player stakes an amount, picks a side, the outcome is resolved and the
//! payout is computed under a fixed 2.5% house edge. The engine keeps
//! per-player streak statistics, a bounded global history and exact
//! fixed-point treasury totals, and stays consistent under many simultaneous
//! flips.

pub mod errors;
pub mod config;
pub mod treasury;
pub mod journal;
pub mod metrics;
pub mod games;
pub mod export;
pub mod simulation;

pub use config::{ConfigLoader, FlipperConfig, ResolverMode};
pub use errors::{FlipError, FlipperError, FlipperResult};
pub use games::{
    DoubleFlipRound, FlipEngine, FlipRound, GameTier, GlobalStats, LeaderboardEntry, LeaderboardMetric,
    PlayerProfile, Side, StreakBonusEngine,
};
pub use treasury::{Amount, Multiplier, SignedAmount};

use std::sync::Arc;

/// Build the engine and its streak extension from a configuration
pub fn build_engine(config: &FlipperConfig) -> Arc<StreakBonusEngine> {
    let engine = FlipEngine::new(&config.engine).with_flip_logging(config.monitoring.log_flips);
    Arc::new(StreakBonusEngine::new(Arc::new(engine), &config.double_flip))
}
