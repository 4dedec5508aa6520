pub mod types;
pub mod resolver;
pub mod profile;
pub mod engine;
pub mod streak_bonus;
pub mod leaderboard;

pub use types::*;
pub use resolver::{HashResolver, OutcomeResolver, RandomResolver, ResolveContext, ScriptedResolver};
pub use profile::PlayerProfile;
pub use engine::{FlipEngine, GlobalStats};
pub use streak_bonus::StreakBonusEngine;
pub use leaderboard::{LeaderboardEntry, LeaderboardMetric};
