//! Concurrent flip simulation
//!
//! Drives many simultaneous wagers through one engine from blocking worker
//! tasks and reports throughput alongside the resulting treasury totals.

use crate::errors::FlipperResult;
use crate::games::{GlobalStats, LeaderboardEntry, Side, StreakBonusEngine};
use crate::treasury::Amount;
use rand::Rng;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub total_flips: usize,
    pub players: usize,
    pub workers: usize,
    pub wager: Amount,
    /// Every n-th wager of a worker is a double flip; 0 disables them
    pub double_flip_every: usize,
    pub leaderboard_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_flips: 10_000,
            players: 16,
            workers: 4,
            wager: Amount::from_smallest_unit(crate::treasury::UNIT / 10),
            double_flip_every: 0,
            leaderboard_size: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub flips_submitted: u64,
    pub flips_settled: u64,
    pub flips_rejected: u64,
    pub duration: Duration,
    pub flips_per_second: f64,
    pub stats: GlobalStats,
    pub top_by_wins: Vec<LeaderboardEntry>,
    pub top_by_net_profit: Vec<LeaderboardEntry>,
}

pub struct SimulationRunner {
    config: SimulationConfig,
    extension: Arc<StreakBonusEngine>,
}

impl SimulationRunner {
    pub fn new(extension: Arc<StreakBonusEngine>, config: SimulationConfig) -> Self {
        Self { config, extension }
    }

    pub async fn run(&self) -> FlipperResult<SimulationReport> {
        let workers = self.config.workers.max(1);
        let players = self.config.players.max(1);
        info!(
            "Simulating {} flips across {} players with {} workers",
            self.config.total_flips, players, workers
        );

        let start = Instant::now();
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let share = self.config.total_flips / workers
                + usize::from(worker_id < self.config.total_flips % workers);
            let extension = self.extension.clone();
            let wager = self.config.wager;
            let double_every = self.config.double_flip_every;

            handles.push(task::spawn_blocking(move || {
                run_worker(&extension, worker_id, share, players, wager, double_every)
            }));
        }

        let mut submitted = 0u64;
        let mut settled = 0u64;
        for handle in handles {
            match handle.await {
                Ok((worker_submitted, worker_settled)) => {
                    submitted += worker_submitted;
                    settled += worker_settled;
                }
                Err(e) => warn!("Simulation worker failed: {}", e),
            }
        }
        let duration = start.elapsed();

        let engine = self.extension.engine();
        let flips_per_second = if duration.as_secs_f64() > 0.0 {
            settled as f64 / duration.as_secs_f64()
        } else {
            0.0
        };
        Ok(SimulationReport {
            flips_submitted: submitted,
            flips_settled: settled,
            flips_rejected: submitted - settled,
            duration,
            flips_per_second,
            stats: engine.get_global_stats(),
            top_by_wins: engine.leaderboard_by_wins(self.config.leaderboard_size),
            top_by_net_profit: engine.leaderboard_by_net_profit(self.config.leaderboard_size),
        })
    }
}

fn run_worker(
    extension: &StreakBonusEngine,
    worker_id: usize,
    flips: usize,
    players: usize,
    wager: Amount,
    double_every: usize,
) -> (u64, u64) {
    let mut rng = rand::thread_rng();
    let mut settled = 0u64;

    for n in 0..flips {
        let player_id = format!("player-{}", (worker_id + n * 7) % players);
        let choice = if rng.gen::<bool>() { Side::Heads } else { Side::Tails };
        let double = double_every > 0 && extension.double_flip_enabled() && (n + 1) % double_every == 0;

        let result = if double {
            extension
                .execute_double_flip(&player_id, None, wager, choice, choice.opposite())
                .map(|_| ())
        } else {
            extension
                .flip_with_bonus(&player_id, None, wager, choice)
                .map(|_| ())
        };
        if result.is_ok() {
            settled += 1;
        }
    }

    (flips as u64, settled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DoubleFlipConfig;
    use crate::games::{FlipEngine, RandomResolver};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simulation_balances() {
        let engine = Arc::new(FlipEngine::with_resolver(Arc::new(RandomResolver)));
        let extension = Arc::new(StreakBonusEngine::new(engine, &DoubleFlipConfig { enabled: true }));
        let config = SimulationConfig {
            total_flips: 2_001,
            players: 10,
            workers: 4,
            double_flip_every: 5,
            ..Default::default()
        };

        let report = SimulationRunner::new(extension, config).run().await.unwrap();

        assert_eq!(report.flips_submitted, 2_001);
        assert_eq!(report.flips_settled, 2_001);
        assert_eq!(report.stats.total_settlements, 2_001);
        assert_eq!(report.stats.total_wagered, Amount::from_smallest_unit(2_001 * crate::treasury::UNIT / 10));
        assert_eq!(report.stats.unique_players, 10);
        assert_eq!(report.top_by_wins.len(), 5);
    }
}
