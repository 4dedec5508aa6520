//! Flip engine
//!
//! One flip moves `Requested → Validated → Resolved → Settled`. Validation runs
//! before any state is touched, so a rejected wager leaves no trace.
//!
//! Lock order is always player profile first, then the global ledger. Nothing
//! takes the ledger lock and then a profile lock. Round ids and timestamps are
//! drawn while both are held, so every history sees rounds in id order.

use crate::config::EngineConfig;
use crate::errors::FlipError;
use crate::games::profile::PlayerProfile;
use crate::games::resolver::{resolver_for, OutcomeResolver, ResolveContext};
use crate::games::types::{FlipRound, GameTier, Side};
use crate::journal::BoundedJournal;
use crate::metrics::FlipMonitor;
use crate::treasury::{self, Amount, MAX_BET, MIN_BET};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use tracing::{debug, info, warn};

/// Rounds kept in the global history
pub const GLOBAL_HISTORY_CAP: usize = 2000;

/// Longest accepted player id, in bytes
pub const MAX_PLAYER_ID_LEN: usize = 64;

const FLIP_SCOPE: &str = "flip";

/// Point-in-time view of the engine-wide totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Single flips settled
    pub total_rounds: u64,
    /// Every wager settled, single flips and extension wagers alike
    pub total_settlements: u64,
    pub total_wagered: Amount,
    pub total_paid_out: Amount,
    pub house_collected: Amount,
    pub unique_players: usize,
}

/// Streak counters of a player right after a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub win_streak: u32,
    pub loss_streak: u32,
}

/// Money movement of one settled wager
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settlement {
    pub wager: Amount,
    pub payout: Amount,
    pub won: bool,
}

/// What a wager resolved to, built while the settlement locks are held
pub(crate) struct Draft<T> {
    pub settlement: Settlement,
    /// Flip round for the single-flip histories, if any
    pub round: Option<FlipRound>,
    pub value: T,
}

struct Ledger {
    total_rounds: u64,
    total_settlements: u64,
    total_wagered: Amount,
    total_paid_out: Amount,
    house_collected: Amount,
    history: BoundedJournal<FlipRound>,
}

impl Ledger {
    fn new() -> Self {
        Self {
            total_rounds: 0,
            total_settlements: 0,
            total_wagered: Amount::ZERO,
            total_paid_out: Amount::ZERO,
            house_collected: Amount::ZERO,
            history: BoundedJournal::with_capacity(GLOBAL_HISTORY_CAP),
        }
    }

    fn book(&mut self, settlement: &Settlement) {
        self.total_settlements += 1;
        self.total_wagered = self.total_wagered.saturating_add(settlement.wager);
        self.total_paid_out = self.total_paid_out.saturating_add(settlement.payout);
        if !settlement.won {
            self.house_collected = self
                .house_collected
                .saturating_add(treasury::house_take_on_loss(settlement.wager));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Every critical section leaves its data consistent, so a poisoned lock is still usable.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe coin flip engine
pub struct FlipEngine {
    resolver: Arc<dyn OutcomeResolver>,
    /// Last assigned round id
    round_counter: AtomicU64,
    players: DashMap<String, Arc<Mutex<PlayerProfile>>>,
    ledger: Mutex<Ledger>,
    monitor: FlipMonitor,
    log_flips: bool,
}

impl FlipEngine {
    /// Create an engine using the resolver selected by configuration
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_resolver(resolver_for(config))
    }

    pub fn with_resolver(resolver: Arc<dyn OutcomeResolver>) -> Self {
        info!("Flip engine ready (resolver: {})", resolver.name());
        Self {
            resolver,
            round_counter: AtomicU64::new(0),
            players: DashMap::new(),
            ledger: Mutex::new(Ledger::new()),
            monitor: FlipMonitor::new(),
            log_flips: false,
        }
    }

    /// Emit a debug event for every settled flip
    pub fn with_flip_logging(mut self, enabled: bool) -> Self {
        self.log_flips = enabled;
        self
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    pub fn monitor(&self) -> &FlipMonitor {
        &self.monitor
    }

    /// Place a wager, resolve it and settle it
    pub fn execute_flip(
        &self,
        player_id: &str,
        display_name: Option<&str>,
        wager: Amount,
        choice: Side,
    ) -> Result<FlipRound, FlipError> {
        self.execute_flip_recorded(player_id, display_name, wager, choice, |_, _| {})
            .map(|(round, _)| round)
    }

    /// Flip and hand the settled round with its streak to `record` while the
    /// round is still inside the ordered section
    pub(crate) fn execute_flip_recorded(
        &self,
        player_id: &str,
        display_name: Option<&str>,
        wager: Amount,
        choice: Side,
        record: impl FnOnce(&FlipRound, StreakState),
    ) -> Result<(FlipRound, StreakState), FlipError> {
        self.guard(validate_player_id(player_id).and_then(|_| validate_wager(wager)))?;

        let (round, streak) = self.settle_ordered(
            player_id,
            display_name,
            || {
                let round_id = self.round_counter.fetch_add(1, Ordering::SeqCst) + 1;
                let timestamp = Utc::now();
                let outcome = self.resolve(&ResolveContext {
                    round_id,
                    player_id,
                    timestamp,
                    scope: FLIP_SCOPE,
                });
                let won = choice == outcome;
                let payout = if won { treasury::win_payout(wager) } else { Amount::ZERO };
                let round = FlipRound {
                    round_id,
                    player_id: player_id.to_string(),
                    wager,
                    choice,
                    outcome,
                    won,
                    payout,
                    tier: GameTier::for_wager(wager),
                    timestamp,
                };
                Draft {
                    settlement: Settlement { wager, payout, won },
                    round: Some(round.clone()),
                    value: round,
                }
            },
            record,
        );

        if self.log_flips {
            debug!(
                round_id = round.round_id,
                player = player_id,
                wager = %wager,
                payout = %round.payout,
                won = round.won,
                "flip settled"
            );
        }
        Ok((round, streak))
    }

    /// Reject through the monitor so refusals are counted and logged in one place
    pub(crate) fn guard(&self, check: Result<(), FlipError>) -> Result<(), FlipError> {
        if let Err(ref e) = check {
            self.monitor.record_rejected();
            warn!("Rejected wager: {}", e);
        }
        check
    }

    pub(crate) fn resolve(&self, ctx: &ResolveContext<'_>) -> Side {
        self.resolver.resolve(ctx)
    }

    /// Settle one wager inside the ordered section.
    ///
    /// Holds the player lock and then the ledger lock while `draft` runs, so
    /// round ids drawn inside it reach every journal in id order. `record`
    /// runs before the locks are released.
    pub(crate) fn settle_ordered<T>(
        &self,
        player_id: &str,
        display_name: Option<&str>,
        draft: impl FnOnce() -> Draft<T>,
        record: impl FnOnce(&T, StreakState),
    ) -> (T, StreakState) {
        let handle = self.profile_handle(player_id, display_name);
        let mut profile = lock(&handle);
        let mut ledger = lock(&self.ledger);

        let Draft { settlement, round, value } = draft();

        if settlement.won {
            profile.record_win(settlement.wager, settlement.payout);
        } else {
            profile.record_loss(settlement.wager);
        }
        ledger.book(&settlement);
        if let Some(round) = round {
            ledger.total_rounds += 1;
            ledger.history.push(round.clone());
            profile.append_round(round);
        }

        let streak = StreakState {
            win_streak: profile.current_win_streak(),
            loss_streak: profile.current_loss_streak(),
        };
        record(&value, streak);

        drop(ledger);
        drop(profile);
        self.monitor.record_settled();
        (value, streak)
    }

    /// Shared handle to the live profile, created atomically on first sight
    fn profile_handle(&self, player_id: &str, display_name: Option<&str>) -> Arc<Mutex<PlayerProfile>> {
        let name = display_name.map(str::trim).filter(|name| !name.is_empty());

        if let Some(existing) = self.players.get(player_id) {
            let handle = existing.value().clone();
            drop(existing);
            if let Some(name) = name {
                lock(&handle).set_display_name(name);
            }
            return handle;
        }

        let handle = self
            .players
            .entry(player_id.to_string())
            .or_insert_with(|| {
                let name = name
                    .map(str::to_string)
                    .unwrap_or_else(|| PlayerProfile::default_display_name(player_id));
                debug!("New player {} ({})", player_id, name);
                Arc::new(Mutex::new(PlayerProfile::new(player_id, name)))
            })
            .value()
            .clone();
        if let Some(name) = name {
            lock(&handle).set_display_name(name);
        }
        handle
    }

    /// Snapshot of a player's profile, if the player has ever flipped
    pub fn get_player(&self, player_id: &str) -> Option<PlayerProfile> {
        let handle = self.players.get(player_id).map(|entry| entry.value().clone())?;
        let snapshot = lock(&handle).clone();
        Some(snapshot)
    }

    /// Snapshot of a player's profile, registering the player if unknown
    pub fn get_or_create_player(
        &self,
        player_id: &str,
        display_name: Option<&str>,
    ) -> Result<PlayerProfile, FlipError> {
        validate_player_id(player_id)?;
        let handle = self.profile_handle(player_id, display_name);
        let snapshot = lock(&handle).clone();
        Ok(snapshot)
    }

    /// The most recent `limit` rounds, oldest first
    pub fn get_global_history(&self, limit: usize) -> Vec<FlipRound> {
        lock(&self.ledger).history.latest(limit)
    }

    pub fn get_global_stats(&self) -> GlobalStats {
        let unique_players = self.players.len();
        let ledger = lock(&self.ledger);
        GlobalStats {
            total_rounds: ledger.total_rounds,
            total_settlements: ledger.total_settlements,
            total_wagered: ledger.total_wagered,
            total_paid_out: ledger.total_paid_out,
            house_collected: ledger.house_collected,
            unique_players,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Handles to every live profile, collected without holding map locks afterwards
    pub(crate) fn profile_handles(&self) -> Vec<Arc<Mutex<PlayerProfile>>> {
        self.players.iter().map(|entry| entry.value().clone()).collect()
    }

    pub(crate) fn lock_profile(handle: &Mutex<PlayerProfile>) -> MutexGuard<'_, PlayerProfile> {
        lock(handle)
    }
}

pub(crate) fn validate_player_id(player_id: &str) -> Result<(), FlipError> {
    if player_id.trim().is_empty() {
        return Err(FlipError::InvalidPlayerId {
            reason: "player id is empty".to_string(),
        });
    }
    if player_id.len() > MAX_PLAYER_ID_LEN {
        return Err(FlipError::InvalidPlayerId {
            reason: format!("player id longer than {} bytes", MAX_PLAYER_ID_LEN),
        });
    }
    Ok(())
}

fn validate_wager(wager: Amount) -> Result<(), FlipError> {
    if wager < MIN_BET {
        return Err(FlipError::BetTooLow { wager, min: MIN_BET });
    }
    if wager > MAX_BET {
        return Err(FlipError::BetTooHigh { wager, max: MAX_BET });
    }
    Ok(())
}
