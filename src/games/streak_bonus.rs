//! Streak bonus and double-flip layer
//!
//! Wraps a shared [`FlipEngine`]. Bonuses are computed here but never booked by
//! the base engine; double flips resolve two outcomes and settle through the
//! engine's own player-then-ledger path. The extension journals are locked
//! last, inside that section, so their entries follow round-id order.

use crate::config::DoubleFlipConfig;
use crate::errors::FlipError;
use crate::games::engine::{validate_player_id, Draft, FlipEngine, Settlement, StreakState, GLOBAL_HISTORY_CAP};
use crate::games::resolver::ResolveContext;
use crate::games::types::{DoubleFlipRound, FlipRound, Side};
use crate::journal::BoundedJournal;
use crate::treasury::{
    self, Amount, Multiplier, BPS_DENOM, DOUBLE_FLIP_MAX_BET, DOUBLE_FLIP_MIN_BET, DOUBLE_WIN_BONUS_BPS,
    STREAK_BONUS_CAP_BPS, STREAK_BONUS_STEP_BPS, STREAK_BONUS_THRESHOLD,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use tracing::info;

/// Streak entries kept for analytics
pub const STREAK_JOURNAL_CAP: usize = 10;

const DOUBLE_FLIP_FEATURE: &str = "double flip";
const DOUBLE_FLIP_SCOPES: [&str; 2] = ["double-flip:0", "double-flip:1"];

/// Payout multiplier earned by a win streak.
///
/// 1.0 below the threshold, then +0.5% per win past the third, capped at +5%.
pub fn multiplier_for_win_streak(streak: u32) -> Multiplier {
    if streak < STREAK_BONUS_THRESHOLD {
        return Multiplier::ONE;
    }
    let steps = u128::from(streak - STREAK_BONUS_THRESHOLD);
    let bonus = steps.saturating_mul(STREAK_BONUS_STEP_BPS).min(STREAK_BONUS_CAP_BPS);
    Multiplier::from_bps(BPS_DENOM + bonus)
}

/// Base payout scaled by the streak multiplier, truncated
pub fn apply_streak_bonus(base_payout: Amount, streak: u32) -> Amount {
    base_payout.mul_multiplier(multiplier_for_win_streak(streak))
}

/// Double-flip payout for a number of matched sides
pub fn double_flip_payout(wager: Amount, wins: u8) -> Amount {
    match wins {
        0 => Amount::ZERO,
        1 => treasury::win_payout(wager),
        _ => treasury::win_payout(wager).apply_bps(DOUBLE_WIN_BONUS_BPS),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Flip,
    DoubleFlip,
}

/// Analytics record appended for every wager routed through the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakEntry {
    pub kind: RoundKind,
    pub round_id: u64,
    pub player_id: String,
    /// The wager extended a win streak already under way
    pub continued_win_streak: bool,
    /// Win streak right after the wager settled
    pub streak_length: u32,
}

/// Single flip plus the bonus a caller layer may grant on top
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusFlip {
    pub round: FlipRound,
    pub win_streak: u32,
    pub multiplier: Multiplier,
    /// `apply_streak_bonus(payout, win_streak)`, zero on a loss
    pub bonus_payout: Amount,
}

struct ExtensionJournals {
    streaks: BoundedJournal<StreakEntry>,
    double_flips: BoundedJournal<DoubleFlipRound>,
}

pub struct StreakBonusEngine {
    engine: Arc<FlipEngine>,
    double_flip_enabled: AtomicBool,
    /// Last assigned double-flip round id
    double_round_counter: AtomicU64,
    journals: Mutex<ExtensionJournals>,
}

impl StreakBonusEngine {
    pub fn new(engine: Arc<FlipEngine>, config: &DoubleFlipConfig) -> Self {
        Self {
            engine,
            double_flip_enabled: AtomicBool::new(config.enabled),
            double_round_counter: AtomicU64::new(0),
            journals: Mutex::new(ExtensionJournals {
                streaks: BoundedJournal::with_capacity(STREAK_JOURNAL_CAP),
                double_flips: BoundedJournal::with_capacity(GLOBAL_HISTORY_CAP),
            }),
        }
    }

    pub fn engine(&self) -> &Arc<FlipEngine> {
        &self.engine
    }

    pub fn set_double_flip_enabled(&self, enabled: bool) {
        self.double_flip_enabled.store(enabled, Ordering::SeqCst);
        info!("Double flip {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn double_flip_enabled(&self) -> bool {
        self.double_flip_enabled.load(Ordering::SeqCst)
    }

    /// Run a base flip and report the streak bonus the caller may grant
    pub fn flip_with_bonus(
        &self,
        player_id: &str,
        display_name: Option<&str>,
        wager: Amount,
        choice: Side,
    ) -> Result<BonusFlip, FlipError> {
        let (round, streak) = self.engine.execute_flip_recorded(
            player_id,
            display_name,
            wager,
            choice,
            |round, streak| {
                self.lock_journals()
                    .streaks
                    .push(streak_entry(RoundKind::Flip, round.round_id, player_id, streak));
            },
        )?;

        let multiplier = multiplier_for_win_streak(streak.win_streak);
        let bonus_payout = if round.won {
            apply_streak_bonus(round.payout, streak.win_streak)
        } else {
            Amount::ZERO
        };
        Ok(BonusFlip {
            round,
            win_streak: streak.win_streak,
            multiplier,
            bonus_payout,
        })
    }

    /// Resolve two independent sides for one wager
    pub fn execute_double_flip(
        &self,
        player_id: &str,
        display_name: Option<&str>,
        wager: Amount,
        first: Side,
        second: Side,
    ) -> Result<DoubleFlipRound, FlipError> {
        self.engine.guard(self.validate_double_flip(player_id, wager))?;

        let (round, _) = self.engine.settle_ordered(
            player_id,
            display_name,
            || {
                let round_id = self.double_round_counter.fetch_add(1, Ordering::SeqCst) + 1;
                let timestamp: DateTime<Utc> = Utc::now();
                let choices = [first, second];
                let outcomes = DOUBLE_FLIP_SCOPES.map(|scope| {
                    self.engine.resolve(&ResolveContext {
                        round_id,
                        player_id,
                        timestamp,
                        scope,
                    })
                });

                let wins = choices.iter().zip(outcomes.iter()).filter(|(c, o)| c == o).count() as u8;
                let payout = double_flip_payout(wager, wins);
                Draft {
                    settlement: Settlement {
                        wager,
                        payout,
                        won: wins > 0,
                    },
                    round: None,
                    value: DoubleFlipRound {
                        round_id,
                        player_id: player_id.to_string(),
                        wager,
                        choices,
                        outcomes,
                        wins,
                        payout,
                        timestamp,
                    },
                }
            },
            |round: &DoubleFlipRound, streak: StreakState| {
                let mut journals = self.lock_journals();
                journals
                    .streaks
                    .push(streak_entry(RoundKind::DoubleFlip, round.round_id, player_id, streak));
                journals.double_flips.push(round.clone());
            },
        );

        Ok(round)
    }

    fn validate_double_flip(&self, player_id: &str, wager: Amount) -> Result<(), FlipError> {
        if !self.double_flip_enabled() {
            return Err(FlipError::FeatureDisabled {
                feature: DOUBLE_FLIP_FEATURE,
            });
        }
        validate_player_id(player_id)?;
        if wager < DOUBLE_FLIP_MIN_BET || wager > DOUBLE_FLIP_MAX_BET {
            return Err(FlipError::WagerOutOfRangeForFeature {
                feature: DOUBLE_FLIP_FEATURE,
                wager,
                min: DOUBLE_FLIP_MIN_BET,
                max: DOUBLE_FLIP_MAX_BET,
            });
        }
        Ok(())
    }

    fn lock_journals(&self) -> MutexGuard<'_, ExtensionJournals> {
        self.journals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Streak journal, oldest first
    pub fn recent_streaks(&self) -> Vec<StreakEntry> {
        self.lock_journals().streaks.to_vec()
    }

    /// The most recent `limit` double flips, oldest first
    pub fn double_flip_history(&self, limit: usize) -> Vec<DoubleFlipRound> {
        self.lock_journals().double_flips.latest(limit)
    }
}

fn streak_entry(kind: RoundKind, round_id: u64, player_id: &str, streak: StreakState) -> StreakEntry {
    StreakEntry {
        kind,
        round_id,
        player_id: player_id.to_string(),
        continued_win_streak: streak.win_streak > 1,
        streak_length: streak.win_streak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::resolver::ScriptedResolver;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn extension(sides: Vec<Side>, double_flip: bool) -> StreakBonusEngine {
        let engine = Arc::new(FlipEngine::with_resolver(Arc::new(ScriptedResolver::new(sides))));
        StreakBonusEngine::new(engine, &DoubleFlipConfig { enabled: double_flip })
    }

    #[test]
    fn test_multiplier_boundaries() {
        assert_eq!(multiplier_for_win_streak(0), Multiplier::ONE);
        assert_eq!(multiplier_for_win_streak(2), Multiplier::ONE);
        assert_eq!(multiplier_for_win_streak(3), Multiplier::ONE);
        assert_eq!(multiplier_for_win_streak(4), Multiplier::from_bps(10_050));
        assert_eq!(multiplier_for_win_streak(4).to_string(), "1.005");
        assert_eq!(multiplier_for_win_streak(13), Multiplier::from_bps(10_500));
        assert_eq!(multiplier_for_win_streak(100), Multiplier::from_bps(10_500));
        assert_eq!(multiplier_for_win_streak(u32::MAX), Multiplier::from_bps(10_500));
    }

    #[test]
    fn test_apply_streak_bonus_truncates() {
        assert_eq!(apply_streak_bonus(amount("0.975"), 4), amount("0.979875"));
        assert_eq!(apply_streak_bonus(amount("1"), 1), amount("1"));
        assert_eq!(
            apply_streak_bonus(Amount::from_smallest_unit(199), 4).to_smallest_unit(),
            199
        );
    }

    #[test]
    fn test_double_flip_payout_table() {
        let wager = amount("1");
        assert_eq!(double_flip_payout(wager, 0), Amount::ZERO);
        assert_eq!(double_flip_payout(wager, 1), amount("0.975"));
        assert_eq!(double_flip_payout(wager, 2), amount("1.8525"));
    }

    #[test]
    fn test_double_flip_disabled() {
        let ext = extension(vec![Side::Heads], false);
        let result = ext.execute_double_flip("p", None, amount("1"), Side::Heads, Side::Heads);
        assert!(matches!(result, Err(FlipError::FeatureDisabled { .. })));
        assert_eq!(ext.engine().player_count(), 0);
        assert!(ext.double_flip_history(10).is_empty());
    }

    #[test]
    fn test_double_flip_bounds() {
        let ext = extension(vec![Side::Heads], true);
        for wager in ["0.04", "5.01", "10"] {
            let result = ext.execute_double_flip("p", None, amount(wager), Side::Heads, Side::Heads);
            assert!(matches!(result, Err(FlipError::WagerOutOfRangeForFeature { .. })));
        }
        assert_eq!(ext.engine().get_global_stats().total_settlements, 0);
        assert!(ext.execute_double_flip("p", None, amount("0.05"), Side::Heads, Side::Heads).is_ok());
        assert!(ext.execute_double_flip("p", None, amount("5"), Side::Heads, Side::Heads).is_ok());
    }

    #[test]
    fn test_double_flip_settles_through_engine() {
        // Outcomes per double flip: (heads, tails) then (tails, tails)
        let ext = extension(vec![Side::Heads, Side::Tails, Side::Tails, Side::Tails], true);

        let one_win = ext
            .execute_double_flip("p", Some("Pat"), amount("2"), Side::Heads, Side::Heads)
            .unwrap();
        assert_eq!(one_win.wins, 1);
        assert_eq!(one_win.payout, amount("1.95"));
        assert_eq!(one_win.round_id, 1);

        let no_win = ext
            .execute_double_flip("p", None, amount("1"), Side::Heads, Side::Heads)
            .unwrap();
        assert_eq!(no_win.wins, 0);
        assert_eq!(no_win.payout, Amount::ZERO);
        assert_eq!(no_win.round_id, 2);

        let stats = ext.engine().get_global_stats();
        assert_eq!(stats.total_rounds, 0);
        assert_eq!(stats.total_settlements, 2);
        assert_eq!(stats.total_wagered, amount("3"));
        assert_eq!(stats.total_paid_out, amount("1.95"));
        assert_eq!(stats.house_collected, amount("0.975"));
        assert!(ext.engine().get_global_history(10).is_empty());

        let profile = ext.engine().get_player("p").unwrap();
        assert_eq!(profile.total_flips(), 2);
        assert_eq!(profile.total_wins(), 1);
        assert_eq!(profile.current_loss_streak(), 1);
        assert_eq!(ext.double_flip_history(10).len(), 2);
    }

    #[test]
    fn test_double_win_pays_bonus_factor() {
        let ext = extension(vec![Side::Tails], true);
        let round = ext
            .execute_double_flip("p", None, amount("1"), Side::Tails, Side::Tails)
            .unwrap();
        assert_eq!(round.wins, 2);
        assert_eq!(round.payout, treasury::win_payout(amount("1")).apply_bps(19_000));
    }

    #[test]
    fn test_flip_with_bonus_tracks_streaks() {
        let ext = extension(vec![Side::Heads], false);
        let mut last = None;
        for _ in 0..4 {
            last = Some(ext.flip_with_bonus("p", None, amount("1"), Side::Heads).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.win_streak, 4);
        assert_eq!(last.multiplier, Multiplier::from_bps(10_050));
        assert_eq!(last.bonus_payout, amount("0.979875"));
        // The base engine books the unboosted payout only
        assert_eq!(ext.engine().get_global_stats().total_paid_out, amount("3.9"));

        let streaks = ext.recent_streaks();
        assert_eq!(streaks.len(), 4);
        assert!(!streaks[0].continued_win_streak);
        assert!(streaks[1].continued_win_streak);
        assert_eq!(streaks[3].streak_length, 4);
    }

    #[test]
    fn test_flip_with_bonus_loss_has_no_bonus() {
        let ext = extension(vec![Side::Tails], false);
        let flip = ext.flip_with_bonus("p", None, amount("1"), Side::Heads).unwrap();
        assert_eq!(flip.bonus_payout, Amount::ZERO);
        assert_eq!(flip.multiplier, Multiplier::ONE);
    }

    #[test]
    fn test_streak_journal_capped() {
        let ext = extension(vec![Side::Heads], false);
        for _ in 0..(STREAK_JOURNAL_CAP + 5) {
            ext.flip_with_bonus("p", None, amount("0.1"), Side::Heads).unwrap();
        }
        let streaks = ext.recent_streaks();
        assert_eq!(streaks.len(), STREAK_JOURNAL_CAP);
        assert_eq!(streaks[0].round_id, 6);
    }

    #[test]
    fn test_toggle_double_flip() {
        let ext = extension(vec![Side::Heads], false);
        ext.set_double_flip_enabled(true);
        assert!(ext.double_flip_enabled());
        assert!(ext.execute_double_flip("p", None, amount("1"), Side::Heads, Side::Tails).is_ok());
    }

    #[test]
    fn test_extension_journals_follow_round_order() {
        use crate::games::resolver::RandomResolver;

        for _ in 0..10 {
            let engine = Arc::new(FlipEngine::with_resolver(Arc::new(RandomResolver)));
            let ext = StreakBonusEngine::new(engine, &DoubleFlipConfig { enabled: true });
            std::thread::scope(|scope| {
                for _ in 0..6 {
                    let ext = &ext;
                    scope.spawn(move || {
                        for _ in 0..150 {
                            ext.execute_double_flip("p", None, amount("1"), Side::Heads, Side::Tails).unwrap();
                            ext.flip_with_bonus("p", None, amount("1"), Side::Heads).unwrap();
                        }
                    });
                }
            });

            let doubles = ext.double_flip_history(usize::MAX);
            assert_eq!(doubles.len(), 900);
            assert!(doubles.windows(2).all(|w| w[0].round_id + 1 == w[1].round_id));

            // Each kind keeps its own id space, so compare within a kind
            let streaks = ext.recent_streaks();
            assert_eq!(streaks.len(), STREAK_JOURNAL_CAP);
            for kind in [RoundKind::Flip, RoundKind::DoubleFlip] {
                let ids: Vec<u64> = streaks.iter().filter(|e| e.kind == kind).map(|e| e.round_id).collect();
                assert!(ids.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
