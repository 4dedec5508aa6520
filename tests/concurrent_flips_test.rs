//! Concurrency tests: many simultaneous flips against one shared engine
//! must keep ids unique, money conserved and every journal within its cap.

use satoshi_flipper::{
    config::DoubleFlipConfig,
    games::{profile::PLAYER_JOURNAL_CAP, engine::GLOBAL_HISTORY_CAP, RandomResolver, ScriptedResolver},
    Amount, FlipEngine, FlipError, FlipRound, Side, StreakBonusEngine,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn amount(s: &str) -> Amount {
    s.parse().unwrap()
}

fn random_engine() -> Arc<FlipEngine> {
    Arc::new(FlipEngine::with_resolver(Arc::new(RandomResolver)))
}

/// Run `per_task` flips on each of `tasks` blocking workers, collecting every round
async fn flood(engine: Arc<FlipEngine>, tasks: usize, per_task: usize, players: usize) -> Vec<FlipRound> {
    let rounds = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();

    for task_id in 0..tasks {
        let engine = engine.clone();
        let rounds = rounds.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut local = Vec::with_capacity(per_task);
            for n in 0..per_task {
                let player = format!("player-{}", (task_id + n) % players);
                let side = if n % 2 == 0 { Side::Heads } else { Side::Tails };
                let wager = if n % 3 == 0 { amount("0.01") } else { amount("1.5") };
                local.push(engine.execute_flip(&player, None, wager, side).expect("flip settles"));
            }
            rounds.lock().unwrap().extend(local);
        }));
    }
    for handle in handles {
        handle.await.expect("worker completes");
    }

    Arc::try_unwrap(rounds).unwrap().into_inner().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_round_ids_form_permutation() {
    let engine = random_engine();
    let rounds = flood(engine.clone(), 8, 500, 13).await;

    let ids: HashSet<u64> = rounds.iter().map(|r| r.round_id).collect();
    assert_eq!(ids.len(), 4_000);
    assert_eq!(ids, (1..=4_000).collect::<HashSet<u64>>());
    assert_eq!(engine.get_global_stats().total_rounds, 4_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_money_is_conserved() {
    let engine = random_engine();
    let rounds = flood(engine.clone(), 6, 400, 9).await;
    let stats = engine.get_global_stats();

    let wagered: Amount = rounds.iter().map(|r| r.wager).sum();
    let paid: Amount = rounds.iter().filter(|r| r.won).map(|r| r.payout).sum();
    let house: Amount = rounds
        .iter()
        .filter(|r| !r.won)
        .map(|r| satoshi_flipper::treasury::house_take_on_loss(r.wager))
        .sum();

    assert_eq!(stats.total_wagered, wagered);
    assert_eq!(stats.total_paid_out, paid);
    assert_eq!(stats.house_collected, house);
    assert!(rounds.iter().filter(|r| !r.won).all(|r| r.payout == Amount::ZERO));

    // Per-player totals add back up to the global ones
    let players_wagered: Amount = (0..9)
        .filter_map(|i| engine.get_player(&format!("player-{}", i)))
        .map(|p| p.total_wagered())
        .sum();
    assert_eq!(players_wagered, stats.total_wagered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_streak_invariants_hold_under_contention() {
    let engine = random_engine();
    let observer = {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || {
            let mut max_seen = vec![(0u32, 0u32); 3];
            for _ in 0..2_000 {
                for (i, seen) in max_seen.iter_mut().enumerate() {
                    if let Some(profile) = engine.get_player(&format!("player-{}", i)) {
                        assert!(profile.current_win_streak() == 0 || profile.current_loss_streak() == 0);
                        assert!(profile.max_win_streak() >= seen.0);
                        assert!(profile.max_loss_streak() >= seen.1);
                        assert_eq!(profile.total_flips(), profile.total_wins() + profile.total_losses());
                        *seen = (profile.max_win_streak(), profile.max_loss_streak());
                    }
                }
            }
        })
    };

    flood(engine.clone(), 6, 500, 3).await;
    observer.await.expect("observer saw consistent profiles");

    for i in 0..3 {
        let profile = engine.get_player(&format!("player-{}", i)).unwrap();
        assert!(profile.current_win_streak() == 0 || profile.current_loss_streak() == 0);
        assert!(profile.current_win_streak() + profile.current_loss_streak() > 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_journals_stay_capped_and_fifo() {
    let engine = random_engine();
    // 3_000 flips for one player overflows both the player journal and the global history
    flood(engine.clone(), 6, 500, 1).await;

    let profile = engine.get_player("player-0").unwrap();
    let journal: Vec<u64> = profile.recent_rounds().iter().map(|r| r.round_id).collect();
    assert_eq!(journal.len(), PLAYER_JOURNAL_CAP);
    assert!(journal.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(journal.last().copied(), Some(3_000));

    let history = engine.get_global_history(usize::MAX);
    assert_eq!(history.len(), GLOBAL_HISTORY_CAP);
    assert!(history.windows(2).all(|w| w[0].round_id < w[1].round_id));
    assert_eq!(history.first().map(|r| r.round_id), Some(1_001));
}

fn descending_pairs(ids: &[u64]) -> usize {
    ids.windows(2).filter(|w| w[0] > w[1]).count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_histories_stay_ordered_across_runs() {
    let mut runs_out_of_order = 0;
    for _ in 0..20 {
        let engine = random_engine();
        flood(engine.clone(), 8, 200, 1).await;

        let history: Vec<u64> = engine.get_global_history(usize::MAX).iter().map(|r| r.round_id).collect();
        let journal: Vec<u64> = engine
            .get_player("player-0")
            .unwrap()
            .recent_rounds()
            .iter()
            .map(|r| r.round_id)
            .collect();
        if descending_pairs(&history) + descending_pairs(&journal) > 0 {
            runs_out_of_order += 1;
        }
    }
    assert_eq!(runs_out_of_order, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_flips_create_one_profile() {
    let engine = Arc::new(FlipEngine::with_resolver(Arc::new(ScriptedResolver::always(Side::Heads))));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            engine.execute_flip("newcomer", Some("Newcomer"), amount("1"), Side::Heads).unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(engine.player_count(), 1);
    let profile = engine.get_player("newcomer").unwrap();
    assert_eq!(profile.total_flips(), 16);
    assert_eq!(profile.current_win_streak(), 16);
    assert_eq!(profile.recent_rounds().len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_flips_and_flips_share_totals() {
    let engine = random_engine();
    let extension = Arc::new(StreakBonusEngine::new(engine.clone(), &DoubleFlipConfig { enabled: true }));

    let mut handles = Vec::new();
    for task_id in 0..4 {
        let extension = extension.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let player = format!("p{}", task_id);
            for _ in 0..250 {
                extension.flip_with_bonus(&player, None, amount("1"), Side::Heads).unwrap();
                extension
                    .execute_double_flip(&player, None, amount("2"), Side::Heads, Side::Tails)
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = engine.get_global_stats();
    assert_eq!(stats.total_rounds, 1_000);
    assert_eq!(stats.total_settlements, 2_000);
    assert_eq!(stats.total_wagered, amount("3000"));

    let doubles = extension.double_flip_history(usize::MAX);
    assert_eq!(doubles.len(), 1_000);
    let ids: HashSet<u64> = doubles.iter().map(|r| r.round_id).collect();
    assert_eq!(ids, (1..=1_000).collect::<HashSet<u64>>());
    assert_eq!(extension.recent_streaks().len(), 10);

    let flips_paid: Amount = engine
        .get_global_history(usize::MAX)
        .iter()
        .map(|r| r.payout)
        .sum();
    let doubles_paid: Amount = doubles.iter().map(|r| r.payout).sum();
    assert_eq!(stats.total_paid_out, flips_paid + doubles_paid);
}

#[test]
fn test_rejections_report_reason() {
    let engine = random_engine();
    match engine.execute_flip("p", None, amount("0.005"), Side::Heads) {
        Err(FlipError::BetTooLow { wager, min }) => {
            assert_eq!(wager, amount("0.005"));
            assert_eq!(min, amount("0.01"));
        }
        other => panic!("expected BetTooLow, got {:?}", other),
    }
    match engine.execute_flip("p", None, amount("10.01"), Side::Heads) {
        Err(FlipError::BetTooHigh { max, .. }) => assert_eq!(max, amount("10")),
        other => panic!("expected BetTooHigh, got {:?}", other),
    }
    assert_eq!(engine.get_global_stats().total_wagered, Amount::ZERO);
}
