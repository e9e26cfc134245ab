//! Integration tests for the periodic ticker.
//!
//! Every async test runs on a paused clock, so sleeps resolve as soon as
//! the runtime is otherwise idle.

use std::time::Duration;

use fourline_tick::{TickConfig, TickPolicy, Ticker};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

fn one_second() -> Ticker {
    Ticker::every(Duration::from_secs(1))
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_disabled() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.period, Duration::ZERO);
    assert_eq!(cfg.policy, TickPolicy::Skip);
}

#[test]
fn test_validated_caps_jitter_and_threshold() {
    let cfg = TickConfig {
        period: Duration::from_millis(100),
        initial_jitter: Duration::from_secs(5),
        budget_warn_threshold: 3.0,
        ..Default::default()
    }
    .validated();
    assert_eq!(cfg.initial_jitter, Duration::from_millis(100));
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_after_one_period() {
    let start = Instant::now();
    let mut t = one_second();

    let info = t.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_evenly_spaced() {
    let start = Instant::now();
    let mut t = one_second();

    for expected in 1..=5 {
        let info = t.wait_for_tick().await;
        assert_eq!(info.tick, expected);
    }
    assert_eq!(t.tick_count(), 5);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_jitter_delays_first_tick_within_bound() {
    let start = Instant::now();
    let mut t = Ticker::new(TickConfig {
        period: Duration::from_secs(1),
        initial_jitter: Duration::from_millis(200),
        ..Default::default()
    });

    t.wait_for_tick().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed <= Duration::from_millis(1200));
}

// =========================================================================
// Disabled mode
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_zero_period_never_fires() {
    let mut t = Ticker::every(Duration::ZERO);
    assert!(t.is_disabled());

    let result = tokio::time::timeout(Duration::from_secs(60), t.wait_for_tick()).await;
    assert!(result.is_err(), "disabled ticker should pend forever");
}

// =========================================================================
// Overrun policies
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_counts_missed_ticks() {
    let mut t = one_second();
    t.wait_for_tick().await;

    // Work runs 3.5 periods past the next deadline.
    tokio::time::advance(Duration::from_millis(4500)).await;
    let info = t.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 3);
    assert_eq!(t.metrics().total_overruns, 1);
    assert_eq!(t.metrics().total_skipped, 3);

    // Rescheduled a full period from the late wake-up.
    let before = Instant::now();
    t.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_fixed_policy_keeps_cadence() {
    let mut t = Ticker::new(TickConfig {
        period: Duration::from_secs(1),
        policy: TickPolicy::Fixed,
        ..Default::default()
    });
    t.wait_for_tick().await;

    tokio::time::advance(Duration::from_millis(1500)).await;
    let info = t.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 0);

    // Next deadline was t=3s; we are at t=2.5s.
    let before = Instant::now();
    t.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::from_millis(500));
}

// =========================================================================
// Metrics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_work_time() {
    let mut t = one_second();
    t.record_tick_end(); // no tick yet
    assert_eq!(t.metrics().last_tick_time, Duration::ZERO);

    t.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(300)).await;
    t.record_tick_end();
    assert_eq!(t.metrics().last_tick_time, Duration::from_millis(300));

    t.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(100)).await;
    t.record_tick_end();
    assert_eq!(t.metrics().last_tick_time, Duration::from_millis(100));
    assert_eq!(t.metrics().max_tick_time, Duration::from_millis(300));
    assert_eq!(t.metrics().total_ticks, 2);
}

// =========================================================================
// Integration: select! loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut t = one_second().with_label("test");
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        tx.send("stop").await.ok();
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = t.wait_for_tick() => {
                fired += 1;
                t.record_tick_end();
                assert_eq!(info.tick, fired);
            }
        }
    }
    assert_eq!(fired, 3);
}
