//! Coordinator tests on a paused clock: pairing, bot escalation, leave,
//! and the escalation/pairing race.

use std::sync::Arc;
use std::time::Duration;

use fourline_bot::BotConfig;
use fourline_matchmaking::{QueueConfig, QueueError, QueueHandle, spawn_queue};
use fourline_protocol::{GameSnapshot, MatchPreferences, PlayerId, ServerMessage};
use fourline_session::{RegistryConfig, SessionRegistry, SharedHandle};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

// =========================================================================
// Helpers
// =========================================================================

const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);
const CAROL: PlayerId = PlayerId(3);

type Outbox = mpsc::UnboundedReceiver<ServerMessage>;

fn start(config: QueueConfig) -> (SessionRegistry, QueueHandle) {
    let registry = SessionRegistry::new(RegistryConfig::default());
    let queue = spawn_queue(config, registry.clone(), BotConfig::default());
    (registry, queue)
}

fn outbox() -> (SharedHandle, Outbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

fn no_bots() -> QueueConfig {
    QueueConfig {
        enable_bots: false,
        ..QueueConfig::default()
    }
}

fn skill(level: u8) -> MatchPreferences {
    MatchPreferences {
        skill_level: level,
        ..MatchPreferences::default()
    }
}

async fn join(queue: &QueueHandle, id: PlayerId, prefs: MatchPreferences) -> Outbox {
    let (handle, rx) = outbox();
    queue.join(id, format!("{id}"), prefs, handle).await.unwrap();
    rx
}

/// Every `game_found` delivered so far.
fn found(rx: &mut Outbox) -> Vec<GameSnapshot> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let ServerMessage::GameFound { session, .. } = msg {
            out.push(session);
        }
    }
    out
}

// =========================================================================
// Join / leave
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_twice_returns_already_queued() {
    let (_registry, queue) = start(QueueConfig::default());
    let _rx = join(&queue, ALICE, MatchPreferences::default()).await;

    let (handle, _rx2) = outbox();
    let err = queue
        .join(ALICE, "alice", MatchPreferences::default(), handle)
        .await
        .unwrap_err();
    assert_eq!(err, QueueError::AlreadyQueued(ALICE));
}

#[tokio::test(start_paused = true)]
async fn test_leave_unknown_returns_not_in_queue() {
    let (_registry, queue) = start(QueueConfig::default());
    assert_eq!(
        queue.leave(ALICE).await.unwrap_err(),
        QueueError::NotInQueue(ALICE)
    );
}

#[tokio::test(start_paused = true)]
async fn test_join_reports_fifo_position() {
    let (_registry, queue) = start(no_bots());
    let (ha, _ra) = outbox();
    let (hb, _rb) = outbox();

    let first = queue.join(ALICE, "alice", skill(1), ha).await.unwrap();
    let second = queue.join(BOB, "bob", skill(9), hb).await.unwrap();
    assert_eq!((first.position, first.queue_size), (1, 1));
    assert_eq!((second.position, second.queue_size), (2, 2));
}

#[tokio::test(start_paused = true)]
async fn test_join_at_capacity_returns_queue_full() {
    let (_registry, queue) = start(QueueConfig {
        capacity: 1,
        ..no_bots()
    });
    let _ra = join(&queue, ALICE, skill(1)).await;

    let (handle, _rb) = outbox();
    let err = queue.join(BOB, "bob", skill(9), handle).await.unwrap_err();
    assert_eq!(err, QueueError::QueueFull { capacity: 1 });
}

#[tokio::test(start_paused = true)]
async fn test_leave_cancels_bot_escalation() {
    let (registry, queue) = start(QueueConfig::default());
    let mut ra = join(&queue, ALICE, MatchPreferences::default()).await;

    sleep(Duration::from_secs(5)).await;
    queue.leave(ALICE).await.unwrap();
    sleep(Duration::from_secs(20)).await;

    assert!(found(&mut ra).is_empty());
    assert_eq!(registry.active_sessions().await, 0);
    let stats = queue.status().await.unwrap();
    assert_eq!(stats.total_left, 1);
    assert_eq!(stats.total_bot_matches, 0);
}

// =========================================================================
// Matching
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_two_players_within_a_second_are_paired() {
    let (registry, queue) = start(QueueConfig::default());
    let mut ra = join(&queue, ALICE, MatchPreferences::default()).await;
    sleep(Duration::from_millis(500)).await;
    let mut rb = join(&queue, BOB, MatchPreferences::default()).await;

    // Well past the 10s bot timeout: nobody may be escalated.
    sleep(Duration::from_secs(15)).await;

    let a = found(&mut ra);
    let b = found(&mut rb);
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(a[0].id, b[0].id);
    assert_eq!(a[0].players[0].id, ALICE, "oldest entry plays first");
    assert_eq!(a[0].players[1].id, BOB);
    assert!(a[0].players.iter().all(|p| !p.is_bot));

    assert_eq!(registry.active_sessions().await, 1);
    let stats = queue.status().await.unwrap();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.total_matched, 1);
    assert_eq!(stats.total_bot_matches, 0);
    assert!(stats.average_wait >= Duration::from_millis(500));
    assert!(stats.average_wait <= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_incompatible_skills_wait_for_a_closer_match() {
    let (_registry, queue) = start(no_bots());
    let mut ra = join(&queue, ALICE, skill(1)).await;
    let mut rb = join(&queue, BOB, skill(9)).await;

    sleep(Duration::from_secs(5)).await;
    assert!(found(&mut ra).is_empty());

    let mut rc = join(&queue, CAROL, skill(3)).await;
    sleep(Duration::from_secs(2)).await;

    let a = found(&mut ra);
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].players[1].id, CAROL);
    assert_eq!(found(&mut rc).len(), 1);
    assert!(found(&mut rb).is_empty());
    assert_eq!(queue.status().await.unwrap().size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_pairs_on_join() {
    let (_registry, queue) = start(QueueConfig {
        match_interval: Duration::ZERO,
        ..QueueConfig::default()
    });
    let start = Instant::now();
    let mut ra = join(&queue, ALICE, MatchPreferences::default()).await;
    let _rb = join(&queue, BOB, MatchPreferences::default()).await;

    // Any request is answered after the pass that followed Bob's join.
    queue.status().await.unwrap();
    assert_eq!(found(&mut ra).len(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_queue_joined_precedes_game_found_for_both_players() {
    let (_registry, queue) = start(QueueConfig {
        match_interval: Duration::ZERO,
        ..QueueConfig::default()
    });
    let mut ra = join(&queue, ALICE, MatchPreferences::default()).await;
    let mut rb = join(&queue, BOB, MatchPreferences::default()).await;
    queue.status().await.unwrap();

    for (rx, position) in [(&mut ra, 1), (&mut rb, 2)] {
        let mut msgs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            msgs.push(msg);
        }
        assert_eq!(msgs.len(), 2, "{msgs:?}");
        assert!(matches!(
            msgs[0],
            ServerMessage::QueueJoined { position: p, .. } if p == position
        ));
        assert!(matches!(msgs[1], ServerMessage::GameFound { .. }));
    }
}

// =========================================================================
// Bot escalation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_lone_player_is_matched_with_bot_after_timeout() {
    let (registry, queue) = start(QueueConfig::default());
    let mut ra = join(&queue, ALICE, MatchPreferences::default()).await;

    sleep(Duration::from_millis(9_500)).await;
    assert!(found(&mut ra).is_empty(), "too early for a bot");

    sleep(Duration::from_millis(1_500)).await;
    let a = found(&mut ra);
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].players[0].id, ALICE);
    assert!(a[0].players[1].is_bot);
    assert_eq!(a[0].players[1].name, "ConnectBot_1");

    assert!(registry.is_playing(ALICE).await);
    let stats = queue.status().await.unwrap();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.total_bot_matches, 1);
}

#[tokio::test(start_paused = true)]
async fn test_per_entry_wait_overrides_bot_timeout() {
    let (_registry, queue) = start(QueueConfig::default());
    let prefs = MatchPreferences {
        max_wait_secs: Some(3),
        ..MatchPreferences::default()
    };
    let mut ra = join(&queue, ALICE, prefs).await;

    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(found(&mut ra).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bots_not_allowed_keeps_waiting() {
    let (registry, queue) = start(QueueConfig::default());
    let prefs = MatchPreferences {
        allow_bots: false,
        ..MatchPreferences::default()
    };
    let mut ra = join(&queue, ALICE, prefs).await;

    sleep(Duration::from_secs(30)).await;
    assert!(found(&mut ra).is_empty());
    assert_eq!(registry.active_sessions().await, 0);
    assert_eq!(queue.status().await.unwrap().size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_bot_plays_against_escalated_player() {
    let (registry, queue) = start(QueueConfig::default());
    let mut ra = join(&queue, ALICE, MatchPreferences::default()).await;
    sleep(Duration::from_secs(11)).await;
    let session = found(&mut ra).remove(0);

    registry.make_move(session.id, ALICE, 0).await.unwrap();
    sleep(Duration::from_secs(3)).await;

    let state = registry.snapshot(session.id).await.unwrap();
    assert_eq!(state.move_count, 2, "bot should have replied");
    assert!(state.is_turn_of(ALICE));
}

#[tokio::test(start_paused = true)]
async fn test_escalation_racing_pairing_matches_once() {
    // Alice's bot timer and the first pairing pass both land at t=1s.
    let (registry, queue) = start(QueueConfig::default());
    let prefs = MatchPreferences {
        max_wait_secs: Some(1),
        ..MatchPreferences::default()
    };
    let mut ra = join(&queue, ALICE, prefs).await;
    sleep(Duration::from_millis(500)).await;
    let _rb = join(&queue, BOB, MatchPreferences::default()).await;

    sleep(Duration::from_millis(1_500)).await;

    assert_eq!(found(&mut ra).len(), 1, "exactly one match for Alice");
    assert_eq!(registry.active_sessions().await, 1);
    let stats = queue.status().await.unwrap();
    assert_eq!(stats.total_matched + stats.total_bot_matches, 1);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_makes_queue_unavailable() {
    let (_registry, queue) = start(QueueConfig::default());
    let _ra = join(&queue, ALICE, MatchPreferences::default()).await;

    queue.shutdown().await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(!queue.is_running());
    assert_eq!(queue.status().await.unwrap_err(), QueueError::Unavailable);
}
