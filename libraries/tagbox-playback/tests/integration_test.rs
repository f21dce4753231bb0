//! Integration tests for the playback slot
//!
//! These spawn real short-lived processes (`sleep`, `true`, `sh`) instead
//! of an audio player; the slot treats the file path as the final command
//! argument, so a sleep duration stands in for a song file.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tagbox_playback::{LoopGate, LoopSession, Player, PlayerCommand, WaitOutcome};

fn sleeper() -> Player {
    Player::new(PlayerCommand::custom("sleep", vec![]))
}

#[tokio::test]
async fn test_play_marks_slot_active_and_attributed() {
    let player = sleeper();
    player.play(Path::new("5"), "song.mp3").await.unwrap();

    assert!(player.is_active().await);
    assert_eq!(player.now_playing().await.as_deref(), Some("song.mp3"));

    assert!(player.stop().await);
    assert!(!player.is_active().await);
    assert_eq!(player.now_playing().await, None);
}

#[tokio::test]
async fn test_stop_with_nothing_playing_is_a_noop() {
    let player = sleeper();
    assert!(!player.stop().await);
    assert!(!player.is_active().await);
}

#[tokio::test]
async fn test_natural_completion_keeps_attribution() {
    let player = Player::new(PlayerCommand::custom("true", vec![]));
    let ticket = player.play(Path::new("ignored"), "song.mp3").await.unwrap();

    let outcome = player.wait_for_exit(&ticket).await;
    assert_eq!(outcome, WaitOutcome::Completed);

    // The process is gone but the slot still says what last played.
    assert!(!player.is_active().await);
    assert_eq!(player.now_playing().await.as_deref(), Some("song.mp3"));
}

#[tokio::test]
async fn test_second_play_supersedes_first() {
    let player = sleeper();
    let first = player.play(Path::new("5"), "first.mp3").await.unwrap();
    let second = player.play(Path::new("5"), "second.mp3").await.unwrap();

    assert_eq!(player.wait_for_exit(&first).await, WaitOutcome::Superseded);
    assert_eq!(player.now_playing().await.as_deref(), Some("second.mp3"));

    // The second play is still live and its own ticket is still valid.
    assert!(player.is_active().await);
    player.stop().await;
    assert_eq!(player.wait_for_exit(&second).await, WaitOutcome::Superseded);
}

#[tokio::test]
async fn test_stop_invalidates_outstanding_ticket() {
    let player = Arc::new(sleeper());
    let ticket = player.play(Path::new("5"), "song.mp3").await.unwrap();

    let waiter = {
        let player = Arc::clone(&player);
        tokio::spawn(async move { player.wait_for_exit(&ticket).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    player.stop().await;

    let outcome = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter did not observe the stop")
        .unwrap();
    assert_eq!(outcome, WaitOutcome::Superseded);
}

#[tokio::test]
async fn test_sigterm_resistant_process_gets_killed() {
    // A shell that ignores SIGTERM; only SIGKILL after the grace period
    // can end it.
    let player = Player::new(PlayerCommand::custom("sh", vec!["-c".to_string()]));
    player
        .play(Path::new("trap '' TERM; sleep 30"), "stubborn.mp3")
        .await
        .unwrap();
    // Give the shell time to install its trap before the SIGTERM arrives.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(player.is_active().await);

    let start = Instant::now();
    assert!(player.stop().await);
    let elapsed = start.elapsed();

    assert!(!player.is_active().await);
    // Stop had to sit out the full SIGTERM grace before escalating.
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_spawn_failure_surfaces_program_name() {
    let player = Player::new(PlayerCommand::custom("/nonexistent/player", vec![]));
    let err = player.play(Path::new("x"), "song.mp3").await.unwrap_err();
    assert!(err.to_string().contains("/nonexistent/player"));
    assert!(!player.is_active().await);
}

// ===== Loop Session Tests =====

struct FlagGate {
    enabled: AtomicBool,
    queries: AtomicUsize,
}

impl FlagGate {
    fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            queries: AtomicUsize::new(0),
        }
    }
}

impl LoopGate for FlagGate {
    fn loop_enabled(&self) -> bool {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.enabled.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_loop_session_replays_until_gate_closes() {
    let player = Arc::new(sleeper());
    let gate = Arc::new(FlagGate::new(true));

    // Short plays so completions come quickly.
    let ticket = player.play(Path::new("0.05"), "loop.mp3").await.unwrap();
    let session = LoopSession::new(
        Arc::clone(&player),
        Arc::clone(&gate) as Arc<dyn LoopGate>,
        "0.05".into(),
        "loop.mp3".to_string(),
    );
    let task = tokio::spawn(session.run(ticket));

    // Let a few replay cycles happen, then switch loop mode off.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(gate.queries.load(Ordering::SeqCst) >= 2, "expected replays");
    gate.enabled.store(false, Ordering::SeqCst);

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("session did not end after gate closed")
        .unwrap()
        .unwrap();
    assert!(!player.is_active().await);
}

#[tokio::test]
async fn test_loop_session_ends_after_single_play_when_gate_closed() {
    let player = Arc::new(sleeper());
    let gate = Arc::new(FlagGate::new(false));

    let ticket = player.play(Path::new("0.05"), "once.mp3").await.unwrap();
    let session = LoopSession::new(
        Arc::clone(&player),
        gate,
        "0.05".into(),
        "once.mp3".to_string(),
    );

    tokio::time::timeout(Duration::from_secs(2), session.run(ticket))
        .await
        .expect("session should end after one completion")
        .unwrap();
    assert!(!player.is_active().await);
    // Natural end keeps the attribution in place.
    assert_eq!(player.now_playing().await.as_deref(), Some("once.mp3"));
}

#[tokio::test]
async fn test_loop_session_ends_when_superseded() {
    let player = Arc::new(sleeper());
    let gate = Arc::new(FlagGate::new(true));

    let ticket = player.play(Path::new("5"), "a.mp3").await.unwrap();
    let session = LoopSession::new(
        Arc::clone(&player),
        gate,
        "5".into(),
        "a.mp3".to_string(),
    );
    let task = tokio::spawn(session.run(ticket));

    tokio::time::sleep(Duration::from_millis(150)).await;
    player.play(Path::new("5"), "b.mp3").await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("superseded session should end")
        .unwrap()
        .unwrap();
    assert_eq!(player.now_playing().await.as_deref(), Some("b.mp3"));
    player.stop().await;
}
