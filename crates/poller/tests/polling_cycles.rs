//! End-to-end poll cycle behavior driven by the scheduler
//!
//! Tokio time is paused, so sleeping in a test advances the scheduler's
//! timers deterministically.

mod common;

use catalog::{CatalogError, MemoryCatalog};
use common::{elapse, items, new_poller, recorder, SlowCatalog, TOKEN};
use poll_core::ListenerError;
use poller::{ChangeEvent, Listener};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_configured_interval() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 5);

    poller.set_running(true);

    // No immediate tick on start
    elapse(4.9).await;
    assert_eq!(catalog.fetch_count(), 0);

    elapse(0.2).await;
    assert_eq!(catalog.fetch_count(), 1);

    elapse(5.0).await;
    assert_eq!(catalog.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batches_are_deduplicated_across_ticks() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    catalog.respond_with(items(&[1, 2]));
    catalog.respond_with(items(&[2, 3]));
    catalog.respond_with(items(&[1, 2, 3]));

    let poller = new_poller(catalog.clone(), 5);
    let (recorder, _listener) = recorder(&poller);
    poller.set_running(true);

    elapse(15.5).await;

    assert_eq!(*recorder.batches.lock(), vec![vec![1, 2], vec![3]]);
    assert_eq!(poller.seen_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_each_id_is_delivered_at_most_once() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let rounds: [&[i64]; 6] = [&[1, 2, 3], &[3, 4], &[], &[1, 5, 5], &[2, 4, 6], &[6]];
    for round in rounds {
        catalog.respond_with(items(round));
    }

    let poller = new_poller(catalog.clone(), 1);
    let (recorder, _listener) = recorder(&poller);
    poller.set_running(true);

    elapse(6.5).await;

    assert_eq!(catalog.fetch_count(), 6);
    assert_eq!(recorder.delivered_ids(), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_future_ticks() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 5);

    poller.set_running(true);
    elapse(5.5).await;
    assert_eq!(catalog.fetch_count(), 1);

    poller.set_running(false);
    elapse(60.0).await;
    assert_eq!(catalog.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resumes_at_same_interval() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 5);

    poller.set_running(true);
    elapse(7.0).await;
    assert_eq!(catalog.fetch_count(), 1);

    poller.set_running(false);
    poller.set_running(true);

    // Timer restarts: next tick is a full interval after the restart
    elapse(4.9).await;
    assert_eq!(catalog.fetch_count(), 1);
    elapse(0.2).await;
    assert_eq!(catalog.fetch_count(), 2);
    assert_eq!(poller.interval(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_keeps_timer_phase() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 5);

    poller.set_running(true);
    elapse(3.0).await;
    poller.set_running(true);

    elapse(2.1).await;
    assert_eq!(catalog.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_behaves_like_ten_seconds() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 0);

    poller.set_running(true);
    elapse(9.9).await;
    assert_eq!(catalog.fetch_count(), 0);
    elapse(0.2).await;
    assert_eq!(catalog.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_interval_applies_after_current_wait() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 10);

    poller.set_running(true);
    elapse(2.0).await;
    poller.set_interval(2);

    // The pending 10s wait is not restarted
    elapse(7.9).await;
    assert_eq!(catalog.fetch_count(), 0);
    elapse(0.2).await;
    assert_eq!(catalog.fetch_count(), 1);

    elapse(2.0).await;
    assert_eq!(catalog.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetches_never_overlap() {
    let catalog = Arc::new(SlowCatalog::new(Duration::from_secs(3)));
    let poller = new_poller(catalog.clone(), 1);

    poller.set_running(true);
    elapse(20.0).await;

    assert!(catalog.completed.load(Ordering::SeqCst) >= 4);
    assert_eq!(catalog.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_during_slow_cycle_stays_single_flight() {
    let catalog = Arc::new(SlowCatalog::new(Duration::from_secs(4)));
    let poller = new_poller(catalog.clone(), 1);

    poller.set_running(true);
    elapse(1.5).await;
    poller.set_running(false);
    poller.set_running(true);
    elapse(10.0).await;

    assert!(catalog.completed.load(Ordering::SeqCst) >= 2);
    assert_eq!(catalog.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_cycle_lets_cycle_finish() {
    let catalog = Arc::new(SlowCatalog::new(Duration::from_secs(3)));
    catalog.inner.respond_with(items(&[10, 11]));

    let poller = new_poller(catalog.clone(), 5);
    let (recorder, _listener) = recorder(&poller);
    poller.set_running(true);

    // Cycle starts at t=5 and its fetch takes until t=8
    elapse(6.0).await;
    let before = poller.watermark();
    poller.set_running(false);

    elapse(30.0).await;

    assert_eq!(catalog.completed.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.batches.lock(), vec![vec![10, 11]]);
    assert!(poller.watermark() > before);
}

#[tokio::test(start_paused = true)]
async fn test_tick_queued_behind_manual_poll_is_dropped_by_stop() {
    let catalog = Arc::new(SlowCatalog::new(Duration::from_secs(3)));
    let poller = Arc::new(new_poller(catalog.clone(), 1));
    poller.set_running(true);

    // Manual poll holds the detector from t=0.5 to t=3.5
    elapse(0.5).await;
    let manual = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.poll_now().await })
    };

    // Scheduled tick at t=1 queues behind it; stop before it gets the lock
    elapse(1.0).await;
    poller.set_running(false);
    elapse(30.0).await;

    manual.await.unwrap();
    assert_eq!(catalog.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_idle_observes_final_watermark() {
    let catalog = Arc::new(SlowCatalog::new(Duration::from_secs(3)));
    catalog.inner.respond_with(items(&[7]));

    let poller = new_poller(catalog.clone(), 5);
    let (recorder, _listener) = recorder(&poller);
    poller.set_running(true);

    // Cycle is mid-fetch at t=6
    elapse(6.0).await;
    let before = poller.watermark();
    poller.set_running(false);
    poller.wait_idle().await;

    assert_eq!(*recorder.batches.lock(), vec![vec![7]]);
    assert!(poller.watermark() > before);
    assert_eq!(catalog.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failing_listener_does_not_starve_others() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    catalog.respond_with(items(&[1]));
    catalog.respond_with(items(&[2]));

    let poller = new_poller(catalog.clone(), 1);
    let broken: Arc<dyn Listener> = Arc::new(|_: &ChangeEvent| -> Result<(), ListenerError> {
        Err(ListenerError::new("always fails"))
    });
    poller.add_listener(&broken);
    let (recorder, _listener) = recorder(&poller);

    poller.set_running(true);
    elapse(2.5).await;

    assert_eq!(*recorder.batches.lock(), vec![vec![1], vec![2]]);
}

#[tokio::test(start_paused = true)]
async fn test_failures_never_stop_the_scheduler() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    catalog.fail_with(CatalogError::Transport("connection refused".into()));
    catalog.fail_with(CatalogError::Auth("token expired".into()));
    catalog.respond_with(items(&[42]));

    let poller = new_poller(catalog.clone(), 1);
    let (recorder, _listener) = recorder(&poller);
    poller.set_running(true);

    // Sample between ticks, after each cycle has finished
    let mut marks = Vec::new();
    elapse(0.5).await;
    for _ in 0..3 {
        elapse(1.0).await;
        marks.push(poller.watermark());
    }

    assert!(poller.is_running());
    assert_eq!(recorder.delivered_ids(), vec![42]);
    assert!(marks.windows(2).all(|pair| pair[1] > pair[0]));
}

#[tokio::test(start_paused = true)]
async fn test_cycles_skip_without_credential() {
    let catalog = Arc::new(MemoryCatalog::new().with_token(TOKEN));
    let poller = new_poller(catalog.clone(), 1);
    poller.set_credential(None);

    poller.set_running(true);
    let initial = poller.watermark();
    elapse(3.5).await;

    assert_eq!(catalog.fetch_count(), 0);
    assert_eq!(poller.watermark(), initial);
}
