//! Reload agent behaviour against real files.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{DataChange, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;

use tls_agent::agent::{AgentExit, AgentSettings, ReloadAgent, WatchEvents};
use tls_agent::Trigger;

fn settings(cert: &Path, key: &Path, debounce: Duration) -> AgentSettings {
    AgentSettings {
        cert_path: cert.to_path_buf(),
        key_path: key.to_path_buf(),
        debounce,
        check_interval: None,
        expiry_warning: Duration::from_secs(7 * 24 * 60 * 60),
    }
}

fn modified(path: &Path) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.to_path_buf())
}

struct Feed {
    events: mpsc::UnboundedSender<Event>,
    _errors: mpsc::UnboundedSender<notify::Error>,
}

fn feed() -> (Feed, WatchEvents) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (errors_tx, errors_rx) = mpsc::unbounded_channel();
    (
        Feed {
            events: events_tx,
            _errors: errors_tx,
        },
        WatchEvents::from_channels(events_rx, errors_rx),
    )
}

fn paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("server.crt"), dir.join("server.key"))
}

#[tokio::test]
async fn burst_of_events_reloads_once() {
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::write_pair(dir.path(), &common::generate());
    let store = common::store_from(&cert, &key).await;

    let agent = ReloadAgent::new(settings(&cert, &key, Duration::from_secs(10)), store);
    let (feed, watch) = feed();
    for _ in 0..5 {
        feed.events.send(modified(&cert)).unwrap();
    }
    drop(feed.events);

    let stop = Trigger::new();
    let outcome = agent.run_with(watch, stop.listener()).await;

    assert_eq!(outcome.exit, AgentExit::EventsClosed);
    assert_eq!(outcome.state.stats.attempts, 1);
    assert_eq!(outcome.state.stats.successes, 1);
    assert_eq!(outcome.state.stats.debounced, 4);
}

#[tokio::test]
async fn spaced_events_each_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::write_pair(dir.path(), &common::generate());
    let store = common::store_from(&cert, &key).await;

    let agent = ReloadAgent::new(settings(&cert, &key, Duration::from_millis(50)), store);
    let (feed, watch) = feed();
    let stop = Trigger::new();
    let task = tokio::spawn(agent.run_with(watch, stop.listener()));

    for _ in 0..3 {
        feed.events.send(modified(&key)).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    drop(feed.events);

    let outcome = task.await.unwrap();
    assert_eq!(outcome.state.stats.attempts, 3);
    assert_eq!(outcome.state.stats.successes, 3);
    assert_eq!(outcome.state.stats.debounced, 0);
}

#[tokio::test]
async fn failed_reloads_keep_current_and_do_not_debounce() {
    let dir = tempfile::tempdir().unwrap();
    let in_service = common::generate();
    let (cert, key) = common::write_pair(dir.path(), &in_service);
    let store = common::store_from(&cert, &key).await;

    std::fs::remove_file(&cert).unwrap();
    std::fs::remove_file(&key).unwrap();

    let agent = ReloadAgent::new(
        settings(&cert, &key, Duration::from_secs(10)),
        Arc::clone(&store),
    );
    let (feed, watch) = feed();
    for _ in 0..3 {
        feed.events.send(modified(&cert)).unwrap();
    }
    drop(feed.events);

    let stop = Trigger::new();
    let outcome = agent.run_with(watch, stop.listener()).await;

    assert_eq!(outcome.state.stats.attempts, 3);
    assert_eq!(outcome.state.stats.failures, 3);
    assert_eq!(outcome.state.stats.debounced, 0);
    assert_eq!(common::current_leaf(&store), in_service.cert_der);
}

#[tokio::test]
async fn mismatched_pair_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let in_service = common::generate();
    let (cert, key) = common::write_pair(dir.path(), &in_service);
    let store = common::store_from(&cert, &key).await;

    // New certificate, old key.
    std::fs::write(&cert, common::generate().cert_pem).unwrap();

    let agent = ReloadAgent::new(
        settings(&cert, &key, Duration::ZERO),
        Arc::clone(&store),
    );
    let (feed, watch) = feed();
    feed.events.send(modified(&cert)).unwrap();
    drop(feed.events);

    let stop = Trigger::new();
    let outcome = agent.run_with(watch, stop.listener()).await;

    assert_eq!(outcome.state.stats.failures, 1);
    assert_eq!(common::current_leaf(&store), in_service.cert_der);
    assert!(outcome.state.previous.is_none());
}

#[tokio::test]
async fn expiring_certificate_reloaded_by_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::write_pair(dir.path(), &common::generate_expired());
    let store = common::store_from(&cert, &key).await;

    let mut settings = settings(&cert, &key, Duration::from_secs(10));
    settings.check_interval = Some(Duration::from_millis(50));
    let agent = ReloadAgent::new(settings, Arc::clone(&store));
    let (_feed, watch) = feed();
    let stop = Trigger::new();
    let task = tokio::spawn(agent.run_with(watch, stop.listener()));

    let renewed = common::generate();
    common::write_pair(dir.path(), &renewed);

    let reloaded = common::wait_until(Duration::from_secs(5), || {
        let store = Arc::clone(&store);
        let expected = renewed.cert_der.clone();
        async move { common::current_leaf(&store) == expected }
    })
    .await;
    assert!(reloaded, "fallback check never picked up the renewed pair");

    stop.fire();
    let outcome = task.await.unwrap();
    assert_eq!(outcome.exit, AgentExit::Stopped);
    assert!(outcome.state.stats.fallback_attempts >= 1);
    assert_eq!(outcome.state.stats.attempts, outcome.state.stats.fallback_attempts);
}

#[tokio::test]
async fn healthy_certificate_skips_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::write_pair(dir.path(), &common::generate());
    let store = common::store_from(&cert, &key).await;

    let mut settings = settings(&cert, &key, Duration::from_secs(10));
    settings.check_interval = Some(Duration::from_millis(20));
    let agent = ReloadAgent::new(settings, store);
    let (_feed, watch) = feed();
    let stop = Trigger::new();
    let task = tokio::spawn(agent.run_with(watch, stop.listener()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    stop.fire();

    let outcome = task.await.unwrap();
    assert_eq!(outcome.state.stats.attempts, 0);
    assert_eq!(outcome.state.stats.fallback_attempts, 0);
    assert!(outcome.state.last_run.is_some());
}

#[tokio::test]
async fn rotation_on_disk_reaches_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = paths(dir.path());
    common::write_pair(dir.path(), &common::generate());
    let store = common::store_from(&cert, &key).await;

    let agent = ReloadAgent::new(
        settings(&cert, &key, Duration::from_millis(100)),
        Arc::clone(&store),
    );
    let stop = Trigger::new();
    let done = Trigger::new();
    let task = agent.spawn(stop.listener(), done.clone());

    // Let the watcher register before touching the files.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let rotated = common::generate();
    common::write_pair(dir.path(), &rotated);
    let reloaded = common::wait_until(Duration::from_secs(5), || {
        let store = Arc::clone(&store);
        let expected = rotated.cert_der.clone();
        async move { common::current_leaf(&store) == expected }
    })
    .await;
    assert!(reloaded, "rotated pair never published");

    // Removing the files leaves the last good pair in service.
    std::fs::remove_file(&cert).unwrap();
    std::fs::remove_file(&key).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(common::current_leaf(&store), rotated.cert_der);

    let restored = common::generate();
    common::write_pair(dir.path(), &restored);
    let reloaded = common::wait_until(Duration::from_secs(5), || {
        let store = Arc::clone(&store);
        let expected = restored.cert_der.clone();
        async move { common::current_leaf(&store) == expected }
    })
    .await;
    assert!(reloaded, "restored pair never published");

    stop.fire();
    let outcome = task.await.unwrap();
    assert_eq!(outcome.exit, AgentExit::Stopped);
    assert!(done.is_fired());
    assert!(outcome.state.previous.is_some());
}
