//! Poller tests against an in-memory export source

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::combat_log::{Event, EventId, EventKind};
use crate::context::{Attempt, AttemptInterval, InstanceMeta, Participant};
use crate::session::{ChangedSubject, InstanceSession, SharedSession};
use crate::test_support::*;

use super::{ExportSource, FetchError, LiveSync, SyncCommand, ViewerHandle};

// ═══════════════════════════════════════════════════════════════════════════
// In-memory source
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MemoryState {
    meta: Option<InstanceMeta>,
    participants: Vec<Participant>,
    attempts: Vec<Attempt>,
    events: HashMap<EventKind, Vec<Event>>,
    failing: bool,
    panicking: bool,
    event_calls: Vec<(EventKind, EventId)>,
    meta_calls: usize,
}

#[derive(Default)]
struct MemorySource {
    state: Mutex<MemoryState>,
}

impl MemorySource {
    fn with_meta(end_ts: u64, expired: bool) -> Arc<Self> {
        let source = Arc::new(Self::default());
        source.set_meta(end_ts, expired);
        source
    }

    fn set_meta(&self, end_ts: u64, expired: bool) {
        self.state.lock().unwrap().meta = Some(InstanceMeta {
            instance_meta_id: 1,
            map_id: 3,
            start_ts: 0,
            end_ts: Some(end_ts),
            expired,
        });
    }

    fn push(&self, kind: EventKind, events: Vec<Event>) {
        self.state
            .lock()
            .unwrap()
            .events
            .entry(kind)
            .or_default()
            .extend(events);
    }

    fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    fn set_panicking(&self, panicking: bool) {
        self.state.lock().unwrap().panicking = panicking;
    }

    fn set_attempts(&self, attempts: Vec<Attempt>) {
        self.state.lock().unwrap().attempts = attempts;
    }

    fn event_calls(&self) -> Vec<(EventKind, EventId)> {
        self.state.lock().unwrap().event_calls.clone()
    }

    fn meta_calls(&self) -> usize {
        self.state.lock().unwrap().meta_calls
    }

    fn unavailable(what: &str) -> FetchError {
        FetchError::Status {
            url: format!("memory://{what}"),
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl ExportSource for MemorySource {
    async fn fetch_events(
        &self,
        _instance_id: u64,
        kind: EventKind,
        since: EventId,
    ) -> Result<Vec<Event>, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.event_calls.push((kind, since));
        if state.failing {
            return Err(Self::unavailable("events"));
        }
        Ok(state
            .events
            .get(&kind)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.id > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_meta(&self, _instance_id: u64) -> Result<InstanceMeta, FetchError> {
        let mut state = self.state.lock().unwrap();
        if state.panicking {
            drop(state);
            panic!("export source crashed");
        }
        state.meta_calls += 1;
        if state.failing {
            return Err(Self::unavailable("meta"));
        }
        state.meta.clone().ok_or_else(|| Self::unavailable("meta"))
    }

    async fn fetch_participants(&self, _instance_id: u64) -> Result<Vec<Participant>, FetchError> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(Self::unavailable("participants"));
        }
        Ok(state.participants.clone())
    }

    async fn fetch_attempts(&self, _instance_id: u64) -> Result<Vec<Attempt>, FetchError> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(Self::unavailable("attempts"));
        }
        Ok(state.attempts.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn shared_session(instance_id: Option<u64>) -> SharedSession {
    let mut session = InstanceSession::new(instance_id);
    session.set_attempt_intervals(vec![AttemptInterval::new(0, 10_000)]);
    session.set_source_filter([1]);
    session.shared()
}

fn live_sync(source: &Arc<MemorySource>, session: &SharedSession) -> LiveSync<Arc<MemorySource>> {
    LiveSync::new(source.clone(), session.clone(), Duration::from_millis(10))
}

fn attempt(id: u64) -> Attempt {
    Attempt {
        attempt_id: id,
        encounter_id: 1,
        start_ts: id * 100,
        end_ts: id * 100 + 50,
        is_kill: false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Ticks
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn tick_without_instance_fetches_nothing() {
    let source = MemorySource::with_meta(10, false);
    let session = shared_session(None);
    session.write().await.request(EventKind::Death);

    let report = live_sync(&source, &session).tick().await;
    assert!(report.skipped);
    assert_eq!(source.meta_calls(), 0);
    assert!(source.event_calls().is_empty());
}

#[tokio::test]
async fn initial_load_then_incremental_from_cursor() {
    let source = MemorySource::with_meta(10, false);
    source.push(
        EventKind::Death,
        vec![death(1, 10, player(1)), death(4, 20, player(1))],
    );
    let session = shared_session(Some(1));
    session.write().await.request(EventKind::Death);
    let sync = live_sync(&source, &session);

    let report = sync.tick().await;
    assert_eq!(report.loaded, vec![EventKind::Death]);
    assert_eq!(report.published, vec![EventKind::Death]);
    assert_eq!(session.write().await.view(EventKind::Death).ids(), vec![1, 4]);

    source.push(EventKind::Death, vec![death(9, 30, player(1))]);
    let report = sync.tick().await;
    assert_eq!(report.merged, 1);
    assert_eq!(
        source.event_calls(),
        vec![(EventKind::Death, 0), (EventKind::Death, 4)]
    );
    assert_eq!(session.write().await.view(EventKind::Death).ids(), vec![1, 4, 9]);

    // Nothing new: nothing is re-published
    let report = sync.tick().await;
    assert_eq!(report.merged, 0);
    assert!(report.published.is_empty());
}

#[tokio::test]
async fn incremental_merges_follow_dependency_order() {
    let source = MemorySource::with_meta(10, false);
    let session = shared_session(Some(1));
    session.write().await.request(EventKind::Threat);
    let sync = live_sync(&source, &session);
    sync.tick().await;

    let calls = source.event_calls();
    let initial: Vec<EventKind> = calls.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(
        initial,
        vec![EventKind::SpellCast, EventKind::MeleeDamage, EventKind::Threat]
    );
    assert!(calls.iter().all(|(_, since)| *since == 0));
}

#[tokio::test]
async fn late_cause_republishes_dependent_view() {
    let source = MemorySource::with_meta(10, false);
    source.push(EventKind::Interrupt, vec![interrupt(1, 10, player(1), 5, 200)]);

    let session = shared_session(Some(1));
    {
        let mut session = session.write().await;
        session.set_target_filter([3]);
        session.set_ability_filter([100, 200]);
        session.request(EventKind::Interrupt);
    }
    let sync = live_sync(&source, &session);
    sync.tick().await;
    assert!(session.write().await.view(EventKind::Interrupt).is_empty());

    source.push(
        EventKind::SpellCast,
        vec![spell_cast(5, 5, player(1), Some(player(3)), 100)],
    );
    let report = sync.tick().await;
    assert_eq!(report.published, vec![EventKind::SpellCast, EventKind::Interrupt]);

    let view = session.write().await.view(EventKind::Interrupt);
    assert_eq!(view.ids(), vec![1]);
    assert_eq!(view.rows[0].attribution.target, Some(player(3)));
}

#[tokio::test]
async fn meta_and_attempt_changes_are_published_once() {
    let source = MemorySource::with_meta(10, false);
    source.set_attempts(vec![attempt(1)]);
    let session = shared_session(Some(1));
    let mut sub = session.read().await.subscribe();
    let sync = live_sync(&source, &session);

    let first = sync.tick().await;
    assert!(first.meta_changed && first.attempts_grew);
    let second = sync.tick().await;
    assert!(!second.meta_changed && !second.attempts_grew);

    source.set_meta(20, false);
    source.set_attempts(vec![attempt(1), attempt(2)]);
    let third = sync.tick().await;
    assert!(third.meta_changed && third.attempts_grew);

    let subjects = sub.drain();
    let count = |wanted: ChangedSubject| subjects.iter().filter(|s| **s == wanted).count();
    assert_eq!(count(ChangedSubject::InstanceMeta), 2);
    assert_eq!(count(ChangedSubject::Attempts), 2);
    assert_eq!(session.read().await.attempts().len(), 2);
}

#[tokio::test]
async fn repeated_failures_keep_kinds_pending() {
    let source = MemorySource::with_meta(10, false);
    source.push(EventKind::Death, vec![death(1, 10, player(1))]);
    source.set_failing(true);
    let session = shared_session(Some(1));
    session.write().await.request(EventKind::Death);
    let sync = live_sync(&source, &session);

    for _ in 0..5 {
        let report = sync.tick().await;
        assert_eq!(report.failures, 3);
        assert!(report.loaded.is_empty());
        assert!(!report.expired);
    }
    assert_eq!(session.read().await.pending_loads(), vec![EventKind::Death]);
    assert!(session.read().await.meta().is_none());

    source.set_failing(false);
    let report = sync.tick().await;
    assert_eq!(report.failures, 0);
    assert_eq!(report.loaded, vec![EventKind::Death]);
    assert!(session.read().await.pending_loads().is_empty());
}

#[tokio::test]
async fn failed_incremental_fetch_keeps_cursor() {
    let source = MemorySource::with_meta(10, false);
    source.push(EventKind::Loot, vec![loot(3, 30, player(1), 77)]);
    let session = shared_session(Some(1));
    session.write().await.request(EventKind::Loot);
    let sync = live_sync(&source, &session);
    sync.tick().await;

    source.set_failing(true);
    sync.tick().await;
    source.set_failing(false);
    source.push(EventKind::Loot, vec![loot(8, 80, player(1), 77)]);
    let report = sync.tick().await;

    assert_eq!(report.merged, 1);
    assert_eq!(session.read().await.cursor(EventKind::Loot), 8);
    assert_eq!(source.event_calls().last(), Some(&(EventKind::Loot, 3)));
}

#[tokio::test]
async fn load_runs_initial_fetch_immediately() {
    let source = MemorySource::with_meta(10, false);
    source.push(EventKind::Death, vec![death(2, 10, player(1))]);
    let session = shared_session(Some(1));
    let sync = live_sync(&source, &session);

    let report = sync.load(EventKind::Death).await;
    assert_eq!(report.loaded, vec![EventKind::Death]);
    assert_eq!(report.published, vec![EventKind::Death]);
    assert_eq!(source.meta_calls(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Run loop & handle
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn run_stops_on_expiry_and_keeps_stores() {
    let source = MemorySource::with_meta(10, true);
    source.push(EventKind::Death, vec![death(1, 10, player(1))]);
    let session = shared_session(Some(1));
    session.write().await.request(EventKind::Death);

    let (_tx, rx) = mpsc::channel(4);
    let sync = live_sync(&source, &session);
    tokio::time::timeout(Duration::from_secs(5), sync.run(rx))
        .await
        .expect("poller should stop once the instance expired");

    let mut session = session.write().await;
    assert!(session.is_expired());
    assert!(!session.is_disposed());
    assert_eq!(session.view(EventKind::Death).ids(), vec![1]);
}

#[tokio::test]
async fn zero_poll_interval_is_clamped() {
    let source = MemorySource::with_meta(10, false);
    let session = shared_session(Some(1));
    let (tx, rx) = mpsc::channel(4);

    let sync = LiveSync::new(source, session, Duration::ZERO);
    assert_eq!(sync.poll_interval(), Duration::from_millis(1));

    tx.send(SyncCommand::Shutdown).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), sync.run(rx))
        .await
        .expect("poller should stop on shutdown");
}

#[tokio::test]
async fn run_stops_on_shutdown_command() {
    let source = MemorySource::with_meta(10, false);
    let session = shared_session(Some(1));
    let (tx, rx) = mpsc::channel(4);
    tx.send(SyncCommand::Shutdown).await.unwrap();

    let sync = LiveSync::new(source, session, Duration::from_secs(3600));
    tokio::time::timeout(Duration::from_secs(5), sync.run(rx))
        .await
        .expect("poller should stop on shutdown");
}

#[tokio::test]
async fn handle_load_publishes_and_shutdown_disposes() {
    let source = MemorySource::with_meta(10, false);
    source.push(EventKind::Death, vec![death(1, 10, player(1))]);
    let session = shared_session(Some(1));
    let (_, mut watch) = session.write().await.watch(EventKind::Death);

    let handle = ViewerHandle::spawn(source, session.clone(), Duration::from_secs(3600));
    assert!(handle.is_running());
    assert!(handle.load(EventKind::Death).await);

    let changed = tokio::time::timeout(Duration::from_secs(5), watch.changed())
        .await
        .expect("load should publish");
    assert!(changed);
    assert_eq!(session.write().await.view(EventKind::Death).ids(), vec![1]);

    handle.shutdown().await;
    assert!(session.read().await.is_disposed());
    assert!(!watch.changed().await);
}

#[tokio::test]
async fn dropping_handle_disposes_session() {
    let source = MemorySource::with_meta(10, false);
    let session = shared_session(Some(1));
    let (_, mut watch) = session.write().await.watch(EventKind::Death);
    let mut subscription = session.read().await.subscribe();

    let handle = ViewerHandle::spawn(source, session.clone(), Duration::from_secs(3600));
    drop(handle);

    assert!(session.read().await.is_disposed());
    let changed = tokio::time::timeout(Duration::from_millis(500), watch.changed())
        .await
        .expect("watch should close with the handle");
    assert!(!changed);
    assert!(subscription.recv().await.is_none());
}

#[tokio::test]
async fn dropping_handle_while_session_is_locked_disposes_later() {
    let source = MemorySource::with_meta(10, false);
    let session = shared_session(Some(1));
    let (_, mut watch) = session.write().await.watch(EventKind::Death);

    let handle = ViewerHandle::spawn(source, session.clone(), Duration::from_secs(3600));
    let guard = session.read().await;
    drop(handle);
    assert!(!guard.is_disposed());
    drop(guard);

    let changed = tokio::time::timeout(Duration::from_millis(500), watch.changed())
        .await
        .expect("watch should close once the lock is free");
    assert!(!changed);
    assert!(session.read().await.is_disposed());
}

#[tokio::test]
async fn shutdown_after_poller_panic_still_disposes() {
    let source = MemorySource::with_meta(10, false);
    source.set_panicking(true);
    let session = shared_session(Some(1));
    let (_, mut watch) = session.write().await.watch(EventKind::Death);

    let handle = ViewerHandle::spawn(source, session.clone(), Duration::from_secs(3600));
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.is_running() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("poller should have stopped");

    handle.shutdown().await;
    assert!(session.read().await.is_disposed());
    assert!(!watch.changed().await);
}
