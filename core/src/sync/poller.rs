use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::combat_log::EventKind;
use crate::context::SyncTasks;
use crate::correlation::dependency_order;
use crate::session::SharedSession;

use super::ExportSource;

/// Shortest poll interval; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Messages sent to a running poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// Request a kind and run its initial load right away
    Load(EventKind),
    /// Run a tick now instead of waiting for the timer
    Refresh,
    Shutdown,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// No instance id, nothing was fetched
    pub skipped: bool,
    pub meta_changed: bool,
    pub attempts_grew: bool,
    /// Kinds that completed their initial load
    pub loaded: Vec<EventKind>,
    /// Events merged by incremental fetches
    pub merged: usize,
    pub failures: usize,
    pub published: Vec<EventKind>,
    /// Instance metadata reports no further data
    pub expired: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Live Sync
// ─────────────────────────────────────────────────────────────────────────────

/// Periodic incremental fetcher feeding one session.
pub struct LiveSync<S> {
    source: S,
    session: SharedSession,
    poll_interval: Duration,
}

impl<S: ExportSource> LiveSync<S> {
    pub fn new(source: S, session: SharedSession, poll_interval: Duration) -> Self {
        Self {
            source,
            session,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    async fn instance_id(&self) -> Option<u64> {
        let session = self.session.read().await;
        if session.is_disposed() {
            return None;
        }
        session.instance_id()
    }

    /// Fetch metadata, participants and attempts once
    pub async fn bootstrap(&self) -> TickReport {
        let mut report = TickReport::default();
        let Some(instance_id) = self.instance_id().await else {
            report.skipped = true;
            return report;
        };

        self.refresh_meta(instance_id, &mut report).await;

        match self.source.fetch_participants(instance_id).await {
            Ok(participants) => {
                tracing::debug!(count = participants.len(), "Fetched participants");
                self.session.write().await.update_participants(participants);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch participants");
                report.failures += 1;
            }
        }

        self.refresh_attempts(instance_id, &mut report).await;
        report.expired = self.session.read().await.is_expired();
        report
    }

    /// One poll round: metadata, attempts, initial loads, incremental merges
    /// in dependency order, then a single publish pass.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let Some(instance_id) = self.instance_id().await else {
            report.skipped = true;
            return report;
        };

        self.refresh_meta(instance_id, &mut report).await;
        self.refresh_attempts(instance_id, &mut report).await;

        let ready = self.session.read().await.ready_kinds();
        self.load_pending(instance_id, &mut report).await;

        for kind in dependency_order(ready) {
            let since = self.session.read().await.cursor(kind);
            match self.source.fetch_events(instance_id, kind, since).await {
                Ok(events) if events.is_empty() => {}
                Ok(events) => {
                    report.merged += self.session.write().await.ingest(kind, events);
                }
                Err(e) => {
                    tracing::warn!(%kind, since, error = %e, "Failed to fetch events");
                    report.failures += 1;
                }
            }
        }

        report.published = self.session.write().await.publish_pending();
        report.expired = self.session.read().await.is_expired();

        tracing::debug!(
            merged = report.merged,
            loaded = report.loaded.len(),
            published = report.published.len(),
            failures = report.failures,
            "Tick complete"
        );
        report
    }

    /// Request `kind` and run initial loads without waiting for the next tick
    pub async fn load(&self, kind: EventKind) -> TickReport {
        self.session.write().await.request(kind);

        let mut report = TickReport::default();
        let Some(instance_id) = self.instance_id().await else {
            report.skipped = true;
            return report;
        };
        self.load_pending(instance_id, &mut report).await;
        report.published = self.session.write().await.publish_pending();
        report
    }

    async fn refresh_meta(&self, instance_id: u64, report: &mut TickReport) {
        match self.source.fetch_meta(instance_id).await {
            Ok(meta) => {
                report.meta_changed = self.session.write().await.update_meta(meta);
            }
            Err(e) => {
                tracing::warn!(instance_id, error = %e, "Failed to fetch instance metadata");
                report.failures += 1;
            }
        }
    }

    async fn refresh_attempts(&self, instance_id: u64, report: &mut TickReport) {
        match self.source.fetch_attempts(instance_id).await {
            Ok(attempts) => {
                report.attempts_grew = self.session.write().await.update_attempts(attempts);
            }
            Err(e) => {
                tracing::warn!(instance_id, error = %e, "Failed to fetch attempts");
                report.failures += 1;
            }
        }
    }

    /// Full fetch from cursor 0 for every kind still pending. A failed fetch
    /// leaves the kind pending for the next round.
    async fn load_pending(&self, instance_id: u64, report: &mut TickReport) {
        let pending = self.session.read().await.pending_loads();
        for kind in dependency_order(pending) {
            match self.source.fetch_events(instance_id, kind, 0).await {
                Ok(events) => {
                    let merged = self
                        .session
                        .write()
                        .await
                        .complete_initial_load(kind, events);
                    tracing::info!(%kind, merged, "Loaded kind");
                    report.loaded.push(kind);
                }
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "Initial load failed");
                    report.failures += 1;
                }
            }
        }
    }

    /// Poll until shutdown, a closed command channel, or expiry.
    ///
    /// The first tick runs immediately. Missed ticks are skipped rather than
    /// bunched up behind a slow fetch.
    pub async fn run(self, mut commands: mpsc::Receiver<SyncCommand>) {
        let instance_id = self.instance_id().await;
        tracing::info!(?instance_id, interval = ?self.poll_interval, "Live sync started");

        if self.bootstrap().await.expired {
            tracing::info!("Instance already expired, polling once");
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await.expired {
                        tracing::info!("Instance expired, stopping live sync");
                        break;
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(SyncCommand::Load(kind)) => {
                            self.load(kind).await;
                        }
                        Some(SyncCommand::Refresh) => {
                            if self.tick().await.expired {
                                tracing::info!("Instance expired, stopping live sync");
                                break;
                            }
                        }
                        Some(SyncCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        tracing::info!(?instance_id, "Live sync stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// A session with its poller running in the background.
///
/// Dropping the handle aborts the poller and disposes the session.
/// [`ViewerHandle::shutdown`] stops the poller gracefully first. Either way
/// every subscription is closed.
pub struct ViewerHandle {
    session: SharedSession,
    commands: mpsc::Sender<SyncCommand>,
    tasks: SyncTasks,
}

impl ViewerHandle {
    /// Spawn the poller on the current tokio runtime
    pub fn spawn<S: ExportSource>(
        source: S,
        session: SharedSession,
        poll_interval: Duration,
    ) -> Self {
        let (commands, rx) = mpsc::channel(32);
        let sync = LiveSync::new(source, session.clone(), poll_interval);
        let poller = tokio::spawn(sync.run(rx));

        Self {
            session,
            commands,
            tasks: SyncTasks {
                poller: Some(poller),
            },
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.tasks.is_running()
    }

    /// Returns false if the poller is gone
    pub async fn load(&self, kind: EventKind) -> bool {
        self.commands.send(SyncCommand::Load(kind)).await.is_ok()
    }

    pub async fn refresh(&self) -> bool {
        self.commands.send(SyncCommand::Refresh).await.is_ok()
    }

    pub async fn shutdown(mut self) {
        let _ = self.commands.send(SyncCommand::Shutdown).await;
        if let Some(handle) = self.tasks.poller.take()
            && let Err(e) = handle.await
            && e.is_panic()
        {
            tracing::warn!(error = %e, "Live sync task panicked");
        }
        self.session.write().await.dispose();
    }
}

impl Drop for ViewerHandle {
    fn drop(&mut self) {
        self.tasks.abort_all();

        if let Ok(mut session) = self.session.try_write() {
            session.dispose();
            return;
        }

        // The aborted poller may still hold the lock until it is dropped
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let session = self.session.clone();
                runtime.spawn(async move {
                    session.write().await.dispose();
                });
            }
            Err(_) => {
                tracing::warn!("Session lock busy outside a runtime, subscriptions stay open");
            }
        }
    }
}
