//! The instance session: stores, filters, derived indices and publication.
//!
//! All mutation goes through [`InstanceSession`], which is shared as
//! [`SharedSession`] between the live sync task and consumers. Mutations never
//! publish directly. They schedule the affected kinds, and
//! [`InstanceSession::publish_pending`] re-evaluates the schedule in
//! dependency order (causes before the kinds that read them).

mod bus;


use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use tokio::sync::RwLock;

use crate::combat_log::{AbilityId, Event, EventKind, Unit, UnitId};
use crate::context::{
    Attempt, AttemptInterval, InstanceMeta, Participant, total_duration,
};
use crate::correlation::{Resolver, dependency_order, republish_closure};
use crate::filter::{FilterState, FilteredView};
use crate::index::DerivedIndex;
use crate::store::{EventStore, StoreState};

pub use bus::{ChangeBus, ChangedSubject, KindWatch, Subscription};

/// Session shared between the poller and consumers
pub type SharedSession = Arc<RwLock<InstanceSession>>;

pub struct InstanceSession {
    instance_id: Option<u64>,
    store: EventStore,
    filter: FilterState,
    index: DerivedIndex,
    views: HashMap<EventKind, Arc<FilteredView>>,
    scheduled: BTreeSet<EventKind>,
    meta: Option<InstanceMeta>,
    participants: Vec<Participant>,
    attempts: Vec<Attempt>,
    attempt_total_duration: u64,
    bus: ChangeBus,
    disposed: bool,
}

impl Default for InstanceSession {
    fn default() -> Self {
        Self::new(None)
    }
}

impl InstanceSession {
    pub fn new(instance_id: Option<u64>) -> Self {
        Self {
            instance_id,
            store: EventStore::new(),
            filter: FilterState::new(),
            index: DerivedIndex::new(),
            views: HashMap::new(),
            scheduled: BTreeSet::new(),
            meta: None,
            participants: Vec::new(),
            attempts: Vec::new(),
            attempt_total_duration: total_duration(&[]),
            bus: ChangeBus::new(),
            disposed: false,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn instance_id(&self) -> Option<u64> {
        self.instance_id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Kind lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start tracking `kind` and every kind its correlation reads.
    /// Returns true if `kind` itself was not tracked before.
    pub fn request(&mut self, kind: EventKind) -> bool {
        if self.disposed {
            return false;
        }
        for cause in kind.causes() {
            if self.store.request(*cause) {
                tracing::debug!(kind = %cause, dependent = %kind, "Requested cause kind");
            }
        }
        let created = self.store.request(kind);
        if created {
            tracing::debug!(%kind, "Requested kind");
        }
        created
    }

    /// Current filtered snapshot of `kind`, requesting it if needed.
    /// Empty until the kind's initial load has been published.
    pub fn view(&mut self, kind: EventKind) -> Arc<FilteredView> {
        self.request(kind);
        self.views
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(FilteredView::empty(kind)))
    }

    /// Last published view of `kind`, without requesting it
    pub fn published(&self, kind: EventKind) -> Option<Arc<FilteredView>> {
        self.views.get(&kind).cloned()
    }

    /// Published kind re-filtered with the source and target selections
    /// swapped. `None` until the kind has been published.
    pub fn inverse_view(&self, kind: EventKind) -> Option<FilteredView> {
        if !self.views.contains_key(&kind) {
            return None;
        }
        Some(self.filter.inverted().apply(kind, &self.store))
    }

    /// Snapshot plus a watch that fires on each later publish of the kind
    pub fn watch(&mut self, kind: EventKind) -> (Arc<FilteredView>, KindWatch) {
        let watch = KindWatch::new(kind, self.bus.subscribe());
        (self.view(kind), watch)
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn state(&self, kind: EventKind) -> StoreState {
        self.store.state(kind)
    }

    /// Kinds waiting for their initial full fetch
    pub fn pending_loads(&self) -> Vec<EventKind> {
        self.store.pending_kinds()
    }

    pub fn ready_kinds(&self) -> Vec<EventKind> {
        self.store.ready_kinds()
    }

    pub fn cursor(&self, kind: EventKind) -> u64 {
        self.store.cursor(kind)
    }

    /// Merge the initial full fetch of a kind. The kind and its dependents are
    /// scheduled even when the page is empty.
    pub fn complete_initial_load(&mut self, kind: EventKind, events: Vec<Event>) -> usize {
        if self.disposed {
            return 0;
        }
        self.store.mark_ready(kind);
        let merged = self.store.merge(kind, events).unwrap_or(0);
        tracing::debug!(%kind, merged, "Initial load complete");
        self.schedule(&[kind]);
        merged
    }

    /// Merge newly fetched events into a ready kind. A non-empty merge schedules
    /// the kind and everything depending on it.
    pub fn ingest(&mut self, kind: EventKind, events: Vec<Event>) -> usize {
        if self.disposed {
            return 0;
        }
        let Some(merged) = self.store.merge(kind, events) else {
            tracing::debug!(%kind, "Ignoring events for a kind that is not loaded");
            return 0;
        };
        if merged > 0 {
            tracing::debug!(%kind, merged, cursor = self.store.cursor(kind), "Merged events");
            self.schedule(&[kind]);
        }
        merged
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publication
    // ─────────────────────────────────────────────────────────────────────────

    fn schedule(&mut self, changed: &[EventKind]) {
        for kind in republish_closure(changed) {
            if self.store.is_ready(kind) {
                self.scheduled.insert(kind);
            }
        }
    }

    fn schedule_all(&mut self) {
        let ready = self.store.ready_kinds();
        self.scheduled.extend(ready);
    }

    /// Kinds waiting for the next publish pass
    pub fn scheduled(&self) -> Vec<EventKind> {
        dependency_order(self.scheduled.iter().copied())
    }

    /// Recompute the filtered view of every scheduled kind in dependency order,
    /// extend the derived indices and notify subscribers. Returns the kinds
    /// published, in order.
    pub fn publish_pending(&mut self) -> Vec<EventKind> {
        if self.disposed || self.scheduled.is_empty() {
            return Vec::new();
        }

        let order = dependency_order(std::mem::take(&mut self.scheduled));
        let resolver = Resolver::new(&self.store);

        for &kind in &order {
            let view = self.filter.apply(kind, &self.store);
            let growth = self.index.extend(
                kind,
                self.store.events(kind),
                &resolver,
                self.filter.intervals(),
            );
            tracing::debug!(
                %kind,
                rows = view.len(),
                index_grew = growth.any(),
                "Published view"
            );
            self.views.insert(kind, Arc::new(view));
            self.bus.publish(kind.into());
        }

        self.publish_index();
        order
    }

    fn publish_index(&self) {
        self.bus.publish(ChangedSubject::Sources);
        self.bus.publish(ChangedSubject::Targets);
        self.bus.publish(ChangedSubject::Abilities);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_source_filter(&mut self, sources: impl IntoIterator<Item = UnitId>) {
        self.filter.set_sources(sources);
        self.schedule_all();
    }

    pub fn set_target_filter(&mut self, targets: impl IntoIterator<Item = UnitId>) {
        self.filter.set_targets(targets);
        self.schedule_all();
    }

    pub fn set_ability_filter(&mut self, abilities: impl IntoIterator<Item = AbilityId>) {
        self.filter.set_abilities(abilities);
        self.schedule_all();
    }

    /// Replace the active attempts. The derived indices start over and only
    /// refill from the next publish pass.
    pub fn set_attempt_intervals(&mut self, intervals: Vec<AttemptInterval>) {
        if self.disposed {
            return;
        }
        self.attempt_total_duration = total_duration(&intervals);
        self.filter.set_intervals(intervals);
        self.bus.publish(ChangedSubject::AttemptTotalDuration);

        self.index.reset();
        self.publish_index();

        self.schedule_all();
    }

    pub fn attempt_total_duration(&self) -> u64 {
        self.attempt_total_duration
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Derived indices
    // ─────────────────────────────────────────────────────────────────────────

    pub fn sources(&self) -> &[Unit] {
        self.index.sources()
    }

    pub fn targets(&self) -> &[Unit] {
        self.index.targets()
    }

    pub fn abilities(&self) -> &BTreeSet<AbilityId> {
        self.index.abilities()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Instance metadata
    // ─────────────────────────────────────────────────────────────────────────

    pub fn meta(&self) -> Option<&InstanceMeta> {
        self.meta.as_ref()
    }

    pub fn is_expired(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.expired)
    }

    /// Store fresh metadata. Publishes when it is the first or its end moved.
    pub fn update_meta(&mut self, meta: InstanceMeta) -> bool {
        if self.disposed {
            return false;
        }
        let changed = self
            .meta
            .as_ref()
            .is_none_or(|current| current.end_ts != meta.end_ts);
        self.meta = Some(meta);
        if changed {
            self.bus.publish(ChangedSubject::InstanceMeta);
        }
        changed
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn update_participants(&mut self, participants: Vec<Participant>) {
        if self.disposed {
            return;
        }
        self.participants = participants;
        self.bus.publish(ChangedSubject::Participants);
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Take the attempt list only if it grew. Returns whether it was taken.
    pub fn update_attempts(&mut self, attempts: Vec<Attempt>) -> bool {
        if self.disposed || attempts.len() <= self.attempts.len() {
            return false;
        }
        self.attempts = attempts;
        self.bus.publish(ChangedSubject::Attempts);
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// End the session: every subscription is closed and the stores dropped.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.bus.close();
        self.store.clear();
        self.views.clear();
        self.scheduled.clear();
        self.index.reset();
        tracing::info!(instance_id = ?self.instance_id, "Session disposed");
    }
}
