//! Filter pipeline over a kind's stored events
//!
//! Three stages with a fixed, non-commutative order:
//!
//! 1. interval + source: the timestamp lies in an active attempt interval and
//!    the resolved source is in the source set
//! 2. target: the resolved target is the event's own subject, or is in the
//!    target set
//! 3. ability: every resolved ability id is in the ability set
//!
//! Kinds without target correlation skip stage 2, kinds without ability
//! correlation skip stage 3. Filter sets are replaced wholesale, never merged.

use std::collections::HashSet;

use crate::combat_log::{AbilityId, Event, EventId, EventKind, UnitId};
use crate::context::{AttemptInterval, in_any_interval};
use crate::correlation::{Attribution, Resolver};
use crate::store::EventStore;

// ─────────────────────────────────────────────────────────────────────────────
// Filter State
// ─────────────────────────────────────────────────────────────────────────────

/// Active intervals plus the source/target/ability selections.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    intervals: Vec<AttemptInterval>,
    sources: HashSet<UnitId>,
    targets: HashSet<UnitId>,
    abilities: HashSet<AbilityId>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intervals(&self) -> &[AttemptInterval] {
        &self.intervals
    }

    pub fn sources(&self) -> &HashSet<UnitId> {
        &self.sources
    }

    pub fn targets(&self) -> &HashSet<UnitId> {
        &self.targets
    }

    pub fn abilities(&self) -> &HashSet<AbilityId> {
        &self.abilities
    }

    pub fn set_intervals(&mut self, intervals: Vec<AttemptInterval>) {
        self.intervals = intervals;
    }

    pub fn set_sources(&mut self, sources: impl IntoIterator<Item = UnitId>) {
        self.sources = sources.into_iter().collect();
    }

    pub fn set_targets(&mut self, targets: impl IntoIterator<Item = UnitId>) {
        self.targets = targets.into_iter().collect();
    }

    pub fn set_abilities(&mut self, abilities: impl IntoIterator<Item = AbilityId>) {
        self.abilities = abilities.into_iter().collect();
    }

    /// Same state with the source and target selections swapped
    pub fn inverted(&self) -> Self {
        Self {
            intervals: self.intervals.clone(),
            sources: self.targets.clone(),
            targets: self.sources.clone(),
            abilities: self.abilities.clone(),
        }
    }

    // ─── Stages ────────────────────────────────────────────────────────────────

    pub fn in_attempt(&self, event: &Event) -> bool {
        in_any_interval(&self.intervals, event.timestamp)
    }

    /// Stage 1
    pub fn passes_interval_source(&self, event: &Event, attribution: &Attribution) -> bool {
        self.in_attempt(event) && self.sources.contains(&attribution.source.unit_id)
    }

    /// Stage 2. An absent target only survives through the subject check, which
    /// it cannot satisfy.
    pub fn passes_target(&self, event: &Event, attribution: &Attribution) -> bool {
        match attribution.target {
            Some(target) => target == event.subject || self.targets.contains(&target.unit_id),
            None => false,
        }
    }

    /// Stage 3. An unresolved ability never matches, and an empty filter only
    /// admits events without abilities.
    pub fn passes_abilities(&self, attribution: &Attribution) -> bool {
        attribution
            .abilities
            .iter()
            .all(|ability| ability.is_some_and(|id| self.abilities.contains(&id)))
    }

    /// All stages that apply to `kind`, in order
    pub fn admits(&self, kind: EventKind, event: &Event, attribution: &Attribution) -> bool {
        if !self.passes_interval_source(event, attribution) {
            return false;
        }
        if kind.correlates_target() && !self.passes_target(event, attribution) {
            return false;
        }
        if kind.correlates_abilities() && !self.passes_abilities(attribution) {
            return false;
        }
        true
    }

    /// Run the pipeline over every stored event of `kind`
    pub fn apply(&self, kind: EventKind, store: &EventStore) -> FilteredView {
        let resolver = Resolver::new(store);
        let rows = store
            .events(kind)
            .into_iter()
            .filter_map(|event| {
                let attribution = resolver.resolve(event);
                self.admits(kind, event, &attribution).then(|| ViewRow {
                    event: event.clone(),
                    attribution,
                })
            })
            .collect();
        FilteredView { kind, rows }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Published Views
// ─────────────────────────────────────────────────────────────────────────────

/// An event that survived the pipeline, with the attribution it was judged by.
#[derive(Debug, Clone)]
pub struct ViewRow {
    pub event: Event,
    pub attribution: Attribution,
}

/// Snapshot of one kind's filtered events, in store order.
#[derive(Debug, Clone)]
pub struct FilteredView {
    pub kind: EventKind,
    pub rows: Vec<ViewRow>,
}

impl FilteredView {
    pub fn empty(kind: EventKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.rows.iter().map(|row| &row.event)
    }

    pub fn ids(&self) -> Vec<EventId> {
        self.rows.iter().map(|row| row.event.id).collect()
    }
}
