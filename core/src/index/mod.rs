//! Derived sources, targets and abilities observed inside the active attempts.
//!
//! The sets only grow until the interval set is replaced, at which point they
//! are reset to empty and refilled by subsequent publish passes.

use std::collections::BTreeSet;

use hashbrown::HashSet;

use crate::combat_log::{AbilityId, Event, EventKind, Unit, UnitId};
use crate::context::{AttemptInterval, in_any_interval};
use crate::correlation::Resolver;

#[derive(Debug, Clone, Default)]
pub struct DerivedIndex {
    sources: Vec<Unit>,
    source_ids: HashSet<UnitId>,
    targets: Vec<Unit>,
    target_ids: HashSet<UnitId>,
    abilities: BTreeSet<AbilityId>,
}

/// Which sets an `extend` call added to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexGrowth {
    pub sources: bool,
    pub targets: bool,
    pub abilities: bool,
}

impl IndexGrowth {
    pub fn any(&self) -> bool {
        self.sources || self.targets || self.abilities
    }
}

impl DerivedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units in first-seen order
    pub fn sources(&self) -> &[Unit] {
        &self.sources
    }

    pub fn targets(&self) -> &[Unit] {
        &self.targets
    }

    pub fn abilities(&self) -> &BTreeSet<AbilityId> {
        &self.abilities
    }

    pub fn has_source(&self, unit_id: UnitId) -> bool {
        self.source_ids.contains(&unit_id)
    }

    pub fn has_target(&self, unit_id: UnitId) -> bool {
        self.target_ids.contains(&unit_id)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.targets.is_empty() && self.abilities.is_empty()
    }

    /// Add the attribution of every in-attempt event. Targets and abilities are
    /// only taken from kinds that correlate them; unresolved entries are skipped.
    pub fn extend<'e>(
        &mut self,
        kind: EventKind,
        events: impl IntoIterator<Item = &'e Event>,
        resolver: &Resolver<'_>,
        intervals: &[AttemptInterval],
    ) -> IndexGrowth {
        let mut growth = IndexGrowth::default();

        for event in events {
            if !in_any_interval(intervals, event.timestamp) {
                continue;
            }

            let source = resolver.source(event);
            if self.source_ids.insert(source.unit_id) {
                self.sources.push(source);
                growth.sources = true;
            }

            if kind.correlates_target()
                && let Some(target) = resolver.target(event)
                && self.target_ids.insert(target.unit_id)
            {
                self.targets.push(target);
                growth.targets = true;
            }

            if kind.correlates_abilities() {
                for ability in resolver.abilities(event).into_iter().flatten() {
                    growth.abilities |= self.abilities.insert(ability);
                }
            }
        }

        growth
    }

    pub fn reset(&mut self) {
        self.sources.clear();
        self.source_ids.clear();
        self.targets.clear();
        self.target_ids.clear();
        self.abilities.clear();
    }
}
