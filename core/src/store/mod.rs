//! Per-kind event containers.
//!
//! Kinds that other kinds point at through cause ids (spell casts, aura
//! applications, melee damage) are indexed by id for constant-time lookups.
//! Every other kind is an arrival-ordered sequence. Both reject duplicate ids:
//! a re-delivered id overwrites the stored event in place.

use hashbrown::HashMap;

use crate::combat_log::{
    AuraApplication, Event, EventId, EventKind, MeleeDamage, SpellCast,
};

// ─────────────────────────────────────────────────────────────────────────────
// Kind Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Container {
    Indexed(HashMap<EventId, Event>),
    Sequence {
        events: Vec<Event>,
        positions: HashMap<EventId, usize>,
    },
}

/// Events of a single kind plus the ingestion cursor.
#[derive(Debug, Clone)]
pub struct KindStore {
    kind: EventKind,
    container: Container,
    max_id: EventId,
}

impl KindStore {
    pub fn new(kind: EventKind) -> Self {
        let container = if kind.is_indexed() {
            Container::Indexed(HashMap::new())
        } else {
            Container::Sequence {
                events: Vec::new(),
                positions: HashMap::new(),
            }
        };
        Self {
            kind,
            container,
            max_id: 0,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Merge a batch, last write wins per id. Returns the number of events taken.
    pub fn merge(&mut self, events: Vec<Event>) -> usize {
        let mut merged = 0;
        for event in events {
            if event.kind() != self.kind {
                tracing::warn!(
                    expected = %self.kind,
                    actual = %event.kind(),
                    id = event.id,
                    "Dropping event merged into the wrong store"
                );
                continue;
            }
            self.max_id = self.max_id.max(event.id);
            match &mut self.container {
                Container::Indexed(map) => {
                    map.insert(event.id, event);
                }
                Container::Sequence { events: stored, positions } => {
                    if let Some(&pos) = positions.get(&event.id) {
                        stored[pos] = event;
                    } else {
                        positions.insert(event.id, stored.len());
                        stored.push(event);
                    }
                }
            }
            merged += 1;
        }
        merged
    }

    /// Lower bound for the next incremental fetch, 0 when empty
    // Highest id seen, not the last element: a sequence kind receiving an
    // older id out of order must not move the cursor backwards.
    pub fn cursor(&self) -> EventId {
        self.max_id
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        match &self.container {
            Container::Indexed(map) => map.get(&id),
            Container::Sequence { events, positions } => {
                positions.get(&id).map(|&pos| &events[pos])
            }
        }
    }

    /// Stored events; indexed kinds come back in id order, sequences in arrival order
    pub fn events(&self) -> Vec<&Event> {
        match &self.container {
            Container::Indexed(map) => {
                let mut events: Vec<&Event> = map.values().collect();
                events.sort_unstable_by_key(|event| event.id);
                events
            }
            Container::Sequence { events, .. } => events.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.container {
            Container::Indexed(map) => map.len(),
            Container::Sequence { events, .. } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event Store
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a kind's store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Never requested
    Absent,
    /// Requested, waiting for the initial full fetch
    Pending,
    /// Initial fetch merged, polled from now on
    Ready,
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Ready(KindStore),
}

/// All kind stores of one instance, created lazily on first request.
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    slots: HashMap<EventKind, Slot>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the store for `kind` if it does not exist yet. Returns true if created.
    pub fn request(&mut self, kind: EventKind) -> bool {
        if self.slots.contains_key(&kind) {
            return false;
        }
        self.slots.insert(kind, Slot::Pending);
        true
    }

    pub fn state(&self, kind: EventKind) -> StoreState {
        match self.slots.get(&kind) {
            None => StoreState::Absent,
            Some(Slot::Pending) => StoreState::Pending,
            Some(Slot::Ready(_)) => StoreState::Ready,
        }
    }

    pub fn is_ready(&self, kind: EventKind) -> bool {
        self.state(kind) == StoreState::Ready
    }

    /// Promote a pending (or absent) kind to ready. No-op when already ready.
    pub fn mark_ready(&mut self, kind: EventKind) {
        if !self.is_ready(kind) {
            self.slots.insert(kind, Slot::Ready(KindStore::new(kind)));
        }
    }

    /// Merge into a ready store. `None` when the kind is not ready.
    pub fn merge(&mut self, kind: EventKind, events: Vec<Event>) -> Option<usize> {
        match self.slots.get_mut(&kind) {
            Some(Slot::Ready(store)) => Some(store.merge(events)),
            _ => None,
        }
    }

    pub fn store(&self, kind: EventKind) -> Option<&KindStore> {
        match self.slots.get(&kind) {
            Some(Slot::Ready(store)) => Some(store),
            _ => None,
        }
    }

    pub fn cursor(&self, kind: EventKind) -> EventId {
        self.store(kind).map(KindStore::cursor).unwrap_or(0)
    }

    pub fn events(&self, kind: EventKind) -> Vec<&Event> {
        self.store(kind).map(KindStore::events).unwrap_or_default()
    }

    /// Look up an event of `kind` by id. Absent store or id resolves to `None`.
    pub fn lookup(&self, kind: EventKind, id: EventId) -> Option<&Event> {
        self.store(kind)?.get(id)
    }

    pub fn spell_cast(&self, id: EventId) -> Option<&SpellCast> {
        self.lookup(EventKind::SpellCast, id)?.as_spell_cast()
    }

    pub fn aura_application(&self, id: EventId) -> Option<&AuraApplication> {
        self.lookup(EventKind::AuraApplication, id)?
            .as_aura_application()
    }

    pub fn melee_damage(&self, id: EventId) -> Option<&MeleeDamage> {
        self.lookup(EventKind::MeleeDamage, id)?.as_melee_damage()
    }

    /// Ready kinds in wire-code order
    pub fn ready_kinds(&self) -> Vec<EventKind> {
        self.kinds_in(StoreState::Ready)
    }

    /// Kinds still waiting for their initial fetch, in wire-code order
    pub fn pending_kinds(&self) -> Vec<EventKind> {
        self.kinds_in(StoreState::Pending)
    }

    fn kinds_in(&self, state: StoreState) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| self.state(*kind) == state)
            .collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests;
