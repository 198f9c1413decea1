//! Dependency graph between kinds.
//!
//! An edge `cause -> dependent` exists when the dependent's correlation reads
//! the cause kind's store. When a cause store changes, every kind reachable
//! from it may now resolve differently and has to be re-published, producers
//! before consumers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::combat_log::EventKind;

/// Kinds that read `kind` through cause ids
pub fn dependents(kind: EventKind) -> Vec<EventKind> {
    EventKind::ALL
        .into_iter()
        .filter(|candidate| candidate.causes().contains(&kind))
        .collect()
}

/// `changed` plus everything transitively depending on it, in dependency order
pub fn republish_closure(changed: &[EventKind]) -> Vec<EventKind> {
    let mut seen: BTreeSet<EventKind> = changed.iter().copied().collect();
    let mut queue: VecDeque<EventKind> = changed.iter().copied().collect();

    while let Some(kind) = queue.pop_front() {
        for dependent in dependents(kind) {
            if seen.insert(dependent) {
                queue.push_back(dependent);
            }
        }
    }

    dependency_order(seen)
}

/// Topologically sort `kinds` so every cause precedes its dependents.
/// Independent kinds keep wire-code order.
pub fn dependency_order(kinds: impl IntoIterator<Item = EventKind>) -> Vec<EventKind> {
    let selected: BTreeSet<EventKind> = kinds.into_iter().collect();

    let mut in_degree: BTreeMap<EventKind, usize> = selected
        .iter()
        .map(|kind| {
            let degree = kind
                .causes()
                .iter()
                .filter(|cause| selected.contains(cause))
                .count();
            (*kind, degree)
        })
        .collect();

    let mut ready: BTreeSet<EventKind> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(kind, _)| *kind)
        .collect();

    let mut ordered = Vec::with_capacity(selected.len());
    while let Some(kind) = ready.pop_first() {
        ordered.push(kind);
        for dependent in dependents(kind) {
            if let Some(degree) = in_degree.get_mut(&dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    debug_assert_eq!(ordered.len(), selected.len(), "cycle in kind dependencies");
    ordered
}
