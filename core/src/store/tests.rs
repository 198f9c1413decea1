use super::*;
use crate::test_support::*;

#[test]
fn test_merge_is_idempotent_for_indexed_kinds() {
    let batch = vec![
        spell_cast(1, 10, player(1), Some(creature(9)), 100),
        spell_cast(2, 11, player(1), Some(creature(9)), 101),
    ];
    let mut store = KindStore::new(EventKind::SpellCast);
    store.merge(batch.clone());
    store.merge(batch);

    assert_eq!(store.len(), 2);
    let ids: Vec<_> = store.events().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_merge_is_idempotent_for_sequence_kinds() {
    let batch = vec![death(3, 10, player(1)), death(4, 12, player(2))];
    let mut store = KindStore::new(EventKind::Death);
    store.merge(batch.clone());
    store.merge(batch);

    assert_eq!(store.len(), 2);
    let ids: Vec<_> = store.events().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![3, 4]);
}

#[test]
fn test_last_write_wins_on_id_collision() {
    let mut store = KindStore::new(EventKind::SpellCast);
    store.merge(vec![spell_cast(1, 10, player(1), None, 100)]);
    store.merge(vec![spell_cast(1, 10, player(1), None, 200)]);

    let cast = store.get(1).and_then(Event::as_spell_cast).unwrap();
    assert_eq!(cast.spell_id, 200);

    let mut deaths = KindStore::new(EventKind::Death);
    deaths.merge(vec![death(1, 10, player(1)), death(2, 11, player(2))]);
    deaths.merge(vec![death(1, 99, player(1))]);
    let ordered: Vec<_> = deaths.events().iter().map(|e| (e.id, e.timestamp)).collect();
    assert_eq!(ordered, vec![(1, 99), (2, 11)]);
}

#[test]
fn test_sequence_preserves_arrival_order() {
    let mut store = KindStore::new(EventKind::Interrupt);
    store.merge(vec![interrupt(7, 1, player(1), 0, 5)]);
    store.merge(vec![interrupt(3, 2, player(1), 0, 5)]);
    let ids: Vec<_> = store.events().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![7, 3]);
}

#[test]
fn test_sequence_cursor_is_highest_id_not_last_element() {
    let mut store = KindStore::new(EventKind::Interrupt);
    store.merge(vec![interrupt(7, 1, player(1), 0, 5)]);
    store.merge(vec![interrupt(3, 2, player(1), 0, 5)]);
    assert_eq!(store.events().last().map(|e| e.id), Some(3));
    assert_eq!(store.cursor(), 7);
}

#[test]
fn test_cursor_is_monotonic() {
    let mut store = KindStore::new(EventKind::Death);
    assert_eq!(store.cursor(), 0);

    store.merge(vec![death(5, 1, player(1)), death(8, 2, player(1))]);
    let before = store.cursor();
    assert_eq!(before, 8);

    store.merge(vec![death(6, 3, player(1))]);
    assert!(store.cursor() >= before);

    store.merge(vec![death(12, 4, player(1))]);
    assert_eq!(store.cursor(), 12);
}

#[test]
fn test_merge_drops_foreign_kinds() {
    let mut store = KindStore::new(EventKind::SpellCast);
    let merged = store.merge(vec![
        death(1, 1, player(1)),
        spell_cast(2, 1, player(1), None, 1),
    ]);
    assert_eq!(merged, 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_lifecycle_absent_pending_ready() {
    let mut store = EventStore::new();
    assert_eq!(store.state(EventKind::Heal), StoreState::Absent);

    assert!(store.request(EventKind::Heal));
    assert!(!store.request(EventKind::Heal));
    assert_eq!(store.state(EventKind::Heal), StoreState::Pending);
    assert_eq!(store.pending_kinds(), vec![EventKind::Heal]);

    // Not ready yet: merges are refused
    assert_eq!(store.merge(EventKind::Heal, Vec::new()), None);

    store.mark_ready(EventKind::Heal);
    assert_eq!(store.state(EventKind::Heal), StoreState::Ready);
    assert_eq!(store.ready_kinds(), vec![EventKind::Heal]);
    assert!(store.pending_kinds().is_empty());
}

#[test]
fn test_lookup_unresolved_is_none() {
    let mut store = EventStore::new();
    assert!(store.spell_cast(1).is_none());

    store.mark_ready(EventKind::SpellCast);
    store.merge(
        EventKind::SpellCast,
        vec![spell_cast(1, 1, player(1), Some(creature(2)), 55)],
    );
    assert_eq!(store.spell_cast(1).map(|c| c.spell_id), Some(55));
    assert!(store.spell_cast(2).is_none());
    assert!(store.aura_application(1).is_none());
    assert_eq!(store.cursor(EventKind::SpellCast), 1);
    assert_eq!(store.cursor(EventKind::AuraApplication), 0);
}
