//! Arena behavior tests.
//!
//! These tests verify generation handling and reuse in `SlotArena`, and that
//! `ByteArena` spans stay valid across reallocation.

use strata_core::alloc::{ArenaSpan, ByteArena, IndexSlot, SlotArena};

#[test]
fn test_len_tracks_inserts_and_removes() {
    let mut arena = SlotArena::new();
    let a = arena.insert("a");
    let b = arena.insert("b");
    assert_eq!(arena.len(), 2);

    arena.remove(a);
    assert_eq!(arena.len(), 1);
    arena.remove(b);
    assert!(arena.is_empty());
}

#[test]
fn test_get_mut() {
    let mut arena = SlotArena::new();
    let idx = arena.insert(42);
    if let Some(value) = arena.get_mut(idx) {
        *value = 100;
    }
    assert_eq!(arena.get(idx), Some(&100));
}

#[test]
fn test_generation_increments_on_each_reuse() {
    let mut arena = SlotArena::new();
    let mut last = arena.insert(0u32);
    for i in 1..5 {
        arena.remove(last);
        let next = arena.insert(i);
        assert_eq!(next.index(), last.index());
        assert_eq!(next.generation(), last.generation() + 1);
        last = next;
    }
}

#[test]
fn test_iter_skips_removed() {
    let mut arena = SlotArena::new();
    let slots: Vec<IndexSlot> = (0..10u8).map(|i| arena.insert(i)).collect();
    arena.remove(slots[0]);
    arena.remove(slots[5]);

    let values: Vec<u8> = arena.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, vec![1, 2, 3, 4, 6, 7, 8, 9]);
    for (slot, value) in arena.iter() {
        assert_eq!(arena.get(slot), Some(value));
    }
}

#[test]
fn test_unknown_index_is_none() {
    let arena = SlotArena::<u8>::new();
    assert_eq!(arena.get(IndexSlot::new(0, 7)), None);
}

#[test]
fn test_byte_arena_multiple_strings() {
    let mut arena = ByteArena::new();
    let spans: Vec<ArenaSpan> = ["alpha", "", "gamma"].iter().map(|s| arena.push_str(s)).collect();
    assert_eq!(arena.str(spans[0]), Some("alpha"));
    assert!(spans[1].is_empty());
    assert_eq!(arena.str(spans[1]), Some(""));
    assert_eq!(arena.str(spans[2]), Some("gamma"));
    assert_eq!(arena.len(), 10);
}

#[test]
fn test_byte_arena_span_after_clear_is_invalid() {
    let mut arena = ByteArena::new();
    let span = arena.push_str("stale");
    arena.clear();
    assert_eq!(arena.str(span), None);
}
