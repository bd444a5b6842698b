//! Allocation and collection types for Strata.
//!
//! This module provides:
//! - Re-exports of hash collections using AHash
//! - [`SlotArena`], a single-owner arena addressed by generational indices
//! - [`ByteArena`], a growable byte store addressed by stable offsets

pub mod byte_arena;
pub mod slot_arena;

pub use byte_arena::{ArenaSpan, ByteArena};
pub use slot_arena::{IndexSlot, SlotArena};

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
