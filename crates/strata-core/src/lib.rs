//! Strata Core
//!
//! Shared utilities for the Strata frame pipeline: logging, profiling,
//! configuration, math re-exports and the allocation primitives used by the
//! command store and the resource arena.

pub mod alloc;
pub mod config;
pub mod logging;
pub mod math;
pub mod profiling;
