//! Strata - a double-buffered 2D frame pipeline
//!
//! Strata decouples simulation from GPU submission. The simulation appends
//! draw requests to one [`FrameCommands`] while the renderer turns the other
//! into batched draw calls; a handshake swaps the two once per frame.
//!
//! - [`FrameScheduler`] turns wall-clock time into fixed simulation ticks
//! - [`DoubleBuffer`] holds the collecting and rendering instances
//! - [`FrameSync`] is the two-thread handshake around the swap
//! - [`Engine`] runs the whole loop, single- or multi-threaded
//!
//! # Quick Start
//!
//! ```ignore
//! use strata::prelude::*;
//!
//! struct Bouncer {
//!     x: f32,
//! }
//!
//! impl Simulation for Bouncer {
//!     fn update(&mut self, step: std::time::Duration) {
//!         self.x += 60.0 * step.as_secs_f32();
//!     }
//!
//!     fn draw(&mut self, _alpha: f32, frame: &mut FrameCommands) {
//!         frame.append_quad(Vec2::new(self.x, 0.0), Vec2::splat(16.0), Color::RED);
//!     }
//! }
//!
//! let engine = Engine::new(EngineConfig::default());
//! engine.run(&mut Bouncer { x: 0.0 }, &mut platform, &mut SystemClock::new(), &mut renderer, &mut presenter)?;
//! renderer.shutdown();
//! ```

pub mod double_buffer;
pub mod engine;
mod error;
pub mod scheduler;
pub mod sync;

pub use double_buffer::{DoubleBuffer, FrameData};
pub use engine::{Clock, Engine, FixedClock, Platform, RunStats, Simulation, SystemClock};
pub use error::EngineError;
pub use scheduler::{FrameScheduler, FrameTicks};
pub use sync::{FrameSync, ShutdownGuard, SyncOutcome, SyncPhase};

pub use strata_core as core;
pub use strata_core::config::{BatchCapacities, EngineConfig, ThreadingMode};
pub use strata_core::math;
pub use strata_render as render;
pub use strata_render::{Color, FrameCommands, FrameRenderer, RenderError};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        BatchCapacities, Clock, Color, DoubleBuffer, Engine, EngineConfig, EngineError,
        FixedClock, FrameCommands, FrameRenderer, Platform, Simulation, SystemClock,
        ThreadingMode,
    };
    pub use strata_core::math::{Mat4, Vec2};
}
