//! Command lists, batch storage buffers and draw dispatch for Strata.
//!
//! The simulation appends draw requests to a [`FrameCommands`]; the
//! [`FrameRenderer`] sorts each kind by partition key and depth, packs the
//! records into capacity-bounded batches backed by pooled storage buffers, and
//! records one draw call per batch.
//!
//! GPU access goes through the [`RenderContext`](strata_test_utils::RenderContext)
//! and [`Presenter`](strata_test_utils::Presenter) seams. [`GraphicsContext`]
//! and [`SurfacePresenter`] implement them over wgpu; the mock implementations
//! in `strata-test-utils` let everything here run without a device.

pub mod batch_buffer;
mod color;
pub mod commands;
mod context;
mod context_impl;
pub mod depth;
mod error;
pub mod frame;
pub mod pipeline;
pub mod records;
mod renderer;
pub mod resources;
mod surface;

pub use batch_buffer::{Batch, BatchStorageBuffer, BufferSlot};
pub use color::Color;
pub use commands::{NO_RESOURCE, PartitionKey, Primitive, Sprite, UiElement};
pub use context::{GraphicsContext, GraphicsContextDescriptor};
pub use depth::DepthLayers;
pub use error::RenderError;
pub use frame::{FrameCommands, MAX_VIEWS, ViewId};
pub use pipeline::{DrawStats, PipelineKind};
pub use records::{ShapeInstance, ShapeKind, SpriteInstance};
pub use renderer::{FrameRenderer, FrameStats};
pub use resources::{FontHandle, Glyph, GlyphTable, ResourceArena, TextureHandle};
pub use surface::{SurfaceDescriptor, SurfacePresenter};

pub use wgpu;
