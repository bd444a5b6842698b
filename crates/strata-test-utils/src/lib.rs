//! GPU seams and test doubles for Strata.
//!
//! This crate defines the narrow interfaces the frame pipeline uses to talk to
//! a GPU backend, plus mock implementations so batching and dispatch can be
//! tested without a device.
//!
//! # Overview
//!
//! - [`RenderContext`] - resource creation and buffer uploads
//! - [`DrawRecorder`] - draw command recording inside a pass
//! - [`Presenter`] - acquire / encode / present of one drawable per frame
//! - GPU wrapper types (`GpuBuffer`, `GpuBindGroup`, ...) - real or mock
//! - `MockRenderContext`, `MockDrawRecorder`, `MockPresenter` (requires `mock` feature)
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use strata_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//! let buffer = mock
//!     .create_buffer(&BufferDescriptor {
//!         label: Some("test_buffer"),
//!         size: 1024,
//!         usage: BufferUsages::STORAGE,
//!         mapped_at_creation: false,
//!     })
//!     .unwrap();
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert!(buffer.is_mock());
//! # }
//! ```
//!
//! # Design
//!
//! Wrapper types are owned and clone cheaply, so no lifetimes propagate into
//! callers. The traits are object safe, so the renderer holds an
//! `Arc<dyn RenderContext>` handed to it by the caller rather than reaching
//! for a global device.

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
