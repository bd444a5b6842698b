//! Traits abstracting GPU operations for testing.
//!
//! [`RenderContext`] covers resource creation and uploads, [`DrawRecorder`]
//! covers command recording inside a render pass, and [`Presenter`] covers
//! acquiring, encoding and presenting one drawable surface per frame.

use std::fmt;
use std::num::NonZeroU64;
use std::ops::Range;

use crate::gpu_types::*;
use wgpu::{
    BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, ShaderModuleDescriptor,
    TextureDescriptor,
};

/// The kind of GPU object an operation was creating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResourceKind {
    Buffer,
    Texture,
    ShaderModule,
    BindGroupLayout,
    BindGroup,
    RenderPipeline,
    Sampler,
}

impl fmt::Display for GpuResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::Texture => "texture",
            Self::ShaderModule => "shader module",
            Self::BindGroupLayout => "bind group layout",
            Self::BindGroup => "bind group",
            Self::RenderPipeline => "render pipeline",
            Self::Sampler => "sampler",
        };
        f.write_str(name)
    }
}

/// Errors raised by GPU backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// No suitable adapter was found.
    NoAdapter,
    /// The adapter refused to create a device.
    DeviceRequest(String),
    /// A GPU object failed validation or allocation.
    Creation {
        kind: GpuResourceKind,
        label: Option<String>,
        message: String,
    },
    /// The presentable surface could not be acquired this frame.
    SurfaceUnavailable(String),
}

impl GpuError {
    pub fn creation(kind: GpuResourceKind, label: Option<&str>, message: impl Into<String>) -> Self {
        Self::Creation {
            kind,
            label: label.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAdapter => write!(f, "No suitable GPU adapter found"),
            Self::DeviceRequest(msg) => write!(f, "Failed to create device: {}", msg),
            Self::Creation {
                kind,
                label,
                message,
            } => write!(
                f,
                "Failed to create {} '{}': {}",
                kind,
                label.as_deref().unwrap_or("<unlabeled>"),
                message
            ),
            Self::SurfaceUnavailable(msg) => write!(f, "Surface unavailable: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {}

/// A resource bound at one binding of a bind group.
#[derive(Debug, Clone, Copy)]
pub enum GpuBindingResource<'a> {
    Buffer {
        buffer: &'a GpuBuffer,
        offset: u64,
        size: Option<NonZeroU64>,
    },
    TextureView(&'a GpuTextureView),
    Sampler(&'a GpuSampler),
}

#[derive(Debug, Clone, Copy)]
pub struct GpuBindGroupEntry<'a> {
    pub binding: u32,
    pub resource: GpuBindingResource<'a>,
}

/// Bind group descriptor expressed over wrapper handles.
///
/// wgpu descriptors reference concrete `wgpu` objects, which a mock cannot
/// provide, so bind groups go through this mirror type instead.
#[derive(Debug, Clone, Copy)]
pub struct GpuBindGroupDescriptor<'a> {
    pub label: Option<&'a str>,
    pub layout: &'a GpuBindGroupLayout,
    pub entries: &'a [GpuBindGroupEntry<'a>],
}

/// Render pipeline descriptor for vertex-pulling pipelines.
///
/// Pipelines built here have no vertex buffers: the vertex shader reads
/// records from a storage buffer using the vertex index.
#[derive(Debug, Clone, Copy)]
pub struct GpuPipelineDescriptor<'a> {
    pub label: Option<&'a str>,
    pub bind_group_layouts: &'a [&'a GpuBindGroupLayout],
    pub shader: &'a GpuShaderModule,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
}

/// Trait abstracting GPU resource creation and uploads.
///
/// Methods take `&self` and return owned wrapper types, so one context can be
/// shared behind an `Arc` and mocks can use interior mutability. Creation is
/// fallible: backends surface validation and allocation failures as
/// [`GpuError::Creation`] instead of aborting.
pub trait RenderContext: Send + Sync {
    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, GpuError>;

    /// Write data to a buffer.
    ///
    /// For real buffers this maps to `queue.write_buffer()`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Create a texture initialized with `data` and return its default view.
    ///
    /// Used for small engine-owned textures; application textures arrive as
    /// views from the resource provider.
    fn create_texture_view_with_data(
        &self,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> Result<GpuTextureView, GpuError>;

    /// Create a shader module from source code.
    fn create_shader_module(&self, desc: &ShaderModuleDescriptor)
    -> Result<GpuShaderModule, GpuError>;

    /// Create a bind group layout.
    fn create_bind_group_layout(
        &self,
        desc: &BindGroupLayoutDescriptor,
    ) -> Result<GpuBindGroupLayout, GpuError>;

    /// Create a bind group.
    fn create_bind_group(&self, desc: &GpuBindGroupDescriptor) -> Result<GpuBindGroup, GpuError>;

    /// Create a render pipeline.
    fn create_render_pipeline(
        &self,
        desc: &GpuPipelineDescriptor,
    ) -> Result<GpuRenderPipeline, GpuError>;

    /// Create a texture sampler.
    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<GpuSampler, GpuError>;
}

/// Records draw commands inside a render pass.
pub trait DrawRecorder {
    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline);

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup, offsets: &[u32]);

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    fn push_debug_group(&mut self, _label: &str) {}

    fn pop_debug_group(&mut self) {}
}

impl DrawRecorder for wgpu::RenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        wgpu::RenderPass::set_pipeline(self, pipeline.as_wgpu());
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup, offsets: &[u32]) {
        wgpu::RenderPass::set_bind_group(self, index, bind_group.as_wgpu(), offsets);
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        wgpu::RenderPass::draw(self, vertices, instances);
    }

    fn push_debug_group(&mut self, label: &str) {
        wgpu::RenderPass::push_debug_group(self, label);
    }

    fn pop_debug_group(&mut self) {
        wgpu::RenderPass::pop_debug_group(self);
    }
}

/// Presentation primitive: one drawable surface per frame.
///
/// The lifecycle is `acquire()`, then `encode()` once, then `present()`.
/// A failed `acquire()` means the frame is skipped; the caller must not call
/// `encode()` or `present()` for it.
pub trait Presenter {
    /// Block until a drawable is available.
    ///
    /// Returns [`GpuError::SurfaceUnavailable`] when the surface is momentarily
    /// unusable (lost, outdated, timed out).
    fn acquire(&mut self) -> Result<(), GpuError>;

    /// Color format of the drawable; pipelines must target it.
    fn color_format(&self) -> wgpu::TextureFormat;

    /// Begin a pass clearing to `clear` and let `record` draw into it, then
    /// submit the recorded work.
    fn encode(
        &mut self,
        clear: wgpu::Color,
        record: &mut dyn FnMut(&mut dyn DrawRecorder),
    ) -> Result<(), GpuError>;

    /// Present the acquired drawable.
    fn present(&mut self);
}
