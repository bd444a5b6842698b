//! The frame renderer: turns a frame's command lists into draw calls.

use std::num::NonZeroU64;
use std::sync::Arc;

use strata_core::config::BatchCapacities;
use strata_core::profiling::{profile_function, profile_scope};
use strata_test_utils::{
    DrawRecorder, GpuBindGroup, GpuBindGroupDescriptor, GpuBindGroupEntry, GpuBindingResource,
    GpuBuffer, GpuError, GpuTextureView, Presenter, RenderContext,
};

use crate::commands::NO_RESOURCE;
use crate::error::RenderError;
use crate::frame::{FrameCommands, MAX_VIEWS};
use crate::pipeline::{DrawStats, PipelineKind, Pipelines, SharedLayouts, VIEW_STRIDE};
use crate::records::ViewUniform;
use crate::resources::{FontHandle, GlyphTable, ResourceArena, ResourceRef, TextureHandle};

/// Per-kind counters for one submitted frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub sprite: DrawStats,
    pub primitive: DrawStats,
    pub text: DrawStats,
    pub ui: DrawStats,
}

impl FrameStats {
    pub fn kind(&self, kind: PipelineKind) -> DrawStats {
        match kind {
            PipelineKind::Sprite => self.sprite,
            PipelineKind::Primitive => self.primitive,
            PipelineKind::Text => self.text,
            PipelineKind::Ui => self.ui,
        }
    }

    /// Sum over all kinds.
    pub fn total(&self) -> DrawStats {
        let mut total = DrawStats::default();
        for kind in PipelineKind::ALL {
            total += self.kind(kind);
        }
        total
    }
}

/// Owns every GPU object the frame pipeline draws with.
///
/// Lives on the main thread. `prepare` sorts and batches a frame, `submit`
/// acquires a drawable and records the batches into it.
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "mock")]
/// # {
/// use std::sync::Arc;
/// use strata_core::config::BatchCapacities;
/// use strata_core::math::Vec2;
/// use strata_render::{Color, FrameCommands, FrameRenderer};
/// use strata_test_utils::{MockPresenter, MockRenderContext, Presenter};
///
/// let ctx = Arc::new(MockRenderContext::new());
/// let mut presenter = MockPresenter::new();
/// let mut renderer =
///     FrameRenderer::new(ctx, presenter.color_format(), BatchCapacities::default()).unwrap();
///
/// let mut frame = FrameCommands::default();
/// frame.append_quad(Vec2::ZERO, Vec2::splat(10.0), Color::RED);
///
/// let stats = renderer.render(&frame, &mut presenter).unwrap();
/// assert_eq!(stats.primitive.draw_calls, 1);
/// renderer.shutdown();
/// # }
/// ```
pub struct FrameRenderer {
    context: Arc<dyn RenderContext>,
    color_format: wgpu::TextureFormat,
    resources: ResourceArena,
    fallback: TextureHandle,
    view_buffer: GpuBuffer,
    view_bind_group: GpuBindGroup,
    view_scratch: Vec<u8>,
    pipelines: Pipelines,
    stats: FrameStats,
}

impl FrameRenderer {
    /// Create every pipeline, layout and shared buffer.
    ///
    /// Any creation failure is fatal and returned as [`RenderError::Gpu`].
    pub fn new(
        context: Arc<dyn RenderContext>,
        color_format: wgpu::TextureFormat,
        capacities: BatchCapacities,
    ) -> Result<Self, RenderError> {
        profile_function!();
        let layouts = SharedLayouts::new(context.as_ref())?;

        let sampler = context.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_clamp"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        })?;

        let mut resources =
            ResourceArena::new(context.clone(), layouts.texture.clone(), sampler);
        let white = context.create_texture_view_with_data(
            &wgpu::TextureDescriptor {
                label: Some("white_fallback"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            &[255; 4],
        )?;
        let fallback = resources.register_texture(white)?;

        let view_buffer = context.create_buffer(&wgpu::BufferDescriptor {
            label: Some("view_uniforms"),
            size: MAX_VIEWS as u64 * VIEW_STRIDE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })?;
        let view_bind_group = context.create_bind_group(&GpuBindGroupDescriptor {
            label: Some("view_bind_group"),
            layout: &layouts.view,
            entries: &[GpuBindGroupEntry {
                binding: 0,
                resource: GpuBindingResource::Buffer {
                    buffer: &view_buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ViewUniform>() as u64),
                },
            }],
        })?;

        let pipelines = Pipelines::new(&context, &layouts, color_format, capacities)?;

        tracing::info!(
            "Frame renderer ready ({:?}, capacities {:?})",
            color_format,
            capacities
        );

        Ok(Self {
            context,
            color_format,
            resources,
            fallback,
            view_buffer,
            view_bind_group,
            view_scratch: Vec::with_capacity(MAX_VIEWS * VIEW_STRIDE as usize),
            pipelines,
            stats: FrameStats::default(),
        })
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn register_texture(&mut self, view: GpuTextureView) -> Result<TextureHandle, RenderError> {
        self.resources.register_texture(view)
    }

    pub fn register_font(
        &mut self,
        atlas: GpuTextureView,
        glyphs: GlyphTable,
    ) -> Result<FontHandle, RenderError> {
        self.resources.register_font(atlas, glyphs)
    }

    pub fn release_texture(&mut self, handle: TextureHandle) -> bool {
        if handle == self.fallback {
            tracing::warn!("Refusing to release the renderer's fallback texture");
            return false;
        }
        self.resources.release_texture(handle)
    }

    pub fn release_font(&mut self, handle: FontHandle) -> bool {
        self.resources.release_font(handle)
    }

    pub fn resources(&self) -> &ResourceArena {
        &self.resources
    }

    /// Sort and batch every kind of `frame`, uploading records and views.
    pub fn prepare(&mut self, frame: &FrameCommands) -> Result<(), RenderError> {
        profile_function!();
        self.upload_views(frame);

        let resources = &self.resources;
        let is_texture = |slot: u32| {
            slot == NO_RESOURCE
                || matches!(
                    frame.resource(slot),
                    Some(r @ ResourceRef::Texture(_)) if resources.contains(r)
                )
        };
        let glyphs = |slot: u32| match frame.resource(slot) {
            Some(ResourceRef::Font(font)) => resources.glyphs(font),
            _ => None,
        };

        {
            profile_scope!("sprite");
            self.pipelines
                .sprite
                .prepare_sprites(frame.sprites(), &|slot| slot != NO_RESOURCE && is_texture(slot))?;
        }
        {
            profile_scope!("primitive");
            self.pipelines
                .primitive
                .prepare_primitives(frame.primitives(), &|slot| slot == NO_RESOURCE)?;
        }
        {
            profile_scope!("text");
            self.pipelines
                .text
                .prepare_text(frame.texts(), frame.text_arena(), &glyphs)?;
        }
        {
            profile_scope!("ui");
            self.pipelines.ui.prepare_ui(frame.ui(), &is_texture)?;
        }
        Ok(())
    }

    /// Acquire a drawable, record every prepared batch and present.
    ///
    /// An unavailable surface returns [`RenderError::SurfaceUnavailable`]
    /// without recording anything; the caller skips the frame.
    pub fn submit(
        &mut self,
        frame: &FrameCommands,
        presenter: &mut dyn Presenter,
    ) -> Result<FrameStats, RenderError> {
        profile_function!();
        presenter.acquire()?;

        if presenter.color_format() != self.color_format {
            tracing::warn!(
                "Presenter format {:?} differs from pipeline format {:?}",
                presenter.color_format(),
                self.color_format
            );
        }

        let resources = &self.resources;
        let fallback = self.fallback;
        let view_bind_group = &self.view_bind_group;
        let pipelines = &mut self.pipelines;
        let resolve = |slot: u32| resolve_slot(resources, frame, fallback, slot);

        presenter
            .encode(
                frame.clear_color().to_wgpu(),
                &mut |pass: &mut dyn DrawRecorder| {
                    pipelines.sprite.draw(pass, view_bind_group, &resolve);
                    pipelines.primitive.draw(pass, view_bind_group, &resolve);
                    pipelines.text.draw(pass, view_bind_group, &resolve);
                    pipelines.ui.draw(pass, view_bind_group, &resolve);
                },
            )
            .map_err(|err| match err {
                GpuError::SurfaceUnavailable(msg) => RenderError::SurfaceUnavailable(msg),
                other => RenderError::Submission(other.to_string()),
            })?;
        presenter.present();

        self.stats = FrameStats {
            sprite: self.pipelines.sprite.stats(),
            primitive: self.pipelines.primitive.stats(),
            text: self.pipelines.text.stats(),
            ui: self.pipelines.ui.stats(),
        };
        tracing::trace!("Submitted frame: {:?}", self.stats.total());
        Ok(self.stats)
    }

    /// [`Self::prepare`] followed by [`Self::submit`].
    pub fn render(
        &mut self,
        frame: &FrameCommands,
        presenter: &mut dyn Presenter,
    ) -> Result<FrameStats, RenderError> {
        self.prepare(frame)?;
        self.submit(frame, presenter)
    }

    /// Counters from the last submitted frame.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Pooled buffer slots currently allocated for `kind`.
    pub fn slot_count(&self, kind: PipelineKind) -> usize {
        self.pipelines.slot_count(kind)
    }

    /// Release engine-owned resources and check for leaked registrations.
    ///
    /// # Panics
    /// Panics if any caller-registered texture or font is still live.
    pub fn shutdown(mut self) {
        self.resources.release_texture(self.fallback);
        self.resources.assert_released();
        tracing::debug!("Frame renderer shut down");
    }

    fn upload_views(&mut self, frame: &FrameCommands) {
        let views = frame.views();
        self.view_scratch.clear();
        self.view_scratch
            .resize(views.len() * VIEW_STRIDE as usize, 0);
        for (i, view) in views.iter().enumerate() {
            let uniform = ViewUniform {
                view_proj: view.to_cols_array_2d(),
            };
            let start = i * VIEW_STRIDE as usize;
            self.view_scratch[start..start + std::mem::size_of::<ViewUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if !self.view_scratch.is_empty() {
            self.context
                .write_buffer(&self.view_buffer, 0, &self.view_scratch);
        }
    }
}

fn resolve_slot<'a>(
    resources: &'a ResourceArena,
    frame: &FrameCommands,
    fallback: TextureHandle,
    slot: u32,
) -> Option<&'a GpuBindGroup> {
    let resource = if slot == NO_RESOURCE {
        ResourceRef::Texture(fallback)
    } else {
        frame.resource(slot)?
    };
    resources.bind_group(resource)
}
