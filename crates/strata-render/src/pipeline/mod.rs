//! Per-kind sorting, batching and draw dispatch.
//!
//! Every drawable kind owns a [`KindBatcher`]: a pipeline, a
//! [`BatchStorageBuffer`] with the kind's capacity, and a reusable sort index.
//!
//! | Kind | Record | Bind group 2 |
//! |------|--------|--------------|
//! | Sprite | [`SpriteInstance`] | caller texture |
//! | Primitive | [`ShapeInstance`] | none |
//! | Text | [`SpriteInstance`] per glyph | font atlas |
//! | Ui | [`SpriteInstance`] | caller texture or white fallback |
//!
//! Group 0 is the view uniform (dynamic offset per view) and group 1 the
//! batch's storage slot.

mod primitive;
mod sprite;
mod text;
mod ui;

use std::fmt;
use std::sync::Arc;

use bytemuck::Pod;
use strata_core::profiling::profile_function;
use strata_test_utils::{
    DrawRecorder, GpuBindGroup, GpuBindGroupLayout, GpuPipelineDescriptor, GpuRenderPipeline,
    RenderContext,
};

use crate::batch_buffer::BatchStorageBuffer;
use crate::commands::{Command, PartitionKey};
use crate::error::RenderError;
use crate::records::{ShapeInstance, SpriteInstance, ViewUniform};

/// Byte stride between views in the view uniform buffer.
///
/// 256 satisfies `min_uniform_buffer_offset_alignment` on every backend.
pub const VIEW_STRIDE: u32 = 256;

/// The closed set of drawable kinds, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Sprite,
    Primitive,
    Text,
    Ui,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 4] = [Self::Sprite, Self::Primitive, Self::Text, Self::Ui];

    pub fn label(self) -> &'static str {
        match self {
            Self::Sprite => "sprite",
            Self::Primitive => "primitive",
            Self::Text => "text",
            Self::Ui => "ui",
        }
    }

    /// Whether batches of this kind bind a texture at group 2.
    pub fn is_textured(self) -> bool {
        !matches!(self, Self::Primitive)
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counters for one kind over one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub batches: u32,
    pub draw_calls: u32,
    /// Texture bind group changes.
    pub resource_binds: u32,
    /// View uniform rebinds.
    pub view_binds: u32,
    pub records: u32,
}

impl std::ops::AddAssign for DrawStats {
    fn add_assign(&mut self, rhs: Self) {
        self.batches += rhs.batches;
        self.draw_calls += rhs.draw_calls;
        self.resource_binds += rhs.resource_binds;
        self.view_binds += rhs.view_binds;
        self.records += rhs.records;
    }
}

/// Bind group layouts shared by every kind.
pub struct SharedLayouts {
    /// Group 0: view uniform with a dynamic offset.
    pub view: GpuBindGroupLayout,
    /// Group 1: read-only record storage.
    pub storage: GpuBindGroupLayout,
    /// Group 2: filterable texture and sampler.
    pub texture: GpuBindGroupLayout,
}

impl SharedLayouts {
    pub fn new(context: &dyn RenderContext) -> Result<Self, RenderError> {
        let view = context.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("view_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ViewUniform>() as u64
                    ),
                },
                count: None,
            }],
        })?;

        let storage = context.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("record_storage_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })?;

        let texture = context.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })?;

        Ok(Self {
            view,
            storage,
            texture,
        })
    }
}

/// Pipeline, batches and sort scratch for one kind.
pub struct KindBatcher<R: Pod> {
    kind: PipelineKind,
    pipeline: GpuRenderPipeline,
    batches: BatchStorageBuffer<R, PartitionKey>,
    order: Vec<u32>,
    stats: DrawStats,
}

impl<R: Pod> KindBatcher<R> {
    fn create(
        context: &Arc<dyn RenderContext>,
        layouts: &SharedLayouts,
        kind: PipelineKind,
        source: &'static str,
        color_format: wgpu::TextureFormat,
        capacity: u32,
    ) -> Result<Self, RenderError> {
        profile_function!();
        let shader = context.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some(kind.label()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })?;

        let textured = [&layouts.view, &layouts.storage, &layouts.texture];
        let bind_group_layouts: &[&GpuBindGroupLayout] = if kind.is_textured() {
            &textured
        } else {
            &textured[..2]
        };

        let pipeline = context.create_render_pipeline(&GpuPipelineDescriptor {
            label: Some(kind.label()),
            bind_group_layouts,
            shader: &shader,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            color_format,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        })?;

        let batches = BatchStorageBuffer::new(
            context.clone(),
            layouts.storage.clone(),
            capacity,
            kind.label(),
        );

        tracing::debug!("Created {} pipeline with batch capacity {}", kind, capacity);

        Ok(Self {
            kind,
            pipeline,
            batches,
            order: Vec::new(),
            stats: DrawStats::default(),
        })
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    pub fn batches(&self) -> &BatchStorageBuffer<R, PartitionKey> {
        &self.batches
    }

    /// Sort `commands` into `order` by partition key, then depth.
    fn sort<T>(&mut self, commands: &[Command<T>]) {
        self.order.clear();
        self.order.extend(0..commands.len() as u32);
        // `sort_by` is stable: equal keys at equal depth keep submission order.
        self.order
            .sort_by(|&a, &b| commands[a as usize].draw_order(&commands[b as usize]));
    }

    /// Sort and batch one record per command.
    ///
    /// Commands whose resource fails `is_known` are skipped.
    fn prepare_mapped<T>(
        &mut self,
        commands: &[Command<T>],
        is_known: &dyn Fn(u32) -> bool,
        to_record: impl Fn(&Command<T>) -> R,
    ) -> Result<(), RenderError> {
        profile_function!();
        self.sort(commands);
        self.batches.clear();
        for &index in &self.order {
            let command = &commands[index as usize];
            if !check_resource(self.kind, command.resource, is_known) {
                continue;
            }
            self.batches.push_keyed(command.key(), to_record(command))?;
        }
        self.finish_prepare();
        Ok(())
    }

    fn finish_prepare(&mut self) {
        self.batches.upload_last();
        self.stats = DrawStats {
            batches: self.batches.batches().len() as u32,
            records: self.batches.record_count() as u32,
            ..Default::default()
        };
    }

    /// Record the draws for every prepared batch.
    ///
    /// `resolve` maps a resource slot to its bind group; it is consulted only
    /// when the resource changes between consecutive batches.
    pub fn draw<'r>(
        &mut self,
        pass: &mut dyn DrawRecorder,
        view_bind_group: &GpuBindGroup,
        resolve: &dyn Fn(u32) -> Option<&'r GpuBindGroup>,
    ) {
        profile_function!();
        if self.batches.batches().is_empty() {
            return;
        }

        pass.push_debug_group(self.kind.label());
        pass.set_pipeline(&self.pipeline);

        let mut bound_view = None;
        let mut bound_resource = None;
        for batch in self.batches.batches() {
            let key = batch.meta;

            if self.kind.is_textured() && bound_resource != Some(key.resource) {
                let Some(bind_group) = resolve(key.resource) else {
                    tracing::error!(
                        "{} batch references unknown resource slot {}",
                        self.kind,
                        key.resource
                    );
                    continue;
                };
                pass.set_bind_group(2, bind_group, &[]);
                bound_resource = Some(key.resource);
                self.stats.resource_binds += 1;
            }

            if bound_view != Some(key.view) {
                pass.set_bind_group(0, view_bind_group, &[key.view * VIEW_STRIDE]);
                bound_view = Some(key.view);
                self.stats.view_binds += 1;
            }

            let Some(slot) = self.batches.slot(batch.slot) else {
                continue;
            };
            pass.set_bind_group(1, &slot.bind_group, &[]);
            pass.draw(0..batch.count * 6, 0..1);
            self.stats.draw_calls += 1;
        }

        pass.pop_debug_group();
    }
}

fn check_resource(kind: PipelineKind, resource: u32, is_known: &dyn Fn(u32) -> bool) -> bool {
    if is_known(resource) {
        return true;
    }
    tracing::error!("{kind} command references unknown resource slot {resource}; skipped");
    debug_assert!(false, "{kind} command references unknown resource slot {resource}");
    false
}

/// The four kind batchers, drawn in [`PipelineKind::ALL`] order.
pub struct Pipelines {
    pub sprite: KindBatcher<SpriteInstance>,
    pub primitive: KindBatcher<ShapeInstance>,
    pub text: KindBatcher<SpriteInstance>,
    pub ui: KindBatcher<SpriteInstance>,
}

impl Pipelines {
    pub fn new(
        context: &Arc<dyn RenderContext>,
        layouts: &SharedLayouts,
        color_format: wgpu::TextureFormat,
        capacities: strata_core::config::BatchCapacities,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            sprite: KindBatcher::create(
                context,
                layouts,
                PipelineKind::Sprite,
                sprite::SPRITE_SHADER,
                color_format,
                capacities.sprite,
            )?,
            primitive: KindBatcher::create(
                context,
                layouts,
                PipelineKind::Primitive,
                primitive::SHAPE_SHADER,
                color_format,
                capacities.primitive,
            )?,
            text: KindBatcher::create(
                context,
                layouts,
                PipelineKind::Text,
                text::TEXT_SHADER,
                color_format,
                capacities.text,
            )?,
            ui: KindBatcher::create(
                context,
                layouts,
                PipelineKind::Ui,
                sprite::SPRITE_SHADER,
                color_format,
                capacities.ui,
            )?,
        })
    }

    pub fn stats(&self, kind: PipelineKind) -> DrawStats {
        match kind {
            PipelineKind::Sprite => self.sprite.stats(),
            PipelineKind::Primitive => self.primitive.stats(),
            PipelineKind::Text => self.text.stats(),
            PipelineKind::Ui => self.ui.stats(),
        }
    }

    pub fn slot_count(&self, kind: PipelineKind) -> usize {
        match kind {
            PipelineKind::Sprite => self.sprite.batches().slot_count(),
            PipelineKind::Primitive => self.primitive.batches().slot_count(),
            PipelineKind::Text => self.text.batches().slot_count(),
            PipelineKind::Ui => self.ui.batches().slot_count(),
        }
    }
}
