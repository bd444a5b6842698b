//! Implementation of [`RenderContext`] for [`GraphicsContext`].
//!
//! Every creation runs inside validation and out-of-memory error scopes so a
//! bad descriptor comes back as [`GpuError::Creation`] instead of reaching the
//! device's uncaptured error handler.

use crate::context::GraphicsContext;
use strata_test_utils::{
    GpuBindGroup, GpuBindGroupDescriptor, GpuBindGroupLayout, GpuBindingResource, GpuBuffer,
    GpuError, GpuPipelineDescriptor, GpuRenderPipeline, GpuResourceKind, GpuSampler,
    GpuShaderModule, GpuTextureView, RenderContext,
};
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, ShaderModuleDescriptor,
    TextureDescriptor,
};

impl GraphicsContext {
    fn scoped<T>(
        &self,
        kind: GpuResourceKind,
        label: Option<&str>,
        create: impl FnOnce() -> T,
    ) -> Result<T, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => {
                tracing::error!("GPU {} creation failed: {}", kind, err);
                Err(GpuError::creation(kind, label, err.to_string()))
            }
            None => Ok(value),
        }
    }
}

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, GpuError> {
        let buffer = self.scoped(GpuResourceKind::Buffer, desc.label, || {
            self.device.create_buffer(desc)
        })?;
        Ok(GpuBuffer::from_wgpu(buffer))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn create_texture_view_with_data(
        &self,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> Result<GpuTextureView, GpuError> {
        let texture = self.scoped(GpuResourceKind::Texture, desc.label, || {
            self.device.create_texture_with_data(
                &self.queue,
                desc,
                wgpu::util::TextureDataOrder::LayerMajor,
                data,
            )
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuTextureView::from_wgpu(view))
    }

    fn create_shader_module(
        &self,
        desc: &ShaderModuleDescriptor,
    ) -> Result<GpuShaderModule, GpuError> {
        let module = self.scoped(GpuResourceKind::ShaderModule, desc.label, || {
            self.device.create_shader_module(desc.clone())
        })?;
        Ok(GpuShaderModule::from_wgpu(module))
    }

    fn create_bind_group_layout(
        &self,
        desc: &BindGroupLayoutDescriptor,
    ) -> Result<GpuBindGroupLayout, GpuError> {
        let layout = self.scoped(GpuResourceKind::BindGroupLayout, desc.label, || {
            self.device.create_bind_group_layout(desc)
        })?;
        Ok(GpuBindGroupLayout::from_wgpu(layout))
    }

    fn create_bind_group(&self, desc: &GpuBindGroupDescriptor) -> Result<GpuBindGroup, GpuError> {
        let entries: Vec<wgpu::BindGroupEntry> = desc
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupEntry {
                binding: entry.binding,
                resource: match entry.resource {
                    GpuBindingResource::Buffer {
                        buffer,
                        offset,
                        size,
                    } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: buffer.as_wgpu(),
                        offset,
                        size,
                    }),
                    GpuBindingResource::TextureView(view) => {
                        wgpu::BindingResource::TextureView(view.as_wgpu())
                    }
                    GpuBindingResource::Sampler(sampler) => {
                        wgpu::BindingResource::Sampler(sampler.as_wgpu())
                    }
                },
            })
            .collect();

        let bind_group = self.scoped(GpuResourceKind::BindGroup, desc.label, || {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: desc.label,
                layout: desc.layout.as_wgpu(),
                entries: &entries,
            })
        })?;
        Ok(GpuBindGroup::from_wgpu(bind_group))
    }

    fn create_render_pipeline(
        &self,
        desc: &GpuPipelineDescriptor,
    ) -> Result<GpuRenderPipeline, GpuError> {
        let layouts: Vec<&wgpu::BindGroupLayout> = desc
            .bind_group_layouts
            .iter()
            .map(|layout| layout.as_wgpu())
            .collect();

        let pipeline = self.scoped(GpuResourceKind::RenderPipeline, desc.label, || {
            let layout = self
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: desc.label,
                    bind_group_layouts: &layouts,
                    push_constant_ranges: &[],
                });
            let module = desc.shader.as_wgpu();

            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: desc.label,
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module,
                        entry_point: Some(desc.vertex_entry),
                        buffers: &[],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module,
                        entry_point: Some(desc.fragment_entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: desc.color_format,
                            blend: desc.blend,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
        })?;
        Ok(GpuRenderPipeline::from_wgpu(pipeline))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<GpuSampler, GpuError> {
        let sampler = self.scoped(GpuResourceKind::Sampler, desc.label, || {
            self.device.create_sampler(desc)
        })?;
        Ok(GpuSampler::from_wgpu(sampler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::MockRenderContext;

    #[test]
    fn test_render_context_trait_object() {
        fn uses_render_context(ctx: &dyn RenderContext) -> Result<(), GpuError> {
            let buffer = ctx.create_buffer(&BufferDescriptor {
                label: Some("Test Buffer"),
                size: 256,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })?;
            ctx.write_buffer(&buffer, 0, &[0u8; 256]);
            Ok(())
        }

        let mock_ctx = MockRenderContext::new();
        uses_render_context(&mock_ctx).unwrap();
        assert_eq!(mock_ctx.call_count(), 2);
    }

    #[test]
    fn test_injected_failure_propagates() {
        let mock_ctx = MockRenderContext::new();
        mock_ctx.fail_next(GpuResourceKind::Buffer);
        let result = mock_ctx.create_buffer(&BufferDescriptor {
            label: Some("doomed"),
            size: 64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        assert!(matches!(
            result,
            Err(GpuError::Creation {
                kind: GpuResourceKind::Buffer,
                ..
            })
        ));
    }
}
