use std::sync::Arc;

use strata_core::profiling::profile_function;
use strata_test_utils::{DrawRecorder, GpuError, Presenter};

use crate::context::GraphicsContext;

/// Overrides applied on top of the surface's default configuration.
#[derive(Debug, Clone, Default)]
pub struct SurfaceDescriptor {
    /// The surface texture format. If None, uses the default format for the surface.
    pub format: Option<wgpu::TextureFormat>,
    pub present_mode: Option<wgpu::PresentMode>,
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,
}

/// [`Presenter`] over a configured `wgpu::Surface`.
///
/// The surface itself comes from the windowing layer; this type only owns its
/// configuration and the per-frame texture.
pub struct SurfacePresenter {
    context: Arc<GraphicsContext>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pending_resize: Option<(u32, u32)>,
    frame: Option<wgpu::SurfaceTexture>,
}

impl SurfacePresenter {
    pub fn new(
        context: Arc<GraphicsContext>,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        descriptor: SurfaceDescriptor,
    ) -> Result<Self, GpuError> {
        let mut config = surface
            .get_default_config(&context.adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                GpuError::SurfaceUnavailable("surface is not supported by the adapter".into())
            })?;

        if let Some(format) = descriptor.format {
            config.format = format;
        }
        if let Some(present_mode) = descriptor.present_mode {
            config.present_mode = present_mode;
        }
        if let Some(alpha_mode) = descriptor.alpha_mode {
            config.alpha_mode = alpha_mode;
        }

        surface.configure(&context.device, &config);
        tracing::debug!(
            "Configured surface {}x{} as {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            context,
            surface,
            config,
            pending_resize: None,
            frame: None,
        })
    }

    /// Apply a new size before the next acquisition.
    pub fn resized(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    pub fn surface_config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.context.device, &self.config);
    }
}

impl Presenter for SurfacePresenter {
    fn acquire(&mut self) -> Result<(), GpuError> {
        profile_function!();

        if let Some((width, height)) = self.pending_resize.take() {
            if width == 0 || height == 0 {
                // Minimized; keep the pending size until it is drawable again.
                self.pending_resize = Some((width, height));
                return Err(GpuError::SurfaceUnavailable("surface has zero size".into()));
            }
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }

        match self.surface.get_current_texture() {
            Ok(frame) => {
                if frame.suboptimal {
                    tracing::debug!("Surface texture is suboptimal");
                }
                self.frame = Some(frame);
                Ok(())
            }
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.reconfigure();
                Err(GpuError::SurfaceUnavailable(err.to_string()))
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(GpuError::creation(
                strata_test_utils::GpuResourceKind::Texture,
                Some("surface"),
                "out of memory acquiring surface texture",
            )),
            Err(err) => Err(GpuError::SurfaceUnavailable(err.to_string())),
        }
    }

    fn color_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn encode(
        &mut self,
        clear: wgpu::Color,
        record: &mut dyn FnMut(&mut dyn DrawRecorder),
    ) -> Result<(), GpuError> {
        profile_function!();

        let frame = self.frame.as_ref().ok_or_else(|| {
            GpuError::SurfaceUnavailable("encode called without an acquired frame".into())
        })?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            record(&mut pass);
        }

        self.context.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
    }
}
