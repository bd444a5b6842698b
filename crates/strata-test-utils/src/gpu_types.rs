//! GPU resource wrappers that can be real or mock.
//!
//! These types wrap WGPU resources and allow for both real GPU operations
//! and mock implementations for testing.
//!
//! # Design Pattern: Opaque Wrapper
//!
//! Each wrapper hides whether it contains a real `wgpu` object or a mock id.
//! Users hold owned handles, which are cheap to clone (wgpu objects are
//! reference counted internally), so no lifetimes leak into callers.

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident, $inner:ident, $wgpu:ty, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            inner: $inner,
        }

        #[derive(Clone, Debug)]
        enum $inner {
            Real($wgpu),
            #[cfg(feature = "mock")]
            Mock { id: usize },
        }

        impl $name {
            /// Wrap a real wgpu object.
            pub fn from_wgpu(value: $wgpu) -> Self {
                Self {
                    inner: $inner::Real(value),
                }
            }

            /// Create a mock handle (for testing).
            #[cfg(feature = "mock")]
            pub fn mock(id: usize) -> Self {
                Self {
                    inner: $inner::Mock { id },
                }
            }

            /// Get the underlying wgpu object.
            ///
            /// # Panics
            /// Panics on a mock handle; test code never reaches a real backend.
            pub fn as_wgpu(&self) -> &$wgpu {
                match &self.inner {
                    $inner::Real(value) => value,
                    #[cfg(feature = "mock")]
                    $inner::Mock { .. } => {
                        panic!(concat!("Attempted to get the wgpu ", $what, " from a mock handle"))
                    }
                }
            }

            /// Check if this is a mock (useful in tests).
            #[cfg(feature = "mock")]
            pub fn is_mock(&self) -> bool {
                matches!(self.inner, $inner::Mock { .. })
            }

            /// Mock id (for test assertions).
            #[cfg(feature = "mock")]
            pub fn mock_id(&self) -> Option<usize> {
                match &self.inner {
                    $inner::Mock { id } => Some(*id),
                    _ => None,
                }
            }
        }
    };
}

gpu_handle!(
    /// Wrapper around a GPU buffer that can be real or mock.
    GpuBuffer, GpuBufferInner, wgpu::Buffer, "buffer"
);
gpu_handle!(
    /// Wrapper around a texture view supplied by the resource provider.
    GpuTextureView, GpuTextureViewInner, wgpu::TextureView, "texture view"
);
gpu_handle!(
    /// Wrapper around a GPU shader module that can be real or mock.
    GpuShaderModule, GpuShaderModuleInner, wgpu::ShaderModule, "shader module"
);
gpu_handle!(
    /// Wrapper around a GPU render pipeline that can be real or mock.
    GpuRenderPipeline, GpuRenderPipelineInner, wgpu::RenderPipeline, "render pipeline"
);
gpu_handle!(
    /// Wrapper around a bind group layout that can be real or mock.
    GpuBindGroupLayout, GpuBindGroupLayoutInner, wgpu::BindGroupLayout, "bind group layout"
);
gpu_handle!(
    /// Wrapper around a bind group that can be real or mock.
    GpuBindGroup, GpuBindGroupInner, wgpu::BindGroup, "bind group"
);
gpu_handle!(
    /// Wrapper around a GPU sampler that can be real or mock.
    GpuSampler, GpuSamplerInner, wgpu::Sampler, "sampler"
);

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;

    #[test]
    fn test_mock_handles_report_ids() {
        let buffer = GpuBuffer::mock(3);
        assert!(buffer.is_mock());
        assert_eq!(buffer.mock_id(), Some(3));

        let bind_group = GpuBindGroup::mock(7);
        assert_eq!(bind_group.clone().mock_id(), Some(7));
    }

    #[test]
    #[should_panic(expected = "mock handle")]
    fn test_mock_has_no_wgpu_object() {
        let sampler = GpuSampler::mock(0);
        let _ = sampler.as_wgpu();
    }
}
