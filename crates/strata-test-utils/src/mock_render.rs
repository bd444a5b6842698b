//! Mock implementations of the GPU seams for testing.
//!
//! [`MockRenderContext`] records resource operations and keeps the bytes
//! written to each buffer, so tests can read back what a batch uploaded.
//! [`MockDrawRecorder`] and [`MockPresenter`] record draw commands and frames.

use std::ops::Range;

use crate::{gpu_types::*, render_context::*};
use parking_lot::Mutex;
use wgpu::*;

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer { id: usize, size: u64, usage: BufferUsages },
    WriteBuffer { buffer_id: usize, offset: u64, size: usize },
    CreateTexture { width: u32, height: u32, format: TextureFormat },
    CreateShaderModule { label: Option<String> },
    CreateBindGroupLayout { label: Option<String> },
    CreateBindGroup { label: Option<String> },
    CreateRenderPipeline { label: Option<String> },
    CreateSampler { label: Option<String> },
}

/// Mock implementation of [`RenderContext`] for testing.
///
/// # Borrow Checking Pattern: Interior Mutability
///
/// Methods take `&self` but need to mutate internal state (record calls).
/// `parking_lot::Mutex` keeps the type `Send + Sync` as the trait requires.
///
/// # Example
///
/// ```rust
/// use strata_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
/// let buffer = mock
///     .create_buffer(&BufferDescriptor {
///         label: None,
///         size: 16,
///         usage: BufferUsages::STORAGE,
///         mapped_at_creation: false,
///     })
///     .unwrap();
/// mock.write_buffer(&buffer, 4, &[1, 2, 3, 4]);
///
/// assert_eq!(mock.count_buffer_creates(), 1);
/// assert_eq!(&mock.buffer_contents(&buffer).unwrap()[4..8], &[1, 2, 3, 4]);
/// ```
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    /// Contents of every mock buffer, indexed by mock id.
    buffers: Mutex<Vec<Vec<u8>>>,
    next_id: Mutex<usize>,
    /// Creations that should fail, consumed in order of matching calls.
    failures: Mutex<Vec<GpuResourceKind>>,
}

impl MockRenderContext {
    /// Create a new mock render context.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Make the next creation of `kind` fail with [`GpuError::Creation`].
    pub fn fail_next(&self, kind: GpuResourceKind) {
        self.failures.lock().push(kind);
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// Bytes currently held by a mock buffer.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Option<Vec<u8>> {
        let id = buffer.mock_id()?;
        self.buffers.lock().get(id).cloned()
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    pub fn count_render_pipeline_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateRenderPipeline { .. }))
    }

    pub fn count_bind_group_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBindGroup { .. }))
    }

    pub fn count_sampler_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateSampler { .. }))
    }

    fn count(&self, predicate: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_id(&self) -> usize {
        let mut id = self.next_id.lock();
        let current = *id;
        *id += 1;
        current
    }

    fn check_failure(&self, kind: GpuResourceKind, label: Option<&str>) -> Result<(), GpuError> {
        let mut failures = self.failures.lock();
        if let Some(pos) = failures.iter().position(|k| *k == kind) {
            failures.remove(pos);
            return Err(GpuError::creation(kind, label, "injected mock failure"));
        }
        Ok(())
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, GpuError> {
        self.check_failure(GpuResourceKind::Buffer, desc.label)?;
        let mut buffers = self.buffers.lock();
        let id = buffers.len();
        buffers.push(vec![0u8; desc.size as usize]);

        self.record(RenderCall::CreateBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
        });

        Ok(GpuBuffer::mock(id))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };
        let mut buffers = self.buffers.lock();
        if let Some(contents) = buffers.get_mut(buffer_id) {
            let start = offset as usize;
            let end = start + data.len();
            assert!(
                end <= contents.len(),
                "write of {} bytes at offset {} overflows mock buffer {} of {} bytes",
                data.len(),
                offset,
                buffer_id,
                contents.len()
            );
            contents[start..end].copy_from_slice(data);
        }
        self.record(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn create_texture_view_with_data(
        &self,
        desc: &TextureDescriptor,
        _data: &[u8],
    ) -> Result<GpuTextureView, GpuError> {
        self.check_failure(GpuResourceKind::Texture, desc.label)?;
        self.record(RenderCall::CreateTexture {
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
        });
        Ok(GpuTextureView::mock(self.next_id()))
    }

    fn create_shader_module(
        &self,
        desc: &ShaderModuleDescriptor,
    ) -> Result<GpuShaderModule, GpuError> {
        self.check_failure(GpuResourceKind::ShaderModule, desc.label)?;
        self.record(RenderCall::CreateShaderModule {
            label: desc.label.map(str::to_string),
        });
        Ok(GpuShaderModule::mock(self.next_id()))
    }

    fn create_bind_group_layout(
        &self,
        desc: &BindGroupLayoutDescriptor,
    ) -> Result<GpuBindGroupLayout, GpuError> {
        self.check_failure(GpuResourceKind::BindGroupLayout, desc.label)?;
        self.record(RenderCall::CreateBindGroupLayout {
            label: desc.label.map(str::to_string),
        });
        Ok(GpuBindGroupLayout::mock(self.next_id()))
    }

    fn create_bind_group(&self, desc: &GpuBindGroupDescriptor) -> Result<GpuBindGroup, GpuError> {
        self.check_failure(GpuResourceKind::BindGroup, desc.label)?;
        self.record(RenderCall::CreateBindGroup {
            label: desc.label.map(str::to_string),
        });
        Ok(GpuBindGroup::mock(self.next_id()))
    }

    fn create_render_pipeline(
        &self,
        desc: &GpuPipelineDescriptor,
    ) -> Result<GpuRenderPipeline, GpuError> {
        self.check_failure(GpuResourceKind::RenderPipeline, desc.label)?;
        self.record(RenderCall::CreateRenderPipeline {
            label: desc.label.map(str::to_string),
        });
        Ok(GpuRenderPipeline::mock(self.next_id()))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<GpuSampler, GpuError> {
        self.check_failure(GpuResourceKind::Sampler, desc.label)?;
        self.record(RenderCall::CreateSampler {
            label: desc.label.map(str::to_string),
        });
        Ok(GpuSampler::mock(self.next_id()))
    }
}

/// A draw command captured by [`MockDrawRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    SetPipeline { pipeline_id: usize },
    SetBindGroup { index: u32, bind_group_id: usize, offsets: Vec<u32> },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

/// Records draw commands instead of encoding them.
#[derive(Debug, Default, Clone)]
pub struct MockDrawRecorder {
    pub commands: Vec<DrawCommand>,
}

impl MockDrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Draw { .. }))
            .count()
    }

    /// Number of bind group changes at `index`.
    pub fn bind_count(&self, index: u32) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::SetBindGroup { index: i, .. } if *i == index))
            .count()
    }

    pub fn pipeline_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::SetPipeline { .. }))
            .count()
    }

    /// Vertex ranges of every draw, in order.
    pub fn draws(&self) -> Vec<Range<u32>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Draw { vertices, .. } => Some(vertices.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DrawRecorder for MockDrawRecorder {
    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        self.commands.push(DrawCommand::SetPipeline {
            pipeline_id: pipeline.mock_id().unwrap_or(usize::MAX),
        });
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup, offsets: &[u32]) {
        self.commands.push(DrawCommand::SetBindGroup {
            index,
            bind_group_id: bind_group.mock_id().unwrap_or(usize::MAX),
            offsets: offsets.to_vec(),
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.commands.push(DrawCommand::Draw {
            vertices,
            instances,
        });
    }
}

/// One frame captured by [`MockPresenter`].
#[derive(Debug, Clone)]
pub struct MockFrame {
    pub clear: Color,
    pub recorder: MockDrawRecorder,
    pub presented: bool,
}

/// Presenter that records frames and can simulate an unavailable surface.
#[derive(Debug, Default)]
pub struct MockPresenter {
    pub frames: Vec<MockFrame>,
    failing_acquires: usize,
    acquired: bool,
    acquire_attempts: usize,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` acquisitions fail.
    pub fn fail_next_acquires(&mut self, count: usize) {
        self.failing_acquires += count;
    }

    pub fn acquire_attempts(&self) -> usize {
        self.acquire_attempts
    }

    pub fn presented_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.presented).count()
    }

    pub fn last_frame(&self) -> Option<&MockFrame> {
        self.frames.last()
    }
}

impl Presenter for MockPresenter {
    fn acquire(&mut self) -> Result<(), GpuError> {
        self.acquire_attempts += 1;
        if self.failing_acquires > 0 {
            self.failing_acquires -= 1;
            return Err(GpuError::SurfaceUnavailable("mock surface lost".to_string()));
        }
        self.acquired = true;
        Ok(())
    }

    fn color_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn encode(
        &mut self,
        clear: Color,
        record: &mut dyn FnMut(&mut dyn DrawRecorder),
    ) -> Result<(), GpuError> {
        assert!(self.acquired, "encode() called without a successful acquire()");
        let mut recorder = MockDrawRecorder::new();
        record(&mut recorder);
        self.frames.push(MockFrame {
            clear,
            recorder,
            presented: false,
        });
        Ok(())
    }

    fn present(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.presented = true;
        }
        self.acquired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_desc(size: u64) -> BufferDescriptor<'static> {
        BufferDescriptor {
            label: Some("test_buffer"),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }
    }

    #[test]
    fn test_mock_buffer_creation() {
        let mock = MockRenderContext::new();
        let buffer = mock.create_buffer(&storage_desc(1024)).unwrap();
        assert!(buffer.is_mock());
        assert_eq!(mock.count_buffer_creates(), 1);
        assert_eq!(mock.buffer_contents(&buffer).unwrap().len(), 1024);
    }

    #[test]
    fn test_mock_buffer_write_keeps_bytes() {
        let mock = MockRenderContext::new();
        let buffer = mock.create_buffer(&storage_desc(8)).unwrap();
        mock.write_buffer(&buffer, 2, &[9, 9]);
        assert_eq!(mock.count_buffer_writes(), 1);
        assert_eq!(mock.buffer_contents(&buffer).unwrap(), vec![0, 0, 9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn test_injected_failure_is_consumed_once() {
        let mock = MockRenderContext::new();
        mock.fail_next(GpuResourceKind::Buffer);
        let err = mock.create_buffer(&storage_desc(16)).unwrap_err();
        assert!(matches!(err, GpuError::Creation { kind: GpuResourceKind::Buffer, .. }));
        assert!(mock.create_buffer(&storage_desc(16)).is_ok());
    }

    #[test]
    fn test_presenter_failure_then_success() {
        let mut presenter = MockPresenter::new();
        presenter.fail_next_acquires(1);
        assert!(presenter.acquire().is_err());
        assert!(presenter.acquire().is_ok());
        presenter
            .encode(Color::BLACK, &mut |pass: &mut dyn DrawRecorder| pass.draw(0..6, 0..1))
            .unwrap();
        presenter.present();
        assert_eq!(presenter.presented_frames(), 1);
        assert_eq!(presenter.last_frame().unwrap().recorder.draw_count(), 1);
    }

    #[test]
    fn test_clear_calls() {
        let mock = MockRenderContext::new();
        mock.create_buffer(&storage_desc(4)).unwrap();
        assert_eq!(mock.call_count(), 1);
        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
