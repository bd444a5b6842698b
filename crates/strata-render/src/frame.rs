//! Per-frame command lists.

use strata_core::alloc::ByteArena;
use strata_core::math::{Mat4, Vec2};
use strata_core::profiling::profile_function;

use crate::color::Color;
use crate::commands::*;
use crate::depth::DepthLayers;
use crate::resources::{FontHandle, ResourceRef, ResourceTable, TextureHandle};

/// Maximum number of views one frame may reference.
pub const MAX_VIEWS: usize = 16;

/// Index of a view inside one frame's command lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

impl ViewId {
    /// The camera view every frame starts with.
    pub const WORLD: ViewId = ViewId(0);
}

/// Everything the simulation collected for one frame.
///
/// Two of these live in a double buffer: the simulation appends to one
/// while the renderer reads the other. Appending never touches the GPU.
#[derive(Debug, Clone)]
pub struct FrameCommands {
    sprites: Vec<SpriteCommand>,
    primitives: Vec<PrimitiveCommand>,
    texts: Vec<TextCommand>,
    ui: Vec<UiCommand>,
    clear_color: Color,
    views: Vec<Mat4>,
    current_view: u32,
    text: ByteArena,
    depth: DepthLayers,
    resources: ResourceTable,
}

impl Default for FrameCommands {
    fn default() -> Self {
        Self::new(DepthLayers::default())
    }
}

impl FrameCommands {
    pub fn new(depth: DepthLayers) -> Self {
        Self {
            sprites: Vec::new(),
            primitives: Vec::new(),
            texts: Vec::new(),
            ui: Vec::new(),
            clear_color: Color::BLACK,
            views: vec![Mat4::IDENTITY],
            current_view: 0,
            text: ByteArena::new(),
            depth,
            resources: ResourceTable::new(),
        }
    }

    pub fn with_depth_layer_count(layer_count: u32) -> Self {
        Self::new(DepthLayers::new(layer_count))
    }

    /// Reset for a new collecting phase. Capacity is retained.
    pub fn clear(&mut self) {
        profile_function!();
        self.sprites.clear();
        self.primitives.clear();
        self.texts.clear();
        self.ui.clear();
        self.clear_color = Color::BLACK;
        self.views.clear();
        self.views.push(Mat4::IDENTITY);
        self.current_view = 0;
        self.text.clear();
        self.depth.frame_reset();
        self.resources.clear();
    }

    /// Copy the camera views and clear color of `previous` into `self`.
    ///
    /// Run on the new collecting instance right after a swap, so a
    /// simulation that does not touch its camera keeps the last one.
    pub fn carry_over_from(&mut self, previous: &FrameCommands) {
        self.views.clear();
        self.views.extend_from_slice(&previous.views);
        self.clear_color = previous.clear_color;
        if !self.depth.reset_per_frame {
            self.depth.set(previous.depth.current());
        }
    }

    fn stamp<T>(&self, shape: T, resource: u32) -> Command<T> {
        Command {
            shape,
            view: self.current_view,
            resource,
            layer: self.depth.current(),
            depth: self.depth.depth(),
        }
    }

    pub fn append_sprite(&mut self, texture: TextureHandle, sprite: Sprite) {
        let slot = self.resources.use_texture(texture);
        let command = self.stamp(sprite, slot);
        self.sprites.push(command);
    }

    /// Solid rectangle centered on `center`.
    pub fn append_quad(&mut self, center: Vec2, size: Vec2, color: Color) {
        self.append_primitive(Primitive::Quad {
            center,
            size,
            rotation: 0.0,
            color,
        });
    }

    pub fn append_line(&mut self, start: Vec2, end: Vec2, width: f32, color: Color) {
        self.append_primitive(Primitive::Line {
            start,
            end,
            width,
            color,
        });
    }

    pub fn append_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.append_primitive(Primitive::Circle {
            center,
            radius,
            thickness: 0.0,
            color,
        });
    }

    pub fn append_primitive(&mut self, primitive: Primitive) {
        let command = self.stamp(primitive, NO_RESOURCE);
        self.primitives.push(command);
    }

    /// Copy `text` into the frame's text arena and queue it for drawing.
    pub fn append_text(
        &mut self,
        font: FontHandle,
        text: &str,
        position: Vec2,
        size: f32,
        color: Color,
    ) {
        if text.is_empty() {
            return;
        }
        let span = self.text.push_str(text);
        let slot = self.resources.use_font(font);
        let command = self.stamp(
            Text {
                span,
                position,
                size,
                color,
            },
            slot,
        );
        self.texts.push(command);
    }

    /// Queue a UI element; `None` draws it untextured.
    pub fn append_ui(&mut self, texture: Option<TextureHandle>, element: UiElement) {
        let slot = match texture {
            Some(handle) => self.resources.use_texture(handle),
            None => NO_RESOURCE,
        };
        let command = self.stamp(element, slot);
        self.ui.push(command);
    }

    /// Draws appended after this call land one depth layer nearer.
    pub fn advance_depth_layer(&mut self) -> u32 {
        self.depth.advance()
    }

    pub fn use_layer(&mut self, layer: u32) {
        self.depth.set(layer);
    }

    pub fn depth_layer(&self) -> u32 {
        self.depth.current()
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Replace the world view's projection.
    pub fn set_view_projection(&mut self, view_proj: Mat4) {
        self.views[ViewId::WORLD.0 as usize] = view_proj;
    }

    /// Add a view and make it current.
    ///
    /// At most [`MAX_VIEWS`] views exist per frame; past that the last view
    /// is reused.
    pub fn push_view(&mut self, view_proj: Mat4) -> ViewId {
        if self.views.len() >= MAX_VIEWS {
            tracing::error!("View limit of {MAX_VIEWS} exceeded; reusing the last view");
            debug_assert!(false, "more than {MAX_VIEWS} views in one frame");
            self.current_view = (self.views.len() - 1) as u32;
            return ViewId(self.current_view);
        }
        self.views.push(view_proj);
        self.current_view = (self.views.len() - 1) as u32;
        ViewId(self.current_view)
    }

    /// Make an existing view current.
    pub fn use_view(&mut self, view: ViewId) {
        assert!(
            (view.0 as usize) < self.views.len(),
            "view {:?} does not exist in this frame",
            view
        );
        self.current_view = view.0;
    }

    /// Resource slot for `texture`, for callers building records by hand.
    pub fn use_texture(&mut self, texture: TextureHandle) -> u32 {
        self.resources.use_texture(texture)
    }

    pub fn use_font(&mut self, font: FontHandle) -> u32 {
        self.resources.use_font(font)
    }

    pub fn sprites(&self) -> &[SpriteCommand] {
        &self.sprites
    }

    pub fn primitives(&self) -> &[PrimitiveCommand] {
        &self.primitives
    }

    pub fn texts(&self) -> &[TextCommand] {
        &self.texts
    }

    pub fn ui(&self) -> &[UiCommand] {
        &self.ui
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn views(&self) -> &[Mat4] {
        &self.views
    }

    pub fn text_arena(&self) -> &ByteArena {
        &self.text
    }

    pub fn resource(&self, slot: u32) -> Option<ResourceRef> {
        self.resources.get(slot)
    }

    pub fn resource_table(&self) -> &ResourceTable {
        &self.resources
    }

    /// Total number of queued commands across all kinds.
    pub fn len(&self) -> usize {
        self.sprites.len() + self.primitives.len() + self.texts.len() + self.ui.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> (TextureHandle, FontHandle) {
        use std::sync::Arc;
        use strata_test_utils::*;

        let mock = Arc::new(MockRenderContext::new());
        let mut arena = crate::resources::ResourceArena::new(
            mock,
            GpuBindGroupLayout::mock(100),
            GpuSampler::mock(101),
        );
        let tex = arena.register_texture(GpuTextureView::mock(1)).unwrap();
        let font = arena
            .register_font(GpuTextureView::mock(2), Default::default())
            .unwrap();
        (tex, font)
    }

    #[test]
    fn test_records_capture_current_state() {
        let (tex, _) = handles();
        let mut frame = FrameCommands::with_depth_layer_count(16);

        frame.append_sprite(tex, Sprite::new(Vec2::ZERO, Vec2::ONE));
        frame.advance_depth_layer();
        let overlay = frame.push_view(Mat4::IDENTITY);
        frame.append_quad(Vec2::ZERO, Vec2::ONE, Color::RED);

        let sprite = frame.sprites()[0];
        let quad = frame.primitives()[0];
        assert_eq!(sprite.view, 0);
        assert_eq!(sprite.resource, 0);
        assert_eq!(quad.view, overlay.0);
        assert_eq!(quad.resource, NO_RESOURCE);
        assert!(quad.depth > sprite.depth);
        assert_eq!((sprite.layer, quad.layer), (0, 1));
    }

    #[test]
    fn test_adjacent_layers_stay_ordered_with_many_layers() {
        let mut frame = FrameCommands::with_depth_layer_count(1 << 30);
        frame.use_layer((1 << 25) + 1);
        frame.append_quad(Vec2::ZERO, Vec2::ONE, Color::RED);
        frame.use_layer(1 << 25);
        frame.append_quad(Vec2::ZERO, Vec2::ONE, Color::BLUE);

        let quads = frame.primitives();
        // Both layers map to the same normalized depth at this layer count.
        assert_eq!(quads[0].depth, quads[1].depth);
        assert_eq!(quads[1].draw_order(&quads[0]), std::cmp::Ordering::Less);
    }

    #[test]
    fn test_text_lands_in_arena() {
        let (_, font) = handles();
        let mut frame = FrameCommands::default();
        frame.append_text(font, "hello", Vec2::ZERO, 16.0, Color::WHITE);
        frame.append_text(font, "", Vec2::ZERO, 16.0, Color::WHITE);

        assert_eq!(frame.texts().len(), 1);
        let span = frame.texts()[0].shape.span;
        assert_eq!(frame.text_arena().str(span), Some("hello"));
    }

    #[test]
    fn test_clear_keeps_capacity_and_resets_state() {
        let (tex, _) = handles();
        let mut frame = FrameCommands::default();
        for _ in 0..64 {
            frame.append_sprite(tex, Sprite::new(Vec2::ZERO, Vec2::ONE));
        }
        frame.push_view(Mat4::IDENTITY);
        frame.advance_depth_layer();
        frame.set_clear_color(Color::BLUE);

        let capacity = frame.sprites.capacity();
        frame.clear();
        assert!(frame.is_empty());
        assert_eq!(frame.sprites.capacity(), capacity);
        assert_eq!(frame.views().len(), 1);
        assert_eq!(frame.depth_layer(), 0);
        assert_eq!(frame.clear_color(), Color::BLACK);
        assert!(frame.resource_table().is_empty());
    }

    #[test]
    fn test_carry_over_copies_camera_and_clear_color() {
        let mut previous = FrameCommands::default();
        let camera = Mat4::from_scale(strata_core::math::Vec3::splat(2.0));
        previous.set_view_projection(camera);
        previous.push_view(Mat4::IDENTITY);
        previous.set_clear_color(Color::GREEN);

        let mut next = FrameCommands::default();
        next.carry_over_from(&previous);
        assert_eq!(next.views(), previous.views());
        assert_eq!(next.views()[0], camera);
        assert_eq!(next.clear_color(), Color::GREEN);
        assert!(next.is_empty());
    }
}
