//! Texture and font registration.
//!
//! [`ResourceArena`] is the single owner of every GPU resource the batchers
//! bind. Command records never hold handles directly: a frame's
//! [`ResourceTable`] maps the handles it uses onto small `u32` slots, and the
//! records carry the slot.

use std::sync::Arc;

use strata_core::alloc::{HashMap, IndexSlot, SlotArena};
use strata_test_utils::{
    GpuBindGroup, GpuBindGroupDescriptor, GpuBindGroupEntry, GpuBindGroupLayout,
    GpuBindingResource, GpuSampler, GpuTextureView, RenderContext,
};

use crate::error::RenderError;

/// Handle to a texture registered with a [`ResourceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(IndexSlot);

/// Handle to a font registered with a [`ResourceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle(IndexSlot);

/// A resource referenced by a frame, before it is resolved to a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Texture(TextureHandle),
    Font(FontHandle),
}

/// Placement of one glyph inside a font atlas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Glyph {
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    /// Size in pixels at the table's native size. Zero for whitespace.
    pub size: [f32; 2],
    /// Offset of the glyph's top-left corner from the pen position.
    pub offset: [f32; 2],
    /// Horizontal pen advance in pixels.
    pub advance: f32,
}

impl Glyph {
    pub fn is_empty(&self) -> bool {
        self.size[0] <= 0.0 || self.size[1] <= 0.0
    }
}

/// Glyph metrics for one font atlas, supplied by the font provider.
#[derive(Debug, Clone, Default)]
pub struct GlyphTable {
    glyphs: HashMap<char, Glyph>,
    line_height: f32,
    /// Pixel size the metrics were generated at.
    native_size: f32,
}

impl GlyphTable {
    pub fn new(native_size: f32, line_height: f32) -> Self {
        Self {
            glyphs: HashMap::default(),
            line_height,
            native_size,
        }
    }

    pub fn insert(&mut self, ch: char, glyph: Glyph) {
        self.glyphs.insert(ch, glyph);
    }

    pub fn with_glyph(mut self, ch: char, glyph: Glyph) -> Self {
        self.insert(ch, glyph);
        self
    }

    pub fn get(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn native_size(&self) -> f32 {
        self.native_size
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

struct TextureEntry {
    // Kept alive for as long as the bind group references it.
    _view: GpuTextureView,
    bind_group: GpuBindGroup,
}

struct FontEntry {
    texture: TextureEntry,
    glyphs: GlyphTable,
}

/// Owner of every registered texture and font.
///
/// Handles are generational: a released handle never resolves again, even if
/// its slot is reused.
pub struct ResourceArena {
    context: Arc<dyn RenderContext>,
    layout: GpuBindGroupLayout,
    sampler: GpuSampler,
    textures: SlotArena<TextureEntry>,
    fonts: SlotArena<FontEntry>,
}

impl ResourceArena {
    /// `layout` must describe a texture at binding 0 and a sampler at binding 1.
    pub fn new(
        context: Arc<dyn RenderContext>,
        layout: GpuBindGroupLayout,
        sampler: GpuSampler,
    ) -> Self {
        Self {
            context,
            layout,
            sampler,
            textures: SlotArena::new(),
            fonts: SlotArena::new(),
        }
    }

    fn create_entry(
        &self,
        view: GpuTextureView,
        label: &str,
    ) -> Result<TextureEntry, RenderError> {
        let entries = [
            GpuBindGroupEntry {
                binding: 0,
                resource: GpuBindingResource::TextureView(&view),
            },
            GpuBindGroupEntry {
                binding: 1,
                resource: GpuBindingResource::Sampler(&self.sampler),
            },
        ];
        let bind_group = self.context.create_bind_group(&GpuBindGroupDescriptor {
            label: Some(label),
            layout: &self.layout,
            entries: &entries,
        })?;
        Ok(TextureEntry {
            _view: view,
            bind_group,
        })
    }

    pub fn register_texture(&mut self, view: GpuTextureView) -> Result<TextureHandle, RenderError> {
        let entry = self.create_entry(view, "texture_bind_group")?;
        let handle = TextureHandle(self.textures.insert(entry));
        tracing::trace!("Registered texture {:?}", handle);
        Ok(handle)
    }

    pub fn register_font(
        &mut self,
        atlas: GpuTextureView,
        glyphs: GlyphTable,
    ) -> Result<FontHandle, RenderError> {
        let texture = self.create_entry(atlas, "font_bind_group")?;
        let handle = FontHandle(self.fonts.insert(FontEntry { texture, glyphs }));
        tracing::trace!("Registered font {:?}", handle);
        Ok(handle)
    }

    /// Returns `false` if the handle was already released.
    pub fn release_texture(&mut self, handle: TextureHandle) -> bool {
        self.textures.remove(handle.0).is_some()
    }

    pub fn release_font(&mut self, handle: FontHandle) -> bool {
        self.fonts.remove(handle.0).is_some()
    }

    pub fn contains(&self, resource: ResourceRef) -> bool {
        match resource {
            ResourceRef::Texture(handle) => self.textures.contains(handle.0),
            ResourceRef::Font(handle) => self.fonts.contains(handle.0),
        }
    }

    pub fn bind_group(&self, resource: ResourceRef) -> Option<&GpuBindGroup> {
        match resource {
            ResourceRef::Texture(handle) => self.textures.get(handle.0).map(|e| &e.bind_group),
            ResourceRef::Font(handle) => self.fonts.get(handle.0).map(|e| &e.texture.bind_group),
        }
    }

    pub fn glyphs(&self, handle: FontHandle) -> Option<&GlyphTable> {
        self.fonts.get(handle.0).map(|e| &e.glyphs)
    }

    /// Number of textures and fonts still registered.
    pub fn live_count(&self) -> usize {
        self.textures.len() + self.fonts.len()
    }

    /// Panics if any texture or font was never released.
    pub fn assert_released(&self) {
        assert!(
            self.live_count() == 0,
            "resource arena dropped with {} live textures and {} live fonts",
            self.textures.len(),
            self.fonts.len()
        );
    }
}

/// Per-frame mapping from handles to the slots stored in command records.
///
/// Lives inside the frame's command lists, so it is cleared together with
/// them and swapped along with them.
#[derive(Debug, Default, Clone)]
pub struct ResourceTable {
    entries: Vec<ResourceRef>,
    lookup: HashMap<ResourceRef, u32>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `resource`, assigning the next free one on first use.
    pub fn slot_for(&mut self, resource: ResourceRef) -> u32 {
        if let Some(&slot) = self.lookup.get(&resource) {
            return slot;
        }
        let slot = self.entries.len() as u32;
        self.entries.push(resource);
        self.lookup.insert(resource, slot);
        slot
    }

    pub fn use_texture(&mut self, handle: TextureHandle) -> u32 {
        self.slot_for(ResourceRef::Texture(handle))
    }

    pub fn use_font(&mut self, handle: FontHandle) -> u32 {
        self.slot_for(ResourceRef::Font(handle))
    }

    pub fn get(&self, slot: u32) -> Option<ResourceRef> {
        self.entries.get(slot as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lookup.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::MockRenderContext;

    fn arena() -> (Arc<MockRenderContext>, ResourceArena) {
        let mock = Arc::new(MockRenderContext::new());
        let arena = ResourceArena::new(
            mock.clone(),
            GpuBindGroupLayout::mock(1000),
            GpuSampler::mock(1001),
        );
        (mock, arena)
    }

    #[test]
    fn test_register_and_release() {
        let (mock, mut arena) = arena();
        let tex = arena.register_texture(GpuTextureView::mock(1)).unwrap();
        assert_eq!(mock.count_bind_group_creates(), 1);
        assert!(arena.bind_group(ResourceRef::Texture(tex)).is_some());

        assert!(arena.release_texture(tex));
        assert!(!arena.release_texture(tex));
        assert!(arena.bind_group(ResourceRef::Texture(tex)).is_none());
        arena.assert_released();
    }

    #[test]
    fn test_stale_handle_does_not_alias_new_registration() {
        let (_mock, mut arena) = arena();
        let old = arena.register_texture(GpuTextureView::mock(1)).unwrap();
        arena.release_texture(old);
        let new = arena.register_texture(GpuTextureView::mock(2)).unwrap();
        assert_ne!(old, new);
        assert!(!arena.contains(ResourceRef::Texture(old)));
        assert!(arena.contains(ResourceRef::Texture(new)));
        arena.release_texture(new);
    }

    #[test]
    #[should_panic(expected = "live textures")]
    fn test_assert_released_catches_leaks() {
        let (_mock, mut arena) = arena();
        let _leaked = arena.register_texture(GpuTextureView::mock(1)).unwrap();
        arena.assert_released();
    }

    #[test]
    fn test_font_glyph_lookup() {
        let (_mock, mut arena) = arena();
        let glyphs = GlyphTable::new(16.0, 20.0).with_glyph(
            'a',
            Glyph {
                size: [8.0, 10.0],
                advance: 9.0,
                ..Default::default()
            },
        );
        let font = arena.register_font(GpuTextureView::mock(3), glyphs).unwrap();
        let table = arena.glyphs(font).unwrap();
        assert_eq!(table.get('a').map(|g| g.advance), Some(9.0));
        assert!(table.get('b').is_none());
        arena.release_font(font);
        arena.assert_released();
    }

    #[test]
    fn test_resource_table_deduplicates() {
        let (_mock, mut arena) = arena();
        let a = arena.register_texture(GpuTextureView::mock(1)).unwrap();
        let b = arena.register_texture(GpuTextureView::mock(2)).unwrap();

        let mut table = ResourceTable::new();
        assert_eq!(table.use_texture(a), 0);
        assert_eq!(table.use_texture(b), 1);
        assert_eq!(table.use_texture(a), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some(ResourceRef::Texture(b)));

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.use_texture(b), 0);
        arena.release_texture(a);
        arena.release_texture(b);
    }
}
