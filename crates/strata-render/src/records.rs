//! GPU record formats.
//!
//! Batches hold these records in storage buffers. The vertex shaders pull
//! them by `vertex_index / 6`, so there is no vertex buffer layout.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// A textured quad: sprites, glyphs and UI elements.
///
/// 64 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// Center of the quad.
    pub position: [f32; 2],
    /// Full width and height.
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    /// Tint (RGBA).
    pub color: [f32; 4],
    /// Rotation around the center, in radians.
    pub rotation: f32,
    /// Normalized depth (0.0 = farthest).
    pub depth: f32,
    pub _pad: [f32; 2],
}

impl Default for SpriteInstance {
    fn default() -> Self {
        Self {
            position: [0.0; 2],
            size: [0.0; 2],
            uv_min: [0.0; 2],
            uv_max: [1.0; 2],
            color: [1.0; 4],
            rotation: 0.0,
            depth: 0.0,
            _pad: [0.0; 2],
        }
    }
}

impl SpriteInstance {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Shape discriminant for [`ShapeInstance`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Solid rectangle; `extent` is the full size.
    Quad = 0,
    /// Thick segment; `position` is the midpoint, `extent.x` the length.
    Line = 1,
    /// Filled disc or ring; `extent` is the diameter.
    Circle = 2,
}

/// An untextured primitive.
///
/// 48 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShapeInstance {
    pub position: [f32; 2],
    pub extent: [f32; 2],
    pub color: [f32; 4],
    pub rotation: f32,
    /// Ring thickness for circles and width for lines. Zero fills circles.
    pub thickness: f32,
    pub depth: f32,
    /// A [`ShapeKind`] as `u32`.
    pub shape: u32,
}

impl ShapeInstance {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn kind(&self) -> Option<ShapeKind> {
        match self.shape {
            0 => Some(ShapeKind::Quad),
            1 => Some(ShapeKind::Line),
            2 => Some(ShapeKind::Circle),
            _ => None,
        }
    }
}

const_assert_eq!(std::mem::size_of::<SpriteInstance>(), 64);
const_assert_eq!(std::mem::size_of::<ShapeInstance>(), 48);

/// Per-view uniform: one projection matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ViewUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_alignment() {
        assert!(std::mem::align_of::<SpriteInstance>() <= 16);
        assert_eq!(SpriteInstance::SIZE % 16, 0);
        assert_eq!(ShapeInstance::SIZE % 16, 0);
    }

    #[test]
    fn test_shape_kind_round_trips_through_tag() {
        for kind in [ShapeKind::Quad, ShapeKind::Line, ShapeKind::Circle] {
            let instance = ShapeInstance {
                shape: kind as u32,
                ..Zeroable::zeroed()
            };
            assert_eq!(instance.kind(), Some(kind));
        }
        let bogus = ShapeInstance {
            shape: 7,
            ..Zeroable::zeroed()
        };
        assert_eq!(bogus.kind(), None);
    }
}
