//! Math types.
//!
//! CPU-side math uses `glam` (re-exported wholesale). Records that cross into
//! GPU buffers store plain `[f32; N]` arrays instead, so they stay `Pod`.

pub use glam::*;

/// Normalized depth for a layer index out of `layer_count` layers.
///
/// Layer 0 maps to 0.0 (farthest back); values approach 1.0 as the layer grows.
/// Layers at or beyond `layer_count` saturate just below 1.0.
#[inline]
pub fn layer_depth(layer: u32, layer_count: u32) -> f32 {
    let count = layer_count.max(1);
    let clamped = layer.min(count - 1);
    clamped as f32 / count as f32
}

/// Orthographic projection mapping pixel coordinates (origin top-left, y down)
/// to clip space.
pub fn screen_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
}
