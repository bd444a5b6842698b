//! Depth layer counter.

use strata_core::math::layer_depth;

/// Default number of distinct layers mapped onto `[0, 1)`.
pub const DEFAULT_LAYER_COUNT: u32 = 1 << 16;

/// Hands out depth layers in submission order.
///
/// Layer 0 is the farthest back; each call to [`DepthLayers::advance`] moves
/// subsequent draws one layer nearer. Depth only orders draws, it never
/// partitions them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthLayers {
    current: u32,
    layer_count: u32,
    /// Reset to layer 0 whenever the owning command lists are cleared.
    pub reset_per_frame: bool,
}

impl Default for DepthLayers {
    fn default() -> Self {
        Self::new(DEFAULT_LAYER_COUNT)
    }
}

impl DepthLayers {
    pub fn new(layer_count: u32) -> Self {
        Self {
            current: 0,
            layer_count: layer_count.max(1),
            reset_per_frame: true,
        }
    }

    /// Move to the next (nearer) layer and return it.
    pub fn advance(&mut self) -> u32 {
        if self.current + 1 >= self.layer_count {
            tracing::warn!(
                "Depth layer limit {} reached; further layers share the nearest depth",
                self.layer_count
            );
        } else {
            self.current += 1;
        }
        self.current
    }

    /// Jump to an explicit layer, clamped to the layer count.
    pub fn set(&mut self, layer: u32) {
        self.current = layer.min(self.layer_count - 1);
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// Normalized depth of the current layer.
    pub fn depth(&self) -> f32 {
        layer_depth(self.current, self.layer_count)
    }

    pub(crate) fn frame_reset(&mut self) {
        if self.reset_per_frame {
            self.current = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_increases_depth() {
        let mut layers = DepthLayers::new(8);
        let back = layers.depth();
        layers.advance();
        assert!(layers.depth() > back);
        assert_eq!(layers.current(), 1);
    }

    #[test]
    fn test_advance_saturates() {
        let mut layers = DepthLayers::new(2);
        assert_eq!(layers.advance(), 1);
        assert_eq!(layers.advance(), 1);
    }

    #[test]
    fn test_frame_reset_respects_flag() {
        let mut layers = DepthLayers::new(8);
        layers.set(5);
        layers.frame_reset();
        assert_eq!(layers.current(), 0);

        layers.reset_per_frame = false;
        layers.set(5);
        layers.frame_reset();
        assert_eq!(layers.current(), 5);
    }
}
