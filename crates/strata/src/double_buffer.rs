//! Two instances of a value and a selector flipping between them.

/// Per-frame data that is recycled after every swap.
pub trait FrameData {
    /// Empty the instance for a new collecting phase, keeping its capacity.
    fn clear(&mut self);

    /// Copy whatever must persist across frames from the instance that was
    /// just handed to the renderer.
    fn carry_over_from(&mut self, previous: &Self);
}

impl FrameData for strata_render::FrameCommands {
    fn clear(&mut self) {
        strata_render::FrameCommands::clear(self);
    }

    fn carry_over_from(&mut self, previous: &Self) {
        strata_render::FrameCommands::carry_over_from(self, previous);
    }
}

/// A pair of values, one being collected into and one being rendered from.
///
/// [`DoubleBuffer::swap`] flips which instance plays which role in O(1)
/// without moving either value.
///
/// # Example
///
/// ```
/// use strata::DoubleBuffer;
///
/// let mut buffer = DoubleBuffer::new(Vec::new(), Vec::new());
/// buffer.collecting_mut().push(1);
/// buffer.swap();
/// assert_eq!(buffer.rendering(), &vec![1]);
/// assert!(buffer.collecting().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DoubleBuffer<T> {
    instances: [T; 2],
    flipped: bool,
}

impl<T> DoubleBuffer<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            instances: [first, second],
            flipped: false,
        }
    }

    /// Build both instances with `make`.
    pub fn from_fn(mut make: impl FnMut() -> T) -> Self {
        Self::new(make(), make())
    }

    #[inline]
    fn first_index(&self) -> usize {
        self.flipped as usize
    }

    #[inline]
    fn second_index(&self) -> usize {
        !self.flipped as usize
    }

    /// The instance currently selected for collection.
    #[inline]
    pub fn first(&self) -> &T {
        &self.instances[self.first_index()]
    }

    #[inline]
    pub fn first_mut(&mut self) -> &mut T {
        let index = self.first_index();
        &mut self.instances[index]
    }

    /// The instance currently selected for rendering.
    #[inline]
    pub fn second(&self) -> &T {
        &self.instances[self.second_index()]
    }

    #[inline]
    pub fn second_mut(&mut self) -> &mut T {
        let index = self.second_index();
        &mut self.instances[index]
    }

    #[inline]
    pub fn collecting(&self) -> &T {
        self.first()
    }

    #[inline]
    pub fn collecting_mut(&mut self) -> &mut T {
        self.first_mut()
    }

    #[inline]
    pub fn rendering(&self) -> &T {
        self.second()
    }

    #[inline]
    pub fn rendering_mut(&mut self) -> &mut T {
        self.second_mut()
    }

    /// Borrow both instances at once as `(collecting, rendering)`.
    pub fn split_mut(&mut self) -> (&mut T, &mut T) {
        let [a, b] = &mut self.instances;
        if self.flipped { (b, a) } else { (a, b) }
    }

    /// Exchange the roles of the two instances.
    #[inline]
    pub fn swap(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Number of swaps modulo two; `false` after an even number.
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }
}

impl<T: FrameData> DoubleBuffer<T> {
    /// Swap, then recycle the new collecting instance from the new rendering one.
    pub fn swap_and_recycle(&mut self) {
        self.swap();
        let (collecting, rendering) = self.split_mut();
        collecting.clear();
        collecting.carry_over_from(rendering);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_round_trip() {
        let mut buffer = DoubleBuffer::new(1, 2);
        let first = *buffer.first();
        let second = *buffer.second();

        buffer.swap();
        assert_eq!(*buffer.first(), second);
        assert_eq!(*buffer.second(), first);

        buffer.swap();
        assert_eq!(*buffer.first(), first);
        assert_eq!(*buffer.second(), second);
        assert!(!buffer.is_flipped());
    }

    #[test]
    fn test_roles_never_alias() {
        let mut buffer = DoubleBuffer::from_fn(Vec::<u32>::new);
        for _ in 0..3 {
            let first = buffer.first() as *const _;
            let second = buffer.second() as *const _;
            assert_ne!(first, second);
            buffer.swap();
        }
    }

    #[test]
    fn test_collected_values_become_visible_after_swap() {
        let mut buffer = DoubleBuffer::from_fn(Vec::new);
        buffer.collecting_mut().extend([1, 2, 3]);
        assert!(buffer.rendering().is_empty());

        buffer.swap();
        assert_eq!(buffer.rendering(), &vec![1, 2, 3]);
        buffer.collecting_mut().clear();
        buffer.collecting_mut().push(4);
        assert_eq!(buffer.rendering(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_split_mut_follows_selector() {
        let mut buffer = DoubleBuffer::new('a', 'b');
        {
            let (collecting, rendering) = buffer.split_mut();
            assert_eq!((*collecting, *rendering), ('a', 'b'));
            *collecting = 'c';
        }
        buffer.swap();
        let (collecting, rendering) = buffer.split_mut();
        assert_eq!((*collecting, *rendering), ('b', 'c'));
    }

    #[test]
    fn test_swap_and_recycle_frame_commands() {
        use strata_core::math::{Mat4, Vec2, Vec3};
        use strata_render::{Color, FrameCommands};

        let mut buffer = DoubleBuffer::from_fn(FrameCommands::default);
        buffer.swap_and_recycle();

        let camera = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let frame = buffer.collecting_mut();
        frame.set_view_projection(camera);
        frame.set_clear_color(Color::BLUE);
        frame.append_quad(Vec2::ZERO, Vec2::ONE, Color::RED);

        buffer.swap_and_recycle();
        assert_eq!(buffer.rendering().primitives().len(), 1);

        let next = buffer.collecting();
        assert!(next.is_empty());
        assert_eq!(next.views()[0], camera);
        assert_eq!(next.clear_color(), Color::BLUE);
    }
}
