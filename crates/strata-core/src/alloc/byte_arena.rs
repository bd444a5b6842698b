//! Growable byte store addressed by offsets.
//!
//! Text appended during a frame lands here; command records keep an
//! [`ArenaSpan`] instead of a pointer, so the backing `Vec` may reallocate
//! without invalidating anything that refers into it.

/// Offset and length of a run of bytes inside a [`ByteArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArenaSpan {
    pub offset: u32,
    pub len: u32,
}

impl ArenaSpan {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset + self.len) as usize
    }
}

#[derive(Debug, Default, Clone)]
pub struct ByteArena {
    bytes: Vec<u8>,
}

impl ByteArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) -> ArenaSpan {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(data);
        ArenaSpan {
            offset,
            len: data.len() as u32,
        }
    }

    pub fn push_str(&mut self, text: &str) -> ArenaSpan {
        self.push_bytes(text.as_bytes())
    }

    pub fn bytes(&self, span: ArenaSpan) -> Option<&[u8]> {
        self.bytes.get(span.range())
    }

    /// Text previously stored with [`push_str`](Self::push_str).
    ///
    /// Returns `None` for spans that do not belong to this arena's current
    /// contents or do not fall on UTF-8 boundaries.
    pub fn str(&self, span: ArenaSpan) -> Option<&str> {
        self.bytes(span).and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Drop all contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_survive_growth() {
        let mut arena = ByteArena::with_capacity(4);
        let first = arena.push_str("hello");
        for _ in 0..100 {
            arena.push_str("padding to force reallocation");
        }
        assert_eq!(arena.str(first), Some("hello"));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut arena = ByteArena::new();
        arena.push_str("some text");
        let cap = arena.capacity();
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), cap);
    }

    #[test]
    fn test_out_of_range_span() {
        let arena = ByteArena::new();
        assert_eq!(arena.str(ArenaSpan { offset: 0, len: 3 }), None);
    }
}
