//! Capacity-bounded batching of fixed-size records into pooled storage buffers.
//!
//! # Lifecycle
//!
//! ```ignore
//! batches.clear();
//! for (key, record) in sorted {
//!     batches.push_keyed(key, record)?;
//! }
//! batches.upload_last();
//!
//! for batch in batches.batches() {
//!     let slot = batches.slot(batch.slot);
//!     // bind slot.bind_group, draw batch.count records
//! }
//! ```
//!
//! Records are staged on the CPU in a scratch `Vec` sized for one batch. When a
//! batch closes its records are written into that batch's slot with one
//! `write_buffer`, and the scratch space is reused for the next batch.
//!
//! Slot `i` always backs batch `i` of the current frame. The pool only grows:
//! a frame needing more batches than any before it allocates the difference,
//! and later frames reuse those slots.

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use strata_core::profiling::profile_function;
use strata_test_utils::{
    GpuBindGroup, GpuBindGroupDescriptor, GpuBindGroupEntry, GpuBindGroupLayout,
    GpuBindingResource, GpuBuffer, RenderContext,
};

use crate::error::RenderError;

/// A pooled storage buffer holding up to one batch of records.
#[derive(Debug, Clone)]
pub struct BufferSlot {
    pub buffer: GpuBuffer,
    /// Binds `buffer` at binding 0 of the storage layout.
    pub bind_group: GpuBindGroup,
}

/// A contiguous run of records sharing one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<M> {
    /// Index of the [`BufferSlot`] holding the records.
    pub slot: u32,
    /// Number of records, never zero once the batch is closed.
    pub count: u32,
    pub meta: M,
}

/// Partitions records of type `R` into batches tagged with metadata `M`.
pub struct BatchStorageBuffer<R: Pod, M> {
    context: Arc<dyn RenderContext>,
    layout: GpuBindGroupLayout,
    label: &'static str,
    capacity: u32,
    slots: Vec<BufferSlot>,
    batches: Vec<Batch<M>>,
    staging: Vec<R>,
    open: bool,
    _record: PhantomData<R>,
}

impl<R: Pod, M> BatchStorageBuffer<R, M> {
    /// `layout` must describe one read-only storage buffer at binding 0.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(
        context: Arc<dyn RenderContext>,
        layout: GpuBindGroupLayout,
        capacity: u32,
        label: &'static str,
    ) -> Self {
        assert!(capacity > 0, "batch capacity must be at least one record");
        Self {
            context,
            layout,
            label,
            capacity,
            slots: Vec::new(),
            batches: Vec::new(),
            staging: Vec::with_capacity(capacity as usize),
            open: false,
            _record: PhantomData,
        }
    }

    /// Records per batch.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Drop every batch of the previous frame. Slots are kept.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.staging.clear();
        self.open = false;
    }

    pub fn has_open_batch(&self) -> bool {
        self.open
    }

    /// `true` when no batch is open or the open batch holds `capacity`
    /// records. Either way the next record needs [`Self::upload_and_add_batch`].
    pub fn current_batch_full(&self) -> bool {
        !self.open || self.staging.len() as u32 >= self.capacity
    }

    /// Close the open batch (if any) and open a new one tagged `meta`.
    ///
    /// An open batch with no records is discarded rather than closed, so no
    /// empty batch is ever emitted. Returns the new batch's metadata.
    pub fn upload_and_add_batch(&mut self, meta: M) -> Result<&mut M, RenderError> {
        self.close_open_batch();

        let slot = self.batches.len() as u32;
        if slot as usize >= self.slots.len() {
            self.grow()?;
        }

        self.batches.push(Batch {
            slot,
            count: 0,
            meta,
        });
        self.open = true;
        let last = self.batches.len() - 1;
        Ok(&mut self.batches[last].meta)
    }

    /// Append one record to the open batch and return it for writing.
    ///
    /// # Panics
    /// Panics if no batch is open or the open batch is full.
    pub fn next_data(&mut self) -> &mut R {
        assert!(self.open, "next_data called with no open batch");
        assert!(
            !self.current_batch_full(),
            "next_data called on a full batch (capacity {})",
            self.capacity
        );
        let last = self.batches.len() - 1;
        self.batches[last].count += 1;
        let index = self.staging.len();
        self.staging.push(R::zeroed());
        &mut self.staging[index]
    }

    /// Close the final batch of the frame.
    pub fn upload_last(&mut self) {
        self.close_open_batch();
    }

    /// Closed batches of the current frame, in submission order.
    pub fn batches(&self) -> &[Batch<M>] {
        &self.batches
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: u32) -> Option<&BufferSlot> {
        self.slots.get(index as usize)
    }

    /// Total records across all batches of the frame, the open one included.
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.count as usize).sum()
    }

    fn close_open_batch(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        if self.staging.is_empty() {
            self.batches.pop();
            return;
        }

        let Some(batch) = self.batches.last() else {
            return;
        };
        debug_assert_eq!(batch.count as usize, self.staging.len());
        let slot = &self.slots[batch.slot as usize];
        self.context
            .write_buffer(&slot.buffer, 0, bytemuck::cast_slice(&self.staging));
        self.staging.clear();
    }

    fn grow(&mut self) -> Result<(), RenderError> {
        profile_function!();
        let size = self.capacity as u64 * std::mem::size_of::<R>() as u64;
        let buffer = self.context.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })?;
        let entries = [GpuBindGroupEntry {
            binding: 0,
            resource: GpuBindingResource::Buffer {
                buffer: &buffer,
                offset: 0,
                size: None,
            },
        }];
        let bind_group = self.context.create_bind_group(&GpuBindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &entries,
        })?;

        self.slots.push(BufferSlot { buffer, bind_group });
        tracing::debug!(
            "{}: buffer pool grew to {} slots ({} bytes each)",
            self.label,
            self.slots.len(),
            size
        );
        Ok(())
    }
}

impl<R: Pod, M: PartialEq> BatchStorageBuffer<R, M> {
    /// Append `record` under `key`, opening a new batch when the key changes
    /// or the open batch is full.
    pub fn push_keyed(&mut self, key: M, record: R) -> Result<(), RenderError> {
        let continues =
            !self.current_batch_full() && self.batches.last().is_some_and(|b| b.meta == key);
        if !continues {
            self.upload_and_add_batch(key)?;
        }
        *self.next_data() = record;
        Ok(())
    }

    /// Clear, then batch every `(key, record)` pair in order.
    ///
    /// The input must already be grouped by key; equal keys that are not
    /// adjacent produce separate batches.
    pub fn extend_partitioned(
        &mut self,
        records: impl IntoIterator<Item = (M, R)>,
    ) -> Result<(), RenderError> {
        profile_function!();
        self.clear();
        for (key, record) in records {
            self.push_keyed(key, record)?;
        }
        self.upload_last();
        Ok(())
    }
}

impl<R: Pod> BatchStorageBuffer<R, ()> {
    /// Append `record` to the current batch, splitting only at capacity.
    pub fn push(&mut self, record: R) -> Result<(), RenderError> {
        self.push_keyed((), record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::{GpuResourceKind, MockRenderContext};

    fn buffer(mock: &Arc<MockRenderContext>, capacity: u32) -> BatchStorageBuffer<u32, char> {
        BatchStorageBuffer::new(
            mock.clone(),
            GpuBindGroupLayout::mock(999),
            capacity,
            "test_batches",
        )
    }

    fn summary(batches: &BatchStorageBuffer<u32, char>) -> Vec<(char, u32)> {
        batches.batches().iter().map(|b| (b.meta, b.count)).collect()
    }

    /// Records as uploaded to each batch's slot.
    fn uploaded(
        mock: &MockRenderContext,
        batches: &BatchStorageBuffer<u32, char>,
    ) -> Vec<Vec<u32>> {
        batches
            .batches()
            .iter()
            .map(|b| {
                let slot = batches.slot(b.slot).unwrap();
                let bytes = mock.buffer_contents(&slot.buffer).unwrap();
                bytes
                    .chunks_exact(4)
                    .take(b.count as usize)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_splits_on_capacity_then_key() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 4);

        let records = (0..5u32).map(|i| ('A', i)).chain((5..7).map(|i| ('B', i)));
        batches.extend_partitioned(records).unwrap();

        assert_eq!(summary(&batches), vec![('A', 4), ('A', 1), ('B', 2)]);
        assert_eq!(batches.slot_count(), 3);

        let contents = uploaded(&mock, &batches);
        assert_eq!(contents, vec![vec![0, 1, 2, 3], vec![4], vec![5, 6]]);
    }

    #[test]
    fn test_no_records_no_batches() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 4);
        batches.extend_partitioned(std::iter::empty()).unwrap();
        assert!(batches.batches().is_empty());
        assert_eq!(mock.count_buffer_writes(), 0);
    }

    #[test]
    fn test_empty_open_batch_is_discarded() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 4);
        batches.upload_and_add_batch('A').unwrap();
        batches.upload_and_add_batch('B').unwrap();
        *batches.next_data() = 7;
        batches.upload_and_add_batch('C').unwrap();
        batches.upload_last();

        assert_eq!(summary(&batches), vec![('B', 1)]);
        assert_eq!(batches.batches()[0].slot, 0);
    }

    #[test]
    fn test_slots_are_reused_across_frames() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 2);

        batches
            .extend_partitioned((0..6u32).map(|i| ('A', i)))
            .unwrap();
        assert_eq!(batches.slot_count(), 3);
        let creates = mock.count_buffer_creates();

        batches
            .extend_partitioned((0..3u32).map(|i| ('A', i)))
            .unwrap();
        assert_eq!(batches.slot_count(), 3);
        assert_eq!(mock.count_buffer_creates(), creates);
        assert_eq!(summary(&batches), vec![('A', 2), ('A', 1)]);
    }

    #[test]
    fn test_every_batch_respects_capacity() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 3);
        let keys = ['A', 'A', 'B', 'B', 'B', 'B', 'B', 'C', 'A', 'A', 'A', 'A'];
        batches
            .extend_partitioned(keys.iter().enumerate().map(|(i, &k)| (k, i as u32)))
            .unwrap();

        assert!(batches.batches().iter().all(|b| b.count > 0 && b.count <= 3));
        assert_eq!(batches.record_count(), keys.len());
        assert_eq!(
            summary(&batches),
            vec![('A', 2), ('B', 3), ('B', 2), ('C', 1), ('A', 3), ('A', 1)]
        );
    }

    #[test]
    fn test_current_batch_full_states() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 2);
        assert!(batches.current_batch_full());

        batches.upload_and_add_batch('A').unwrap();
        assert!(!batches.current_batch_full());
        *batches.next_data() = 1;
        assert!(!batches.current_batch_full());
        assert_eq!(batches.record_count(), 1);
        *batches.next_data() = 2;
        assert!(batches.current_batch_full());

        batches.upload_last();
        assert!(batches.current_batch_full());
        assert_eq!(batches.record_count(), 2);

        batches.upload_and_add_batch('B').unwrap();
        batches.clear();
        assert!(batches.current_batch_full());
        assert_eq!(batches.record_count(), 0);
    }

    #[test]
    fn test_full_check_drives_manual_batching() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 4);
        for i in 0..5 {
            if batches.current_batch_full() {
                batches.upload_and_add_batch('A').unwrap();
            }
            *batches.next_data() = i;
        }
        batches.upload_last();

        assert_eq!(summary(&batches), vec![('A', 4), ('A', 1)]);
        assert_eq!(uploaded(&mock, &batches), vec![vec![0, 1, 2, 3], vec![4]]);
    }

    #[test]
    fn test_generated_sequences_batch_contiguously() {
        use rand::{Rng, SeedableRng};

        let mock = Arc::new(MockRenderContext::new());
        for capacity in 1..=6u32 {
            let mut batches = buffer(&mock, capacity);
            for seed in 0..40u64 {
                let mut rng = rand_pcg::Pcg64::seed_from_u64(seed * 31 + capacity as u64);
                let mut input: Vec<(char, u32)> = Vec::new();
                for _ in 0..rng.random_range(0..12) {
                    let key = (b'A' + rng.random_range(0..4u8)) as char;
                    for _ in 0..rng.random_range(0..10) {
                        input.push((key, input.len() as u32));
                    }
                }

                batches.extend_partitioned(input.iter().copied()).unwrap();
                let list = batches.batches();
                let contents = uploaded(&mock, &batches);

                let flattened: Vec<u32> = contents.iter().flatten().copied().collect();
                let expected: Vec<u32> = input.iter().map(|&(_, v)| v).collect();
                assert_eq!(flattened, expected, "capacity {capacity}, seed {seed}");

                for (batch, records) in list.iter().zip(&contents) {
                    assert!(batch.count >= 1 && batch.count <= capacity);
                    assert!(records.iter().all(|&v| input[v as usize].0 == batch.meta));
                }
                for pair in list.windows(2) {
                    assert!(
                        pair[0].meta != pair[1].meta || pair[0].count == capacity,
                        "needless split at capacity {capacity}, seed {seed}"
                    );
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "full batch")]
    fn test_next_data_on_full_batch_panics() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 1);
        batches.upload_and_add_batch('A').unwrap();
        *batches.next_data() = 1;
        batches.next_data();
    }

    #[test]
    #[should_panic(expected = "no open batch")]
    fn test_next_data_without_batch_panics() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 1);
        batches.next_data();
    }

    #[test]
    fn test_slot_creation_failure_is_reported() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches = buffer(&mock, 4);
        mock.fail_next(GpuResourceKind::Buffer);

        let result = batches.push_keyed('A', 1);
        assert!(matches!(result, Err(RenderError::Gpu(_))));
        assert_eq!(batches.slot_count(), 0);
        assert!(batches.batches().is_empty());
    }

    #[test]
    fn test_unkeyed_push() {
        let mock = Arc::new(MockRenderContext::new());
        let mut batches: BatchStorageBuffer<u32, ()> = BatchStorageBuffer::new(
            mock.clone(),
            GpuBindGroupLayout::mock(999),
            2,
            "unkeyed",
        );
        for i in 0..5 {
            batches.push(i).unwrap();
        }
        batches.upload_last();
        let counts: Vec<u32> = batches.batches().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }
}
