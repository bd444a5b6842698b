//! Handshake between the simulation thread and the render thread.
//!
//! The simulation fills the collecting instance and calls
//! [`FrameSync::finish_simulation`], which blocks until the render thread has
//! called [`FrameSync::synchronize`]. The swap happens inside `synchronize`
//! while both sides are parked, so each completed simulation frame is swapped
//! exactly once and neither thread ever sees the other's instance.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use strata_core::profiling::profile_function;

use crate::double_buffer::{DoubleBuffer, FrameData};

/// Where the handshake currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    SimRunning,
    WaitingForSync,
    Synchronizing,
    RenderRunning,
}

/// How [`FrameSync::finish_simulation`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The frame was swapped to the renderer; keep simulating.
    Synchronized,
    /// Shutdown was requested before the frame was taken.
    Shutdown,
}

struct SyncState<T> {
    sim_finished: bool,
    sync_done: bool,
    shutdown: bool,
    phase: SyncPhase,
    generation: u64,
    buffers: DoubleBuffer<Arc<Mutex<T>>>,
}

/// Two-thread frame handshake over a double buffer.
///
/// Each instance also sits behind its own mutex. The handshake keeps those
/// locks uncontended; a caller that breaks the protocol blocks instead of
/// racing.
pub struct FrameSync<T> {
    state: Mutex<SyncState<T>>,
    sim_ready: Condvar,
    sync_complete: Condvar,
}

impl<T: FrameData> FrameSync<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            state: Mutex::new(SyncState {
                sim_finished: false,
                sync_done: false,
                shutdown: false,
                phase: SyncPhase::Idle,
                generation: 0,
                buffers: DoubleBuffer::new(
                    Arc::new(Mutex::new(first)),
                    Arc::new(Mutex::new(second)),
                ),
            }),
            sim_ready: Condvar::new(),
            sync_complete: Condvar::new(),
        }
    }

    /// The instance the simulation should append to.
    ///
    /// Lock it, fill it, and drop the guard before calling
    /// [`Self::finish_simulation`].
    pub fn collecting(&self) -> Arc<Mutex<T>> {
        let mut state = self.state.lock();
        state.phase = SyncPhase::SimRunning;
        state.buffers.collecting().clone()
    }

    /// Hand the collecting instance over and wait for the swap.
    ///
    /// Called on the simulation thread. Blocks until the render thread has
    /// synchronized or shutdown is requested.
    pub fn finish_simulation(&self) -> SyncOutcome {
        profile_function!();
        let mut state = self.state.lock();
        if state.shutdown {
            return SyncOutcome::Shutdown;
        }

        state.sim_finished = true;
        state.phase = SyncPhase::WaitingForSync;
        self.sim_ready.notify_one();

        while !state.sync_done && !state.shutdown {
            self.sync_complete.wait(&mut state);
        }

        if state.sync_done {
            state.sync_done = false;
            SyncOutcome::Synchronized
        } else {
            SyncOutcome::Shutdown
        }
    }

    /// Wait for a finished simulation frame, swap, and return it for rendering.
    ///
    /// Called on the render thread. The new collecting instance is cleared
    /// and receives the carried-over state of the frame just handed out
    /// before the simulation is released. Returns `None` once shutdown has
    /// been requested and no finished frame is pending.
    pub fn synchronize(&self) -> Option<Arc<Mutex<T>>> {
        profile_function!();
        let mut state = self.state.lock();
        while !state.sim_finished && !state.shutdown {
            self.sim_ready.wait(&mut state);
        }
        if !state.sim_finished {
            return None;
        }

        state.phase = SyncPhase::Synchronizing;
        state.buffers.swap();
        {
            let (collecting, rendering) = state.buffers.split_mut();
            let mut next = collecting.lock();
            let previous = rendering.lock();
            next.clear();
            next.carry_over_from(&previous);
        }

        let rendering = state.buffers.rendering().clone();
        state.sim_finished = false;
        state.sync_done = true;
        state.generation += 1;
        state.phase = SyncPhase::RenderRunning;
        self.sync_complete.notify_one();

        tracing::trace!("Synchronized frame {}", state.generation);
        Some(rendering)
    }

    /// Mark the render side of the current frame as finished.
    pub fn finish_render(&self) {
        let mut state = self.state.lock();
        if state.phase == SyncPhase::RenderRunning {
            state.phase = SyncPhase::Idle;
        }
    }
}

impl<T> FrameSync<T> {
    /// Ask both sides to stop and wake whichever one is waiting.
    pub fn request_shutdown(&self) {
        let mut state = self.state.lock();
        if !state.shutdown {
            tracing::debug!("Frame sync shutdown requested");
        }
        state.shutdown = true;
        self.sim_ready.notify_all();
        self.sync_complete.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.lock().phase
    }

    /// Number of swaps performed so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// A guard that requests shutdown when dropped, including during a panic.
    pub fn shutdown_guard(&self) -> ShutdownGuard<'_, T> {
        ShutdownGuard { sync: self }
    }
}

impl<T> fmt::Debug for FrameSync<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FrameSync")
            .field("phase", &state.phase)
            .field("generation", &state.generation)
            .field("sim_finished", &state.sim_finished)
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

/// Requests shutdown of a [`FrameSync`] when dropped.
///
/// Held by the simulation loop so that every way out of it, panics included,
/// releases a render thread blocked in [`FrameSync::synchronize`].
pub struct ShutdownGuard<'a, T> {
    sync: &'a FrameSync<T>,
}

impl<T> Drop for ShutdownGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("Simulation thread panicked; shutting down");
        }
        self.sync.request_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Frame {
        values: Vec<u64>,
        carried: u64,
    }

    impl FrameData for Frame {
        fn clear(&mut self) {
            self.values.clear();
        }

        fn carry_over_from(&mut self, previous: &Self) {
            self.carried = previous.carried;
        }
    }

    #[test]
    fn test_single_handshake() {
        let sync = FrameSync::new(Frame::default(), Frame::default());
        assert_eq!(sync.phase(), SyncPhase::Idle);

        thread::scope(|s| {
            s.spawn(|| {
                let frame = sync.collecting();
                {
                    let mut frame = frame.lock();
                    frame.values.push(7);
                    frame.carried = 3;
                }
                assert_eq!(sync.finish_simulation(), SyncOutcome::Synchronized);
            });

            let rendering = sync.synchronize().expect("frame");
            let rendering = rendering.lock();
            assert_eq!(rendering.values, vec![7]);
        });

        assert_eq!(sync.generation(), 1);
        assert_eq!(sync.phase(), SyncPhase::RenderRunning);
        sync.finish_render();
        assert_eq!(sync.phase(), SyncPhase::Idle);

        let next = sync.collecting();
        let next = next.lock();
        assert!(next.values.is_empty());
        assert_eq!(next.carried, 3);
    }

    #[test]
    fn test_every_frame_is_swapped_exactly_once() {
        const FRAMES: u64 = 500;
        let sync = FrameSync::new(Frame::default(), Frame::default());

        thread::scope(|s| {
            s.spawn(|| {
                let _guard = sync.shutdown_guard();
                for sequence in 0..FRAMES {
                    {
                        let frame = sync.collecting();
                        let mut frame = frame.lock();
                        assert!(frame.values.is_empty(), "collecting instance not cleared");
                        frame.values.push(sequence);
                    }
                    if sync.finish_simulation() == SyncOutcome::Shutdown {
                        break;
                    }
                }
            });

            let mut expected = 0;
            while let Some(frame) = sync.synchronize() {
                let frame = frame.lock();
                assert_eq!(frame.values, vec![expected]);
                expected += 1;
                drop(frame);
                sync.finish_render();
            }
            assert_eq!(expected, FRAMES);
        });

        assert_eq!(sync.generation(), FRAMES);
    }

    #[test]
    fn test_shutdown_releases_waiting_render_thread() {
        let sync = FrameSync::<Frame>::new(Frame::default(), Frame::default());
        thread::scope(|s| {
            let waiter = s.spawn(|| sync.synchronize().is_none());
            thread::sleep(Duration::from_millis(20));
            sync.request_shutdown();
            assert!(waiter.join().expect("render thread"));
        });
    }

    #[test]
    fn test_shutdown_releases_waiting_simulation() {
        let sync = FrameSync::new(Frame::default(), Frame::default());
        thread::scope(|s| {
            let waiter = s.spawn(|| sync.finish_simulation());
            thread::sleep(Duration::from_millis(20));
            sync.request_shutdown();
            assert_eq!(waiter.join().expect("sim thread"), SyncOutcome::Shutdown);
        });
        assert_eq!(sync.finish_simulation(), SyncOutcome::Shutdown);
    }

    #[test]
    fn test_guard_requests_shutdown_on_panic() {
        let sync = FrameSync::new(Frame::default(), Frame::default());
        thread::scope(|s| {
            let sim = s.spawn(|| {
                let _guard = sync.shutdown_guard();
                panic!("simulation failed");
            });
            assert!(sync.synchronize().is_none());
            assert!(sim.join().is_err());
        });
        assert!(sync.is_shutdown());
    }
}
