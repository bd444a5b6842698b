//! Fixed-step frame scheduler.

use std::time::Duration;

use strata_core::profiling::profile_function;

/// Accumulator units per tick. Time is stored as `nanoseconds * frequency`,
/// so one tick of `1 / frequency` seconds is exactly this many units.
const UNITS_PER_TICK: u128 = 1_000_000_000;

/// What the simulation should run for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTicks {
    /// Number of simulation updates to run.
    pub ticks: u32,
    /// Duration each update advances the simulation by.
    pub step: Duration,
    /// Leftover fraction of a tick in `[0, 1)`, for interpolation.
    pub alpha: f32,
}

/// Turns wall-clock frame deltas into simulation ticks.
///
/// With a non-zero update frequency the scheduler runs a fixed-step
/// accumulator: every `1 / frequency` seconds of accumulated time produces one
/// tick and the remainder is reported as `alpha`. A frequency of zero selects
/// variable stepping: exactly one tick per frame, as long as the frame.
///
/// At most `max_ticks_per_frame` ticks fire in one frame. Whole steps beyond
/// that are discarded so a long hitch cannot snowball into ever longer frames.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use strata::FrameScheduler;
///
/// let mut scheduler = FrameScheduler::new(60, 5);
/// let ticks = scheduler.advance(Duration::from_millis(50));
/// assert_eq!(ticks.ticks, 3);
/// assert_eq!(ticks.alpha, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    frequency: u32,
    max_ticks_per_frame: u32,
    accumulator: u128,
    step: Duration,
    elapsed: Duration,
    frame_count: u64,
    tick_count: u64,
    dropped_ticks: u64,
}

impl FrameScheduler {
    pub fn new(frequency: u32, max_ticks_per_frame: u32) -> Self {
        let step = if frequency > 0 {
            Duration::from_secs_f64(1.0 / frequency as f64)
        } else {
            Duration::ZERO
        };
        Self {
            frequency,
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            accumulator: 0,
            step,
            elapsed: Duration::ZERO,
            frame_count: 0,
            tick_count: 0,
            dropped_ticks: 0,
        }
    }

    pub fn from_config(config: &strata_core::config::EngineConfig) -> Self {
        Self::new(config.update_frequency, config.max_ticks_per_frame)
    }

    /// Account for `delta` of wall-clock time and report the ticks to run.
    pub fn advance(&mut self, delta: Duration) -> FrameTicks {
        profile_function!();
        self.frame_count += 1;
        self.elapsed += delta;

        if self.frequency == 0 {
            self.tick_count += 1;
            return FrameTicks {
                ticks: 1,
                step: delta,
                alpha: 0.0,
            };
        }

        self.accumulator += delta.as_nanos() * self.frequency as u128;

        let available = self.accumulator / UNITS_PER_TICK;
        let ticks = available.min(self.max_ticks_per_frame as u128);
        self.accumulator -= ticks * UNITS_PER_TICK;

        let surplus = available - ticks;
        if surplus > 0 {
            self.accumulator %= UNITS_PER_TICK;
            self.dropped_ticks += surplus as u64;
            tracing::debug!(
                "Frame needed {} ticks, capped at {}; dropping {} ticks",
                available,
                self.max_ticks_per_frame,
                surplus
            );
        }

        let ticks = ticks as u32;
        self.tick_count += ticks as u64;
        FrameTicks {
            ticks,
            step: self.step,
            alpha: (self.accumulator as f64 / UNITS_PER_TICK as f64) as f32,
        }
    }

    /// Forget accumulated time, e.g. after a pause.
    pub fn reset(&mut self) {
        self.accumulator = 0;
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Duration of one fixed tick, zero in variable-step mode.
    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn is_fixed_step(&self) -> bool {
        self.frequency > 0
    }

    pub fn max_ticks_per_frame(&self) -> u32 {
        self.max_ticks_per_frame
    }

    /// Total wall-clock time passed to [`Self::advance`].
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks discarded by the per-frame cap so far.
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(60, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_ticks_at_sixty_hz() {
        let mut scheduler = FrameScheduler::new(60, 5);
        let frame = scheduler.advance(Duration::from_millis(50));
        assert_eq!(frame.ticks, 3);
        assert_eq!(frame.alpha, 0.0);
        assert_eq!(scheduler.tick_count(), 3);
    }

    #[test]
    fn test_leftover_becomes_alpha() {
        let mut scheduler = FrameScheduler::new(10, 5);
        let frame = scheduler.advance(Duration::from_millis(150));
        assert_eq!(frame.ticks, 1);
        assert!((frame.alpha - 0.5).abs() < 1e-6);

        let frame = scheduler.advance(Duration::from_millis(50));
        assert_eq!(frame.ticks, 1);
        assert_eq!(frame.alpha, 0.0);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut scheduler = FrameScheduler::new(60, 5);
        let mut total = 0;
        // 1/240 s four times is exactly one tick.
        for _ in 0..4 {
            total += scheduler.advance(Duration::from_nanos(4_166_667)).ticks;
        }
        assert_eq!(total, 1);
        assert_eq!(scheduler.frame_count(), 4);
    }

    #[test]
    fn test_no_drift_over_many_frames() {
        let mut scheduler = FrameScheduler::new(50, 5);
        let mut total = 0u64;
        for _ in 0..1000 {
            total += scheduler.advance(Duration::from_millis(20)).ticks as u64;
        }
        assert_eq!(total, 1000);
        assert_eq!(scheduler.dropped_ticks(), 0);
    }

    #[test]
    fn test_variable_step() {
        let mut scheduler = FrameScheduler::new(0, 5);
        assert!(!scheduler.is_fixed_step());
        let frame = scheduler.advance(Duration::from_millis(33));
        assert_eq!(frame.ticks, 1);
        assert_eq!(frame.step, Duration::from_millis(33));
        assert_eq!(frame.alpha, 0.0);
    }

    #[test]
    fn test_catch_up_is_capped() {
        let mut scheduler = FrameScheduler::new(10, 5);
        let frame = scheduler.advance(Duration::from_millis(1250));
        assert_eq!(frame.ticks, 5);
        assert_eq!(scheduler.dropped_ticks(), 7);
        assert!((frame.alpha - 0.5).abs() < 1e-6);

        let frame = scheduler.advance(Duration::from_millis(50));
        assert_eq!(frame.ticks, 1);
        assert_eq!(frame.alpha, 0.0);
    }

    #[test]
    fn test_reset_discards_accumulated_time() {
        let mut scheduler = FrameScheduler::new(10, 5);
        scheduler.advance(Duration::from_millis(90));
        scheduler.reset();
        let frame = scheduler.advance(Duration::from_millis(90));
        assert_eq!(frame.ticks, 0);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(180));
    }
}
