//! The engine loop: scheduler, simulation, handshake and submission.

use std::thread;
use std::time::{Duration, Instant};

use strata_core::config::{EngineConfig, ThreadingMode};
use strata_core::logging;
use strata_core::profiling::{self, profile_function};
use strata_render::{FrameCommands, FrameRenderer};
use strata_test_utils::Presenter;

use crate::double_buffer::DoubleBuffer;
use crate::error::EngineError;
use crate::scheduler::{FrameScheduler, FrameTicks};
use crate::sync::{FrameSync, SyncOutcome};

/// Game logic driven by the engine.
///
/// `update` runs once per scheduled tick; `draw` runs once per frame after the
/// ticks and appends that frame's draw requests. In multi-threaded mode both
/// run on the simulation thread.
pub trait Simulation: Send {
    fn update(&mut self, step: Duration);

    /// `alpha` is the leftover fraction of a fixed tick, for interpolation.
    fn draw(&mut self, alpha: f32, frame: &mut FrameCommands);

    /// Return `true` to stop the engine after the current frame.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Host event pump, polled once per frame on the main thread.
pub trait Platform {
    /// `false` ends the run, e.g. once the window was closed.
    fn should_continue(&mut self) -> bool;
}

impl<F: FnMut() -> bool> Platform for F {
    fn should_continue(&mut self) -> bool {
        self()
    }
}

/// Source of per-frame wall-clock deltas.
pub trait Clock: Send {
    fn delta(&mut self) -> Duration;
}

/// Measures real time between calls. The first delta is zero.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Option<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn delta(&mut self) -> Duration {
        let now = Instant::now();
        let delta = self.last.map_or(Duration::ZERO, |last| now - last);
        self.last = Some(now);
        delta
    }
}

/// Reports the same delta every frame. Useful for headless runs and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Duration);

impl Clock for FixedClock {
    fn delta(&mut self) -> Duration {
        self.0
    }
}

/// Counters for one [`Engine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames submitted and presented.
    pub frames: u64,
    /// Frames skipped because of a transient render error.
    pub skipped_frames: u64,
    pub ticks: u64,
    pub dropped_ticks: u64,
}

/// Runs a [`Simulation`] against a [`FrameRenderer`].
///
/// The renderer and presenter are borrowed and always used from the calling
/// thread. In [`ThreadingMode::MultiThreaded`] the simulation and the clock
/// move to a `strata-sim` thread for the duration of the run; it is joined
/// before `run` returns, so GPU objects are never dropped while it lives.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Install logging, start the profiler if configured, and keep `config`.
    pub fn new(config: EngineConfig) -> Self {
        logging::init(&config.log_filter);
        if let Some(addr) = &config.profiler_addr {
            profiling::init_profiling(addr);
        }
        tracing::info!(
            "Engine configured: {:?}, {} Hz, at most {} ticks per frame",
            config.threading,
            config.update_frequency,
            config.max_ticks_per_frame
        );
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run until the platform, the simulation or a fatal error stops it.
    ///
    /// Transient render errors skip the frame with a warning. Fatal ones
    /// stop the simulation and are returned.
    pub fn run<S: Simulation, C: Clock>(
        &self,
        simulation: &mut S,
        platform: &mut dyn Platform,
        clock: &mut C,
        renderer: &mut FrameRenderer,
        presenter: &mut dyn Presenter,
    ) -> Result<RunStats, EngineError> {
        let stats = match self.config.threading {
            ThreadingMode::SingleThreaded => {
                self.run_single_threaded(simulation, platform, clock, renderer, presenter)
            }
            ThreadingMode::MultiThreaded => {
                self.run_multi_threaded(simulation, platform, clock, renderer, presenter)
            }
        }?;
        tracing::info!(
            "Engine stopped after {} frames ({} skipped, {} ticks, {} dropped)",
            stats.frames,
            stats.skipped_frames,
            stats.ticks,
            stats.dropped_ticks
        );
        Ok(stats)
    }

    fn new_frame_commands(&self) -> FrameCommands {
        FrameCommands::with_depth_layer_count(self.config.depth_layer_count)
    }

    fn run_single_threaded<S: Simulation, C: Clock>(
        &self,
        simulation: &mut S,
        platform: &mut dyn Platform,
        clock: &mut C,
        renderer: &mut FrameRenderer,
        presenter: &mut dyn Presenter,
    ) -> Result<RunStats, EngineError> {
        let mut buffers = DoubleBuffer::from_fn(|| self.new_frame_commands());
        let mut scheduler = FrameScheduler::from_config(&self.config);
        let mut stats = RunStats::default();

        loop {
            profiling::new_frame();
            if !platform.should_continue() || simulation.is_finished() {
                break;
            }

            let ticks = scheduler.advance(clock.delta());
            step_simulation(simulation, ticks, buffers.collecting_mut(), &|| false);
            buffers.swap_and_recycle();
            render_frame(renderer, buffers.rendering(), presenter, &mut stats)?;
        }

        stats.ticks = scheduler.tick_count();
        stats.dropped_ticks = scheduler.dropped_ticks();
        Ok(stats)
    }

    fn run_multi_threaded<S: Simulation, C: Clock>(
        &self,
        simulation: &mut S,
        platform: &mut dyn Platform,
        clock: &mut C,
        renderer: &mut FrameRenderer,
        presenter: &mut dyn Presenter,
    ) -> Result<RunStats, EngineError> {
        let sync = FrameSync::new(self.new_frame_commands(), self.new_frame_commands());
        let mut scheduler = FrameScheduler::from_config(&self.config);
        let mut stats = RunStats::default();

        thread::scope(|scope| {
            let sync = &sync;
            let sim_thread = thread::Builder::new()
                .name("strata-sim".to_string())
                .spawn_scoped(scope, move || {
                    simulate(sync, simulation, clock, &mut scheduler);
                    scheduler
                })
                .map_err(|e| {
                    EngineError::Simulation(format!("failed to spawn simulation thread: {e}"))
                })?;

            let mut result = Ok(());
            loop {
                profiling::new_frame();
                if !platform.should_continue() {
                    break;
                }
                let Some(frame) = sync.synchronize() else {
                    break;
                };
                let outcome = {
                    let frame = frame.lock();
                    render_frame(renderer, &frame, presenter, &mut stats)
                };
                sync.finish_render();
                if let Err(err) = outcome {
                    result = Err(err);
                    break;
                }
            }

            sync.request_shutdown();
            match sim_thread.join() {
                Ok(scheduler) => {
                    stats.ticks = scheduler.tick_count();
                    stats.dropped_ticks = scheduler.dropped_ticks();
                }
                Err(_) => {
                    tracing::error!("Simulation thread panicked");
                    if result.is_ok() {
                        result = Err(EngineError::SimulationPanicked);
                    }
                }
            }
            result.map(|()| stats)
        })
    }
}

fn simulate<S: Simulation, C: Clock>(
    sync: &FrameSync<FrameCommands>,
    simulation: &mut S,
    clock: &mut C,
    scheduler: &mut FrameScheduler,
) {
    let _guard = sync.shutdown_guard();
    tracing::debug!("Simulation thread started");

    while !sync.is_shutdown() && !simulation.is_finished() {
        let ticks = scheduler.advance(clock.delta());
        {
            let frame = sync.collecting();
            let mut frame = frame.lock();
            step_simulation(simulation, ticks, &mut frame, &|| sync.is_shutdown());
        }
        if sync.finish_simulation() == SyncOutcome::Shutdown {
            break;
        }
    }
    tracing::debug!("Simulation thread exiting");
}

fn step_simulation<S: Simulation>(
    simulation: &mut S,
    ticks: FrameTicks,
    frame: &mut FrameCommands,
    stop: &dyn Fn() -> bool,
) {
    profile_function!();
    for _ in 0..ticks.ticks {
        if stop() {
            return;
        }
        simulation.update(ticks.step);
    }
    simulation.draw(ticks.alpha, frame);
}

fn render_frame(
    renderer: &mut FrameRenderer,
    frame: &FrameCommands,
    presenter: &mut dyn Presenter,
    stats: &mut RunStats,
) -> Result<(), EngineError> {
    match renderer.render(frame, presenter) {
        Ok(_) => {
            stats.frames += 1;
            Ok(())
        }
        Err(err) if err.is_transient() => {
            tracing::warn!("Skipping frame: {}", err);
            stats.skipped_frames += 1;
            Ok(())
        }
        Err(err) => {
            tracing::error!("Fatal render error: {}", err);
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_starts_at_zero() {
        let mut clock = SystemClock::new();
        assert_eq!(clock.delta(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.delta() >= Duration::from_millis(2));
    }

    #[test]
    fn test_closure_platform() {
        let mut remaining = 2;
        let mut platform = move || {
            remaining -= 1;
            remaining >= 0
        };
        assert!(platform.should_continue());
        assert!(platform.should_continue());
        assert!(!platform.should_continue());
    }
}
