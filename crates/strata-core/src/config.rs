//! Engine configuration.

use crate::logging::DEFAULT_FILTER;

/// How the simulation and render roles are mapped onto OS threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadingMode {
    /// Scheduler, synchronize and submit run sequentially on the calling thread.
    SingleThreaded,
    /// Simulation runs on its own thread; the calling thread renders.
    #[default]
    MultiThreaded,
}

/// Per-kind batch capacity, in records.
///
/// Each drawable kind owns its own capacity; a batch never holds more records
/// than its kind's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCapacities {
    pub sprite: u32,
    pub primitive: u32,
    pub text: u32,
    pub ui: u32,
}

impl Default for BatchCapacities {
    fn default() -> Self {
        Self {
            sprite: 4096,
            primitive: 4096,
            text: 8192,
            ui: 1024,
        }
    }
}

impl BatchCapacities {
    /// Same capacity for every kind. Mostly useful in tests.
    pub const fn uniform(capacity: u32) -> Self {
        Self {
            sprite: capacity,
            primitive: capacity,
            text: capacity,
            ui: capacity,
        }
    }
}

/// Configuration for the Strata engine loop and renderer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub threading: ThreadingMode,
    /// Fixed simulation frequency in Hz; `0` selects variable-step updates.
    pub update_frequency: u32,
    /// Upper bound on fixed ticks fired in a single frame.
    pub max_ticks_per_frame: u32,
    pub batch_capacities: BatchCapacities,
    /// Number of distinct depth layers mapped onto the `[0, 1)` depth range.
    pub depth_layer_count: u32,
    pub log_filter: String,
    /// Address for the puffin HTTP server, `None` to leave profiling off.
    pub profiler_addr: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threading: ThreadingMode::default(),
            update_frequency: 60,
            max_ticks_per_frame: 5,
            batch_capacities: BatchCapacities::default(),
            depth_layer_count: 1 << 16,
            log_filter: DEFAULT_FILTER.to_string(),
            profiler_addr: None,
        }
    }
}

impl EngineConfig {
    pub fn with_threading(mut self, threading: ThreadingMode) -> Self {
        self.threading = threading;
        self
    }

    pub fn with_update_frequency(mut self, hz: u32) -> Self {
        self.update_frequency = hz;
        self
    }

    pub fn with_max_ticks_per_frame(mut self, max: u32) -> Self {
        self.max_ticks_per_frame = max.max(1);
        self
    }

    pub fn with_batch_capacities(mut self, capacities: BatchCapacities) -> Self {
        self.batch_capacities = capacities;
        self
    }

    pub fn with_depth_layer_count(mut self, count: u32) -> Self {
        self.depth_layer_count = count.max(1);
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn with_profiler(mut self, addr: impl Into<String>) -> Self {
        self.profiler_addr = Some(addr.into());
        self
    }

    /// True when fixed-step simulation is configured.
    pub fn is_fixed_step(&self) -> bool {
        self.update_frequency > 0
    }
}
