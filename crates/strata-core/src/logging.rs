//! Logging bootstrap built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Default directives: verbose for our crates, quiet for the GPU stack.
pub const DEFAULT_FILTER: &str = "info,strata=debug,strata_render=debug,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `filter` when set. Calling this more than
/// once is harmless; later calls are ignored.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .try_init();
}

/// Install the subscriber with [`DEFAULT_FILTER`].
pub fn init_default() {
    init(DEFAULT_FILTER);
}
