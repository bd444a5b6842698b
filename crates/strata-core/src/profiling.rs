//! Profiling utilities based on the `puffin` crate.
//!
//! With the `profiling` feature disabled the scope macros expand to nothing,
//! so call sites never need their own `cfg`.

#[cfg(feature = "profiling")]
use std::sync::OnceLock;

#[cfg(feature = "profiling")]
pub use puffin::{profile_function, profile_scope};

#[cfg(not(feature = "profiling"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __strata_profile_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "profiling"))]
pub use crate::__strata_profile_noop as profile_function;
#[cfg(not(feature = "profiling"))]
pub use crate::__strata_profile_noop as profile_scope;

/// Default address of the puffin HTTP server.
pub const DEFAULT_PROFILER_ADDR: &str = "0.0.0.0:8585";

#[cfg(feature = "profiling")]
static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Enable scope collection and start the puffin HTTP server on `addr`.
///
/// Failure to bind is logged and profiling stays disabled.
#[cfg(feature = "profiling")]
pub fn init_profiling(addr: &str) {
    match puffin_http::Server::new(addr) {
        Ok(server) => {
            puffin::set_scopes_on(true);
            tracing::info!("Puffin profiler server started on http://{addr}");
            let _ = PROFILING_SERVER.set(server);
        }
        Err(e) => {
            tracing::error!("Failed to start puffin server on {addr}: {e}");
        }
    }
}

#[cfg(not(feature = "profiling"))]
pub fn init_profiling(addr: &str) {
    tracing::warn!("Profiling requested on {addr} but the `profiling` feature is disabled");
}

/// Mark the start of a new frame for the profiler.
#[inline]
pub fn new_frame() {
    #[cfg(feature = "profiling")]
    puffin::GlobalProfiler::lock().new_frame();
}
