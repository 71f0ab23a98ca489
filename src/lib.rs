// VibeVolume Core - Crowd-adaptive volume control engine
// Fuses ambient motion energy and nearby-device density into a bounded
// output volume, steered on its own cadence.

// Module declarations
pub mod api;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod http;
pub mod managers;
pub mod sensing;

// Re-exports for convenience
pub use api::*;

use std::sync::Once;

static LOG_INIT: Once = Once::new();

/// Initialize the global tracing subscriber once.
///
/// Safe to call from multiple entry points; later calls are no-ops.
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_target(false).try_init();
        tracing::debug!("logging initialized");
    });
}
