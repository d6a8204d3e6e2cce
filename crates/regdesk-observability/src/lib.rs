//! Observability for RegDesk loaders.
//!
//! This crate provides:
//! - `init_logging` / `LogConfig` - `tracing` subscriber setup
//! - `TracingObserver` - Logs applied loader settlements
//! - `LoaderMetrics` - Success/failure counters per loader

mod logging;
mod metrics;
mod observer;

pub use logging::*;
pub use metrics::*;
pub use observer::*;
