//! Guarded data loading for dashboard views.
//!
//! This crate provides:
//! - `GuardedLoader` - Cancellable, deduplicated, timeout-bounded loads
//! - `LoaderState` - Data, in-flight status, error and staleness
//! - `LoaderConfig` - Timeout and auto-load settings
//! - `CancelSignal` - Per-attempt cooperative cancellation
//! - `LoaderObserver` - Success/error hooks
//! - `LoadError` - Failure taxonomy with user-facing messages
//!
//! # Example
//!
//! ```rust,ignore
//! use regdesk_loader::{CancelSignal, GuardedLoader, LoadError};
//!
//! let loader = GuardedLoader::builder(|signal: CancelSignal| async move {
//!     signal.check()?;
//!     fetch_participants().await.map_err(LoadError::from_message)
//! })
//! .label("participants")
//! .build();
//!
//! // Refresh button
//! loader.reload();
//! let state = loader.settled().await;
//!
//! // Fetch that follows the selected event
//! let roster = GuardedLoader::keyed(event_id, |signal: CancelSignal, event_id: u32| async move {
//!     signal.check()?;
//!     fetch_roster(event_id).await.map_err(LoadError::from_message)
//! })
//! .build();
//! roster.set_dependency_key(next_event_id);
//! ```

mod config;
mod error;
mod loader;
mod observer;
mod signal;
mod state;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use observer::*;
pub use signal::*;
pub use state::*;
