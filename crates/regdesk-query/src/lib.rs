//! Query adapter for the registration data service.
//!
//! The data service answers every query with a `{ data, error }` envelope.
//! This crate turns that envelope into the plain result-or-error shape a
//! [`GuardedLoader`](regdesk_loader::GuardedLoader) fetch operation returns:
//! - `QueryResponse` / `QueryError` - The envelope
//! - `dispatch` - Signal-aware query execution
//! - `AdapterError` - Envelope decoding failures
//!
//! # Example
//!
//! ```rust,ignore
//! use regdesk_loader::{CancelSignal, GuardedLoader};
//! use regdesk_query::dispatch;
//!
//! let loader = GuardedLoader::builder(move |signal: CancelSignal| {
//!     let client = client.clone();
//!     async move { dispatch(&signal, || client.select_participants()).await }
//! })
//! .build();
//! ```

mod dispatch;
mod envelope;
mod error;

pub use dispatch::*;
pub use envelope::*;
pub use error::*;
