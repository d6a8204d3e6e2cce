//! Signal-aware query execution.

use std::future::Future;

use regdesk_loader::{CancelSignal, LoadError};

use crate::envelope::QueryResponse;

/// Run a query for a loader attempt.
///
/// The query is not even constructed when `signal` is already set at
/// dispatch time. Once dispatched, the query is dropped as soon as the signal
/// is set.
pub async fn dispatch<T, F, Q>(signal: &CancelSignal, query: Q) -> Result<T, LoadError>
where
    Q: FnOnce() -> F,
    F: Future<Output = QueryResponse<T>>,
{
    signal.check()?;
    signal.guard(query()).await?.into_result()
}

/// Like [`dispatch`], for queries where an empty answer is valid.
pub async fn dispatch_optional<T, F, Q>(
    signal: &CancelSignal,
    query: Q,
) -> Result<Option<T>, LoadError>
where
    Q: FnOnce() -> F,
    F: Future<Output = QueryResponse<T>>,
{
    signal.check()?;
    signal.guard(query()).await?.into_optional()
}
