//! Simulated registration backend.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use regdesk_query::{AdapterError, QueryResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// How simulated queries fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Never fail.
    #[default]
    None,
    /// Fail like an unreachable server.
    Transport,
    /// Fail like a rejected query.
    Operation,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Transport => write!(f, "transport"),
            Self::Operation => write!(f, "operation"),
        }
    }
}

/// Registered participant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: u32,
    pub name: String,
    pub dormitory: Option<String>,
    pub paid: bool,
}

/// Backend answering participant queries with the service's JSON envelope.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    latency: Duration,
    rows: usize,
    failure: FailureMode,
    fail_after: Option<usize>,
    queries: Arc<AtomicUsize>,
}

impl SimulatedBackend {
    /// Create a backend.
    pub fn new(
        latency: Duration,
        rows: usize,
        failure: FailureMode,
        fail_after: Option<usize>,
    ) -> Self {
        Self {
            latency,
            rows,
            failure,
            fail_after,
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of queries received so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Select all participants.
    pub async fn select_participants(&self) -> QueryResponse<Vec<Participant>> {
        let n = self.queries.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        let body = self.respond(n);
        QueryResponse::from_json(body.as_bytes()).unwrap_or_else(|e: AdapterError| {
            QueryResponse::err(regdesk_query::QueryError::new(e.to_string()))
        })
    }

    /// Render the JSON body for the `n`th query.
    fn respond(&self, n: usize) -> String {
        let failing = match self.fail_after {
            Some(after) => n >= after,
            None => true,
        };

        let body = match self.failure {
            FailureMode::Transport if failing => json!({
                "data": null,
                "error": {"message": "TypeError: Failed to fetch", "code": ""},
            }),
            FailureMode::Operation if failing => json!({
                "data": null,
                "error": {
                    "message": "permission denied for table participants",
                    "code": "42501",
                    "hint": "Check the row-level security policies",
                },
            }),
            _ => json!({ "data": self.rows(n), "error": null }),
        };
        body.to_string()
    }

    fn rows(&self, n: usize) -> Vec<Participant> {
        (0..self.rows)
            .map(|i| Participant {
                id: i as u32 + 1,
                name: format!("Participant {}", i + 1),
                dormitory: (i % 2 == 0).then(|| format!("Dorm {}", (b'A' + (i % 3) as u8) as char)),
                paid: (i + n) % 3 != 0,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use regdesk_loader::{LoadError, LoadErrorKind};

    use super::*;

    fn backend(failure: FailureMode, fail_after: Option<usize>) -> SimulatedBackend {
        SimulatedBackend::new(Duration::from_millis(10), 3, failure, fail_after)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_returned() {
        let backend = backend(FailureMode::None, None);
        let rows = backend.select_participants().await.into_result().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].dormitory.as_deref(), Some("Dorm A"));
        assert_eq!(backend.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure() {
        let backend = backend(FailureMode::Transport, None);
        let err = backend.select_participants().await.into_result().unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Transport);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_failure_after_first_query() {
        let backend = backend(FailureMode::Operation, Some(1));
        assert!(backend.select_participants().await.into_result().is_ok());

        let err = backend.select_participants().await.into_result().unwrap_err();
        assert_eq!(
            err,
            LoadError::Operation("permission denied for table participants".into())
        );
    }
}
