//! The `{ data, error }` response envelope.

use std::fmt;

use regdesk_loader::LoadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Error object reported by the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    /// Human-readable message.
    pub message: String,
    /// Backend error code (e.g. `23505`, `PGRST116`). Empty for client-side failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Additional detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Suggested fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl QueryError {
    /// Create an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }

    /// Set the backend error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the detail text.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the hint text.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Check whether the backend produced this error.
    pub fn has_code(&self) -> bool {
        self.code.as_deref().is_some_and(|code| !code.trim().is_empty())
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) if !code.is_empty() => write!(f, "{} ({})", self.message, code),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl From<QueryError> for LoadError {
    /// Errors carrying a backend code were produced by the service and are
    /// passed through; the rest are classified by message.
    fn from(e: QueryError) -> Self {
        if e.has_code() {
            LoadError::Operation(e.message)
        } else {
            LoadError::from_message(e.message)
        }
    }
}

/// Response envelope returned by every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    /// Result rows, absent on error.
    pub data: Option<T>,
    /// Failure, absent on success.
    pub error: Option<QueryError>,
    /// Row count when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl<T> QueryResponse<T> {
    /// Successful response.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            count: None,
        }
    }

    /// Failed response.
    pub fn err(error: QueryError) -> Self {
        Self {
            data: None,
            error: Some(error),
            count: None,
        }
    }

    /// Set the row count.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Unwrap into the data or a classified error.
    ///
    /// A response without data and without error is an operation failure.
    pub fn into_result(self) -> Result<T, LoadError> {
        match self.into_optional()? {
            Some(data) => Ok(data),
            None => Err(LoadError::Operation("No data returned".to_string())),
        }
    }

    /// Unwrap into optional data or a classified error.
    ///
    /// For single-row lookups where "no row" is a valid answer.
    pub fn into_optional(self) -> Result<Option<T>, LoadError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        Ok(self.data)
    }
}

impl<T: DeserializeOwned> QueryResponse<T> {
    /// Decode an envelope from a JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self, AdapterError> {
        Ok(serde_json::from_slice(body)?)
    }
}

#[cfg(test)]
mod tests {
    use regdesk_loader::LoadErrorKind;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Participant {
        id: u32,
        name: String,
    }

    #[test]
    fn test_decode_success_envelope() {
        let body = br#"{"data": [{"id": 1, "name": "Awa"}], "error": null}"#;
        let resp: QueryResponse<Vec<Participant>> = QueryResponse::from_json(body).unwrap();
        let rows = resp.into_result().unwrap();
        assert_eq!(
            rows,
            vec![Participant {
                id: 1,
                name: "Awa".into()
            }]
        );
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = br#"{
            "data": null,
            "error": {"message": "permission denied for table payments", "code": "42501", "details": null, "hint": null}
        }"#;
        let resp: QueryResponse<Vec<Participant>> = QueryResponse::from_json(body).unwrap();
        assert_eq!(
            resp.into_result(),
            Err(LoadError::Operation(
                "permission denied for table payments".into()
            ))
        );
    }

    #[test]
    fn test_decode_missing_fields() {
        let resp: QueryResponse<u32> = QueryResponse::from_json(br#"{"count": 4}"#).unwrap();
        assert_eq!(resp.count, Some(4));
        assert_eq!(resp.into_optional(), Ok(None));
    }

    #[test]
    fn test_decode_invalid_body() {
        let result: Result<QueryResponse<u32>, _> = QueryResponse::from_json(b"<html>");
        let err = LoadError::from(result.unwrap_err());
        assert_eq!(err.kind(), LoadErrorKind::Operation);
    }

    #[test]
    fn test_client_side_failure_is_transport() {
        let resp: QueryResponse<u32> =
            QueryResponse::err(QueryError::new("TypeError: Failed to fetch"));
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Transport);
    }

    #[test]
    fn test_coded_error_is_operation_even_if_network_worded() {
        let error = QueryError::new("network error in upstream function").with_code("P0001");
        let err = LoadError::from(error);
        assert_eq!(err.kind(), LoadErrorKind::Operation);
    }

    #[test]
    fn test_empty_response_is_operation_failure() {
        let resp: QueryResponse<u32> = QueryResponse {
            data: None,
            error: None,
            count: None,
        };
        assert_eq!(
            resp.into_result(),
            Err(LoadError::Operation("No data returned".into()))
        );
    }

    #[test]
    fn test_error_wins_over_data() {
        let resp = QueryResponse {
            data: Some(1u32),
            error: Some(QueryError::new("row-level security violation").with_code("42501")),
            count: None,
        };
        assert!(resp.into_result().is_err());
    }

    #[test]
    fn test_query_error_display() {
        let error = QueryError::new("duplicate key").with_code("23505");
        assert_eq!(error.to_string(), "duplicate key (23505)");
        assert_eq!(QueryError::new("offline").to_string(), "offline");
    }
}
