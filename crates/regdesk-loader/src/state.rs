//! Observable loader state.

use serde::Serialize;

use crate::error::LoadError;

/// What a consumer should render for a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderStatus {
    /// Nothing loaded and nothing in flight.
    Idle,
    /// An attempt is in flight.
    Loading,
    /// Data from the latest attempt.
    Ready,
    /// The latest attempt failed and there is no data to fall back to.
    Failed,
    /// The latest attempt failed; data from an earlier success is shown.
    Stale,
}

/// Data, in-flight status, error and staleness of one loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderState<T> {
    /// Last successfully loaded (or directly set) value.
    pub data: Option<T>,
    /// Whether the current attempt has not settled yet.
    pub loading: bool,
    /// Failure of the latest settled attempt.
    pub error: Option<LoadError>,
    /// Set after a failed settlement, cleared by the next success.
    pub is_stale: bool,
}

impl<T> Default for LoaderState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            is_stale: false,
        }
    }
}

impl<T> LoaderState<T> {
    /// User-facing message for the current error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(LoadError::user_message)
    }

    /// Check whether data is available.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Derive what a consumer should render.
    pub fn status(&self) -> LoaderStatus {
        if self.loading {
            return LoaderStatus::Loading;
        }
        match (&self.data, &self.error) {
            (Some(_), Some(_)) => LoaderStatus::Stale,
            (None, Some(_)) => LoaderStatus::Failed,
            (Some(_), None) => LoaderStatus::Ready,
            (None, None) => LoaderStatus::Idle,
        }
    }

    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self, data: T) {
        self.data = Some(data);
        self.error = None;
        self.is_stale = false;
        self.loading = false;
    }

    pub(crate) fn fail(&mut self, error: LoadError) {
        self.error = Some(error);
        self.is_stale = true;
        self.loading = false;
    }

    pub(crate) fn abandon(&mut self) {
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state: LoaderState<u32> = LoaderState::default();
        assert_eq!(state.status(), LoaderStatus::Idle);
        assert!(!state.has_data());
        assert!(state.error_message().is_none());
    }

    #[test]
    fn test_begin_clears_error_keeps_stale_data() {
        let mut state = LoaderState::default();
        state.succeed(1);
        state.fail(LoadError::Transport("offline".into()));
        state.begin();

        assert!(state.loading);
        assert!(state.error.is_none());
        assert!(state.is_stale);
        assert_eq!(state.data, Some(1));
    }

    #[test]
    fn test_fail_then_succeed_clears_stale() {
        let mut state = LoaderState::default();
        state.fail(LoadError::DeadlineExceeded(Duration::from_millis(10)));
        assert!(state.is_stale);
        assert_eq!(state.status(), LoaderStatus::Failed);

        state.succeed("fresh");
        assert!(!state.is_stale);
        assert_eq!(state.status(), LoaderStatus::Ready);
    }

    #[test]
    fn test_stale_status_with_data() {
        let mut state = LoaderState::default();
        state.succeed(vec![1, 2]);
        state.fail(LoadError::Operation("rejected".into()));
        assert_eq!(state.status(), LoaderStatus::Stale);
        assert_eq!(state.error_message().as_deref(), Some("rejected"));
    }

    #[test]
    fn test_abandon_keeps_data_and_error() {
        let mut state = LoaderState::default();
        state.succeed(3);
        state.begin();
        state.abandon();
        assert!(!state.loading);
        assert_eq!(state.data, Some(3));
        assert!(state.error.is_none());
    }
}
