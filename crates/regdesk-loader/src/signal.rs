//! Per-attempt cancellation signal.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::LoadError;

/// Cancellation signal handed to a fetch operation.
///
/// Each load attempt gets its own signal, which is set at most once: when the
/// attempt is superseded, cancelled, torn down, or runs past its deadline.
///
/// Cancellation is cooperative. The loader never applies the settlement of a
/// cancelled attempt, but only the fetch can stop its own network work. A
/// fetch that never looks at its signal keeps running until it finishes on
/// its own, and its result is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// Create a signal that is not yet set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Setting it again has no effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check whether the signal has been set.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with [`LoadError::Cancelled`] if the signal is set.
    ///
    /// Intended for dispatch points: call it right before sending a request.
    pub fn check(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wait until the signal is set.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Run `fut` until it completes or the signal is set, whichever is first.
    ///
    /// `fut` is dropped as soon as the signal wins.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, LoadError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(LoadError::Cancelled),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_cancel_is_sticky() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
        assert!(signal.check().is_ok());

        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.check(), Err(LoadError::Cancelled));
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancelSignal::new();
        let observer = signal.clone();
        signal.cancel();
        assert!(observer.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_completes() {
        let signal = CancelSignal::new();
        let result = signal.guard(async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_cancelled_mid_flight() {
        let signal = CancelSignal::new();
        let canceller = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        let result = signal
            .guard(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            })
            .await;
        assert_eq!(result, Err(LoadError::Cancelled));
    }
}
