//! Logging observer for loaders.

use regdesk_loader::{LoadError, LoaderObserver};

/// Logs every applied settlement of a loader.
///
/// Successes go to `info`, failures to `warn`. Cancellations never reach
/// observers and are therefore never logged here.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    /// Create an observer tagging events with `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Get the label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> LoaderObserver<T> for TracingObserver {
    fn on_success(&self, _data: &T) {
        tracing::info!(loader = %self.label, "data refreshed");
    }

    fn on_error(&self, error: &LoadError) {
        tracing::warn!(
            loader = %self.label,
            kind = %error.kind(),
            user_message = %error.user_message(),
            "data refresh failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    /// Shared buffer the test subscriber writes into.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_success_logged_at_info() {
        let observer = TracingObserver::new("participants");
        let logs = capture(|| LoaderObserver::<u32>::on_success(&observer, &3));

        assert!(logs.contains("INFO"));
        assert!(logs.contains("data refreshed"));
        assert!(logs.contains("loader=participants"));
    }

    #[test]
    fn test_failure_logged_at_warn_with_kind() {
        let observer = TracingObserver::new("payments");
        let error = LoadError::Transport("Failed to fetch".into());
        let logs = capture(|| LoaderObserver::<u32>::on_error(&observer, &error));

        assert!(logs.contains("WARN"));
        assert!(logs.contains("data refresh failed"));
        assert!(logs.contains("loader=payments"));
        assert!(logs.contains("kind=transport"));
    }

    #[test]
    fn test_label() {
        assert_eq!(TracingObserver::new("rooms").label(), "rooms");
    }
}
