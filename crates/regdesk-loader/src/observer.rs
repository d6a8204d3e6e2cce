//! Success and error hooks.

use std::sync::Arc;

use crate::error::LoadError;

/// Observer for settled load attempts.
///
/// Only settlements that are applied to state are reported. Cancelled and
/// superseded attempts are never reported.
pub trait LoaderObserver<T>: Send + Sync {
    /// Called after a successful settlement has been applied.
    fn on_success(&self, _data: &T) {}

    /// Called after a failed settlement has been applied.
    fn on_error(&self, _error: &LoadError) {}
}

impl<T, O> LoaderObserver<T> for Arc<O>
where
    O: LoaderObserver<T> + ?Sized,
{
    fn on_success(&self, data: &T) {
        (**self).on_success(data);
    }

    fn on_error(&self, error: &LoadError) {
        (**self).on_error(error);
    }
}

type SuccessHook<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&LoadError) + Send + Sync>;

/// Observer built from closures.
pub struct Hooks<T> {
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook>,
}

impl<T> Hooks<T> {
    /// Create hooks that do nothing.
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }

    /// Set the success hook.
    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Set the error hook.
    pub fn on_error(mut self, hook: impl Fn(&LoadError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LoaderObserver<T> for Hooks<T> {
    fn on_success(&self, data: &T) {
        if let Some(hook) = &self.on_success {
            hook(data);
        }
    }

    fn on_error(&self, error: &LoadError) {
        if let Some(hook) = &self.on_error {
            hook(error);
        }
    }
}
