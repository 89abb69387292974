//! Submission wrapper over the core request handle.
//!
//! [`FormApi`] is the shape mutations take: no immediate fetch, an explicit
//! [`submit`](FormApi::submit) call per attempt, and a `submitting` flag
//! that is held for exactly the duration of the attempt. The flag is
//! cleared by a drop guard, so every exit path releases it, including a
//! panicking operation and a caller that drops the submit future midway.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{Api, ApiOptions, ErrorCallback, SuccessCallback};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::RequestState;

/// Construction-time knobs for a [`FormApi`].
pub struct FormOptions<T> {
    /// Clear data and error after a successful submit, returning the form
    /// to its pristine state. The payload is still returned to the caller.
    pub reset_on_success: bool,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
    pub scope: Option<CancellationToken>,
}

impl<T> FormOptions<T> {
    pub fn reset_on_success(mut self) -> Self {
        self.reset_on_success = true;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&ApiError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn scope(mut self, scope: CancellationToken) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl<T> Default for FormOptions<T> {
    fn default() -> Self {
        Self {
            reset_on_success: false,
            on_success: None,
            on_error: None,
            scope: None,
        }
    }
}

/// Handle for submitting a form payload `P` that resolves to `T`.
///
/// Clones share the submission slot and the `submitting` flag.
pub struct FormApi<P, T> {
    inner: Api<P, T>,
    submitting: Arc<watch::Sender<bool>>,
    reset_on_success: bool,
}

impl<P, T> Clone for FormApi<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            submitting: Arc::clone(&self.submitting),
            reset_on_success: self.reset_on_success,
        }
    }
}

impl<P, T> FormApi<P, T>
where
    P: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Wrap a submission `operation` with default options.
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<T>, ApiError>> + Send + 'static,
    {
        Self::with_options(operation, FormOptions::default())
    }

    /// Wrap a submission `operation` with explicit [`FormOptions`].
    pub fn with_options<F, Fut>(operation: F, options: FormOptions<T>) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<T>, ApiError>> + Send + 'static,
    {
        let FormOptions {
            reset_on_success,
            on_success,
            on_error,
            scope,
        } = options;
        let inner = Api::with_options(
            operation,
            ApiOptions {
                immediate: None,
                on_success,
                on_error,
                scope,
            },
        );
        let (submitting, _) = watch::channel(false);
        Self {
            inner,
            submitting: Arc::new(submitting),
            reset_on_success,
        }
    }

    /// Submit `payload` and wait for the attempt to settle.
    ///
    /// Holds the `submitting` flag for the duration. A second submit while
    /// one is in flight supersedes it, same as [`Api::execute`]. Returns
    /// the payload on success, `None` otherwise.
    pub async fn submit(&self, payload: P) -> Option<T> {
        if self.inner.is_shut_down() {
            return None;
        }
        let _guard = SubmitGuard {
            submitting: &self.submitting,
        };
        self.submitting.send_replace(true);
        let result = self.inner.execute(payload).await;
        if result.is_some() && self.reset_on_success {
            self.inner.reset();
        }
        result
    }

    /// Whether a submit attempt is currently in flight.
    pub fn is_submitting(&self) -> bool {
        *self.submitting.borrow()
    }

    /// Receiver that observes the `submitting` flag.
    pub fn subscribe_submitting(&self) -> watch::Receiver<bool> {
        self.submitting.subscribe()
    }

    /// Snapshot of the submission state.
    pub fn state(&self) -> RequestState<T> {
        self.inner.state()
    }

    /// Receiver that observes every submission state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.inner.subscribe()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.data()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.inner.error()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }

    /// Return the form to its pristine state.
    pub fn reset(&self) {
        self.inner.reset();
    }

    pub fn set_data(&self, data: Option<T>) {
        self.inner.set_data(data);
    }

    pub fn set_error(&self, error: Option<ApiError>) {
        self.inner.set_error(error);
    }

    /// Tear the form down; later submits are no-ops.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_shut_down()
    }
}

/// Clears the `submitting` flag when the attempt ends, however it ends.
struct SubmitGuard<'a> {
    submitting: &'a watch::Sender<bool>,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.submitting.send_replace(false);
    }
}
