//! Core request handle.
//!
//! [`Api`] owns one request slot: an async operation plus the observable
//! [`RequestState`] its settlements write. Every [`execute`](Api::execute)
//! call supersedes the previous one. Call starts and settlements serialize
//! on one lock: a starting call claims the next generation, cancels the
//! token of the call it replaces, and marks the slot loading; a settling
//! call may only touch state while it still holds the latest generation.
//! A stale call's outcome is dropped, never applied out of order.
//!
//! Handles are cheap clones of shared state, so a handle can be passed to
//! tasks, wrappers, and callbacks freely; [`shutdown`](Api::shutdown) tears
//! all of them down at once.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::RequestState;

/// Boxed future an operation resolves to.
pub type OperationFuture<T> = BoxFuture<'static, Result<Envelope<T>, ApiError>>;

/// Callback fired with the payload after a successful settlement.
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Callback fired with the error after a failed settlement.
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

type Operation<A, T> = Arc<dyn Fn(A) -> OperationFuture<T> + Send + Sync>;

/// Construction-time knobs for an [`Api`] handle.
pub struct ApiOptions<A, T> {
    /// Arguments to execute with as soon as the handle exists.
    pub immediate: Option<A>,
    /// Fired after data lands from a successful request.
    pub on_success: Option<SuccessCallback<T>>,
    /// Fired after an error is recorded. Cancellation does not fire it.
    pub on_error: Option<ErrorCallback>,
    /// Parent scope for the handle's lifetime. Cancelling the scope shuts
    /// the handle down exactly like [`Api::shutdown`].
    pub scope: Option<CancellationToken>,
}

impl<A, T> ApiOptions<A, T> {
    pub fn immediate(mut self, args: A) -> Self {
        self.immediate = Some(args);
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

impl<A, T> Default for ApiOptions<A, T> {
    fn default() -> Self {
        Self {
            immediate: None,
            on_success: None,
            on_error: None,
            scope: None,
        }
    }
}

/// The request a slot currently has in flight.
struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Request bookkeeping. Guarded by one lock so call starts, settlements,
/// and shutdown serialize; every request-path state write happens inside
/// it.
struct Requests {
    /// Generation of the most recently issued call; only its settlement
    /// may write state.
    latest: u64,
    /// The call currently in flight, if any.
    in_flight: Option<InFlight>,
}

struct Shared<A, T> {
    operation: Operation<A, T>,
    state: watch::Sender<RequestState<T>>,
    requests: Mutex<Requests>,
    lifecycle: CancellationToken,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

/// Handle to one request slot.
///
/// Cloning shares the slot; all clones observe the same state and supersede
/// each other's in-flight requests.
pub struct Api<A, T> {
    shared: Arc<Shared<A, T>>,
}

impl<A, T> Clone for Api<A, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, T> Api<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `operation` in a fresh slot with default options.
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<T>, ApiError>> + Send + 'static,
    {
        Self::with_options(operation, ApiOptions::default())
    }

    /// Wrap `operation` with explicit [`ApiOptions`].
    pub fn with_options<F, Fut>(operation: F, options: ApiOptions<A, T>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<T>, ApiError>> + Send + 'static,
    {
        let ApiOptions {
            immediate,
            on_success,
            on_error,
            scope,
        } = options;
        let lifecycle = match scope {
            Some(scope) => scope.child_token(),
            None => CancellationToken::new(),
        };
        let (state, _) = watch::channel(RequestState::idle());
        let api = Self {
            shared: Arc::new(Shared {
                operation: Arc::new(move |args| operation(args).boxed()),
                state,
                requests: Mutex::new(Requests {
                    latest: 0,
                    in_flight: None,
                }),
                lifecycle,
                on_success,
                on_error,
            }),
        };
        if let Some(args) = immediate {
            let handle = api.clone();
            tokio::spawn(async move {
                handle.execute(args).await;
            });
        }
        api
    }

    /// Run the operation with `args`.
    ///
    /// Marks the slot loading, clears any previous error, and races the
    /// operation against cancellation. Returns the payload when this call
    /// settled successfully and was still the latest; `None` on failure,
    /// supersession, or teardown. The state channel carries the same
    /// outcome, so callers may rely on either.
    ///
    /// Dropping the future mid-await abandons the call: the operation is
    /// dropped with it, and `loading` clears unless a newer call has
    /// claimed the slot.
    pub async fn execute(&self, args: A) -> Option<T> {
        let Some((generation, token)) = self.begin() else {
            return None;
        };
        let mut guard = ExecuteGuard {
            api: self,
            generation,
            armed: true,
        };
        let outcome = tokio::select! {
            _ = token.cancelled() => Err(ApiError::Cancelled),
            outcome = (self.shared.operation)(args) => outcome,
        };
        guard.disarm();
        self.settle(generation, outcome)
    }

    /// Claim the next generation, cancel the superseded request, and mark
    /// the slot loading, all under the request lock. Declines if the slot
    /// is shut down.
    fn begin(&self) -> Option<(u64, CancellationToken)> {
        let mut requests = self.shared.requests.lock().unwrap();
        if self.shared.lifecycle.is_cancelled() {
            return None;
        }
        requests.latest += 1;
        let generation = requests.latest;
        tracing::debug!(generation, "request issued");
        let token = self.shared.lifecycle.child_token();
        let replaced = requests.in_flight.replace(InFlight {
            generation,
            token: token.clone(),
        });
        if let Some(previous) = replaced {
            tracing::debug!(
                superseded = previous.generation,
                by = generation,
                "cancelling in-flight request"
            );
            previous.token.cancel();
        }
        self.shared.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        Some((generation, token))
    }

    /// Apply a settled outcome, unless it lost the race.
    ///
    /// The checks and the state write share the request lock, so a stale
    /// call cannot slip its outcome between a newer call's start and
    /// settlement. Callbacks fire after the lock is released.
    fn settle(&self, generation: u64, outcome: Result<Envelope<T>, ApiError>) -> Option<T> {
        enum Settled<T> {
            Data(T),
            Failed(ApiError),
            Quiet,
        }

        let settled = {
            let mut requests = self.shared.requests.lock().unwrap();
            if requests
                .in_flight
                .as_ref()
                .is_some_and(|current| current.generation == generation)
            {
                requests.in_flight = None;
            }
            if self.shared.lifecycle.is_cancelled() {
                tracing::debug!(generation, "request settled after shutdown, dropping result");
                return None;
            }
            if requests.latest != generation {
                tracing::debug!(generation, "request superseded, dropping result");
                return None;
            }
            match outcome {
                Ok(Envelope {
                    success: true,
                    data: Some(data),
                    ..
                }) => {
                    let written = data.clone();
                    self.shared.state.send_modify(move |state| {
                        state.data = Some(written);
                        state.loading = false;
                        state.error = None;
                    });
                    Settled::Data(data)
                }
                Ok(envelope) => Settled::Failed(self.write_error(
                    ApiError::business(envelope.message.unwrap_or_default()),
                )),
                Err(error) if error.is_cancelled() => {
                    // Cancelled while still the latest request. Stop
                    // loading; data and error keep their previous values.
                    self.shared.state.send_modify(|state| state.loading = false);
                    Settled::Quiet
                }
                Err(ApiError::Transport(message)) => {
                    // Operations may surface transport failures with an
                    // empty message; normalize those to the default.
                    Settled::Failed(self.write_error(ApiError::transport(message)))
                }
                Err(error) => Settled::Failed(self.write_error(error)),
            }
        };
        match settled {
            Settled::Data(data) => {
                if let Some(on_success) = &self.shared.on_success {
                    on_success(&data);
                }
                Some(data)
            }
            Settled::Failed(error) => {
                if let Some(on_error) = &self.shared.on_error {
                    on_error(&error);
                }
                None
            }
            Settled::Quiet => None,
        }
    }

    /// Record `error` on state. Caller holds the request lock.
    fn write_error(&self, error: ApiError) -> ApiError {
        tracing::debug!(%error, "request settled with error");
        let written = error.clone();
        self.shared.state.send_modify(move |state| {
            state.loading = false;
            state.error = Some(written);
        });
        error
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState<T> {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.shared.state.subscribe()
    }

    pub fn data(&self) -> Option<T> {
        self.shared.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.shared.state.borrow().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    /// Return the slot to idle: no data, not loading, no error.
    ///
    /// Does not cancel an in-flight request; if one is running, its
    /// settlement still applies afterwards.
    pub fn reset(&self) {
        self.shared.state.send_replace(RequestState::idle());
    }

    /// Overwrite the data slot without fetching, for local updates that a
    /// refetch would be too heavy for.
    pub fn set_data(&self, data: Option<T>) {
        self.shared.state.send_modify(move |state| state.data = data);
    }

    /// Overwrite the error slot without fetching.
    pub fn set_error(&self, error: Option<ApiError>) {
        self.shared.state.send_modify(move |state| state.error = error);
    }

    /// Tear the slot down: cancels any in-flight request, suppresses every
    /// pending settlement, and makes later [`execute`](Self::execute) calls
    /// no-ops. Idempotent.
    pub fn shutdown(&self) {
        // Cancel while holding the request lock so no call can start or
        // settle into state once the cancellation is visible.
        let _requests = self.shared.requests.lock().unwrap();
        if !self.shared.lifecycle.is_cancelled() {
            tracing::debug!("shutting down request slot");
        }
        self.shared.lifecycle.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lifecycle.is_cancelled()
    }
}

/// Clears `loading` when a call's future is dropped before it settles.
///
/// Disarmed at settlement. Fires only while its call is still the
/// latest, so dropping a superseded call cannot touch the newer call's
/// state.
struct ExecuteGuard<'a, A, T> {
    api: &'a Api<A, T>,
    generation: u64,
    armed: bool,
}

impl<A, T> ExecuteGuard<'_, A, T> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<A, T> Drop for ExecuteGuard<'_, A, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut requests = self.api.shared.requests.lock().unwrap();
        if requests
            .in_flight
            .as_ref()
            .is_some_and(|current| current.generation == self.generation)
        {
            requests.in_flight = None;
        }
        if self.api.shared.lifecycle.is_cancelled()
            || requests.latest != self.generation
        {
            return;
        }
        tracing::debug!(
            generation = self.generation,
            "request dropped before settling"
        );
        self.api
            .shared
            .state
            .send_modify(|state| state.loading = false);
    }
}
