//! Scripted operations for driving the request handles.
//!
//! The handles accept any async operation, so the tests script them:
//! - [`MockOperation`] plays back a fixed sequence of outcomes and records
//!   the arguments of every call.
//! - [`Gate`] holds a scripted step in flight until the test releases it,
//!   which is how supersession and teardown races are made deterministic.
//! - [`PagedSource`] serves pages out of an in-memory listing with the same
//!   metadata the backend would report.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use api_state::{ApiError, Envelope, OperationFuture, Page, PageInfo, PageRequest};
use futures::FutureExt;
use tokio::sync::watch;

/// Latch a scripted step waits on before resolving.
pub struct Gate {
    open: Arc<watch::Sender<bool>>,
}

impl Clone for Gate {
    fn clone(&self) -> Self {
        Self {
            open: Arc::clone(&self.open),
        }
    }
}

impl Gate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self {
            open: Arc::new(open),
        }
    }

    /// Release everything waiting on the gate.
    pub fn open(&self) {
        self.open.send_replace(true);
    }

    /// Wait until the gate opens.
    pub async fn opened(&self) {
        let mut rx = self.open.subscribe();
        // Sender gone means the test is over; treat as open.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments recorded from every call an operation served.
pub struct CallLog<C> {
    calls: Arc<Mutex<Vec<C>>>,
}

impl<C> Clone for CallLog<C> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<C> Default for CallLog<C> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<C> CallLog<C> {
    pub fn record(&self, call: C) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<C>
    where
        C: Clone,
    {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

struct Step<T> {
    outcome: Result<Envelope<T>, ApiError>,
    gate: Option<Gate>,
}

/// Operation that plays back a script of outcomes, one per call.
///
/// Build the script with the `then_*` methods, then convert with
/// [`into_operation`](Self::into_operation) and hand the result to a
/// handle. Calls past the end of the script settle as transport errors so
/// an over-fetching handle fails the test loudly instead of hanging.
pub struct MockOperation<A, T> {
    steps: Arc<Mutex<VecDeque<Step<T>>>>,
    log: CallLog<A>,
}

impl<A, T> Clone for MockOperation<A, T> {
    fn clone(&self) -> Self {
        Self {
            steps: Arc::clone(&self.steps),
            log: self.log.clone(),
        }
    }
}

impl<A, T> Default for MockOperation<A, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, T> MockOperation<A, T> {
    pub fn new() -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::new())),
            log: CallLog::default(),
        }
    }

    pub fn then_envelope(self, envelope: Envelope<T>) -> Self {
        self.push(Ok(envelope), None);
        self
    }

    pub fn then_success(self, data: T) -> Self {
        self.then_envelope(Envelope::success(data))
    }

    pub fn then_failure(self, message: &str) -> Self {
        self.then_envelope(Envelope::failure(message))
    }

    pub fn then_transport(self, message: &str) -> Self {
        self.then_error(ApiError::transport(message))
    }

    pub fn then_cancelled(self) -> Self {
        self.then_error(ApiError::Cancelled)
    }

    /// Fail the next call with `error` exactly as given, bypassing the
    /// [`ApiError`] constructor normalization.
    pub fn then_error(self, error: ApiError) -> Self {
        self.push(Err(error), None);
        self
    }

    /// Make the most recent step wait on `gate` before resolving.
    pub fn gated(self, gate: &Gate) -> Self {
        if let Some(step) = self.steps.lock().unwrap().back_mut() {
            step.gate = Some(gate.clone());
        }
        self
    }

    fn push(&self, outcome: Result<Envelope<T>, ApiError>, gate: Option<Gate>) {
        self.steps.lock().unwrap().push_back(Step { outcome, gate });
    }

    /// Handle on the call log, valid after `into_operation` consumed self.
    pub fn log(&self) -> CallLog<A> {
        self.log.clone()
    }

    pub fn into_operation(self) -> impl Fn(A) -> OperationFuture<T> + Send + Sync
    where
        A: Send + 'static,
        T: Send + 'static,
    {
        move |args| {
            self.log.record(args);
            let step = self.steps.lock().unwrap().pop_front();
            async move {
                match step {
                    Some(Step { outcome, gate }) => {
                        if let Some(gate) = gate {
                            gate.opened().await;
                        }
                        outcome
                    }
                    None => {
                        tracing::warn!("mock operation called past its script");
                        Err(ApiError::transport("mock script exhausted"))
                    }
                }
            }
            .boxed()
        }
    }
}

/// In-memory listing that serves whatever page is asked of it.
pub struct PagedSource<T> {
    items: Arc<Vec<T>>,
    log: CallLog<PageRequest>,
}

impl<T> Clone for PagedSource<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            log: self.log.clone(),
        }
    }
}

impl<T> PagedSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
            log: CallLog::default(),
        }
    }

    pub fn log(&self) -> CallLog<PageRequest> {
        self.log.clone()
    }

    pub fn into_operation(
        self,
    ) -> impl Fn(PageRequest) -> OperationFuture<Page<T>> + Send + Sync
    where
        T: Clone + Send + Sync + 'static,
    {
        move |request| {
            self.log.record(request);
            let page = page_of(&self.items, request);
            tracing::debug!(
                page = request.page,
                limit = request.limit,
                rows = page.data.len(),
                "serving page"
            );
            async move { Ok(Envelope::success(page)) }.boxed()
        }
    }
}

/// Slice `items` into the requested page, with the metadata the backend
/// would report for a listing of this size.
pub fn page_of<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let limit = request.limit.max(1) as usize;
    let page = request.page.max(1);
    let total_pages = items.len().div_ceil(limit) as u32;
    let start = (page as usize - 1).saturating_mul(limit);
    let data: Vec<T> = items.iter().skip(start).take(limit).cloned().collect();
    Page {
        data,
        pagination: PageInfo {
            current_page: page,
            total_pages,
            total_items: items.len() as u64,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        },
    }
}
