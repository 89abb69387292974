//! Page-cursor wrapper over the core request handle.
//!
//! [`PaginatedApi`] drives an operation that serves one page of a listing
//! at a time. The wrapper owns the cursor: it builds the [`PageRequest`]
//! for the current page, and after each successful fetch adopts the
//! [`PageInfo`] the backend reported. Navigation guards consult that
//! metadata, so callers cannot walk past either end of the listing.
//!
//! Operations take only the [`PageRequest`]; anything else a listing needs
//! (filters, a search term, an auth token) is captured by the operation
//! closure itself.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{Api, ApiOptions, ErrorCallback, SuccessCallback};
use crate::envelope::{Envelope, Page, PageInfo};
use crate::error::ApiError;
use crate::state::RequestState;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Which slice of the listing an operation should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page to fetch.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
}

/// Construction-time knobs for a [`PaginatedApi`].
pub struct PaginatedOptions<T> {
    /// Rows per page, clamped to at least 1.
    pub page_size: u32,
    /// Page the cursor starts on, clamped to at least 1.
    pub initial_page: u32,
    /// Fetch the initial page as soon as the handle exists.
    pub immediate: bool,
    pub on_success: Option<SuccessCallback<Page<T>>>,
    pub on_error: Option<ErrorCallback>,
    pub scope: Option<CancellationToken>,
}

impl<T> PaginatedOptions<T> {
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn initial_page(mut self, initial_page: u32) -> Self {
        self.initial_page = initial_page;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&Page<T>) + Send + Sync + 'static) -> Self {
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

impl<T> Default for PaginatedOptions<T> {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            initial_page: 1,
            immediate: false,
            on_success: None,
            on_error: None,
            scope: None,
        }
    }
}

/// Handle to a paginated listing.
///
/// Clones share the cursor and the underlying request slot.
pub struct PaginatedApi<T> {
    inner: Api<PageRequest, Page<T>>,
    pagination: Arc<watch::Sender<PageInfo>>,
    page_size: u32,
}

impl<T> Clone for PaginatedApi<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            pagination: Arc::clone(&self.pagination),
            page_size: self.page_size,
        }
    }
}

impl<T> PaginatedApi<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap a page-serving `operation` with default options.
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: Fn(PageRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<Page<T>>, ApiError>> + Send + 'static,
    {
        Self::with_options(operation, PaginatedOptions::default())
    }

    /// Wrap a page-serving `operation` with explicit [`PaginatedOptions`].
    pub fn with_options<F, Fut>(operation: F, options: PaginatedOptions<T>) -> Self
    where
        F: Fn(PageRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<Page<T>>, ApiError>> + Send + 'static,
    {
        let PaginatedOptions {
            page_size,
            initial_page,
            immediate,
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
        let (pagination, _) = watch::channel(PageInfo {
            current_page: initial_page.max(1),
            total_pages: 0,
            total_items: 0,
            has_next_page: false,
            has_prev_page: false,
        });
        let api = Self {
            inner,
            pagination: Arc::new(pagination),
            page_size: page_size.max(1),
        };
        if immediate {
            let handle = api.clone();
            tokio::spawn(async move {
                handle.execute().await;
            });
        }
        api
    }

    /// Fetch the page the cursor is on.
    ///
    /// On success the backend's pagination metadata replaces the local
    /// cursor state. A failed or superseded fetch leaves the metadata as
    /// it was.
    pub async fn execute(&self) -> Option<Page<T>> {
        let request = PageRequest {
            page: self.current_page(),
            limit: self.page_size,
        };
        let page = self.inner.execute(request).await?;
        self.pagination.send_replace(page.pagination);
        Some(page)
    }

    /// Move the cursor to `page` (clamped to at least 1) and fetch it.
    pub async fn go_to_page(&self, page: u32) -> Option<Page<T>> {
        let page = page.max(1);
        self.pagination
            .send_modify(|info| info.current_page = page);
        self.execute().await
    }

    /// Fetch the next page, unless the listing already ended.
    pub async fn next_page(&self) -> Option<Page<T>> {
        let next = {
            let info = self.pagination.borrow();
            if !info.has_next_page {
                return None;
            }
            info.current_page + 1
        };
        self.go_to_page(next).await
    }

    /// Fetch the previous page, unless the cursor is on the first one.
    pub async fn prev_page(&self) -> Option<Page<T>> {
        let prev = {
            let info = self.pagination.borrow();
            if !info.has_prev_page || info.current_page <= 1 {
                return None;
            }
            info.current_page - 1
        };
        self.go_to_page(prev).await
    }

    /// Refetch the current page.
    pub async fn refresh(&self) -> Option<Page<T>> {
        self.execute().await
    }

    /// Snapshot of the cursor and listing metadata.
    pub fn pagination(&self) -> PageInfo {
        *self.pagination.borrow()
    }

    /// Receiver that observes every cursor or metadata change.
    pub fn subscribe_pagination(&self) -> watch::Receiver<PageInfo> {
        self.pagination.subscribe()
    }

    pub fn current_page(&self) -> u32 {
        self.pagination.borrow().current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.borrow().has_next_page
    }

    pub fn has_prev_page(&self) -> bool {
        self.pagination.borrow().has_prev_page
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination.borrow().total_pages
    }

    pub fn total_items(&self) -> u64 {
        self.pagination.borrow().total_items
    }

    /// Rows of the last fetched page, empty before the first fetch.
    pub fn items(&self) -> Vec<T> {
        self.inner
            .data()
            .map(|page| page.data)
            .unwrap_or_default()
    }

    /// Snapshot of the request state for the last fetch.
    pub fn state(&self) -> RequestState<Page<T>> {
        self.inner.state()
    }

    /// Receiver that observes every request state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<Page<T>>> {
        self.inner.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.inner.error()
    }

    pub fn data(&self) -> Option<Page<T>> {
        self.inner.data()
    }

    /// Return the request slot to idle. The cursor stays where it was;
    /// [`refresh`](Self::refresh) fetches that page again.
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Tear down the listing handle and cancel any in-flight fetch.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_shut_down()
    }
}
