//! Request state handles for dashboard API calls.
//!
//! This crate provides three handles around async API operations. [`Api`]
//! is the core: it runs an operation, tracks `{data, loading, error}` in a
//! watch channel, and guarantees that when calls overlap only the latest
//! one settles into state. [`PaginatedApi`] adds a page cursor over listing
//! endpoints, and [`FormApi`] adds a `submitting` flag and reset-on-success
//! for mutations.
//!
//! Operations resolve to the backend's response envelope
//! `{success, data, message, errors}`; the handles unwrap it and map every
//! failure into the [`ApiError`] taxonomy.
//!
//! ```
//! use api_state::{Api, Envelope};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lookup = Api::new(|id: u32| async move {
//!     Ok(Envelope::success(format!("course {id}")))
//! });
//!
//! let title = lookup.execute(7).await;
//! assert_eq!(title.as_deref(), Some("course 7"));
//! assert!(!lookup.state().loading);
//! # }
//! ```

pub mod api;
pub mod envelope;
pub mod error;
pub mod form;
pub mod paginated;
pub mod state;

// Re-export the handles and their wire contract
pub use api::{Api, ApiOptions, ErrorCallback, OperationFuture, SuccessCallback};
pub use envelope::{Envelope, Page, PageInfo};
pub use error::{ApiError, DEFAULT_BUSINESS_MESSAGE, DEFAULT_TRANSPORT_MESSAGE};
pub use form::{FormApi, FormOptions};
pub use paginated::{DEFAULT_PAGE_SIZE, PageRequest, PaginatedApi, PaginatedOptions};
pub use state::RequestState;
