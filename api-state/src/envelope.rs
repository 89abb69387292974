//! The response envelope every operation resolves to.
//!
//! The backend wraps every payload in `{success, data, message, errors}`;
//! list endpoints nest a page of rows plus pagination metadata inside
//! `data`. The request core unwraps these shapes, so operations stay thin:
//! issue the call, deserialize the envelope, return it.

use serde::{Deserialize, Serialize};

/// Outcome wrapper returned by every API operation.
///
/// `data`, `message`, and `errors` all default on deserialization so the
/// partial bodies the backend emits (success without a message, failures
/// without field errors) parse cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload, present on success.
    // the path form keeps the derive from requiring `T: Default`
    #[serde(
        default = "Option::default",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<T>,
    /// Human-readable outcome message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Field-level validation messages, when the backend produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    /// Failed envelope with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }
}

/// One page of a listing, as nested inside a paginated envelope's `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows of the requested page.
    pub data: Vec<T>,
    /// Position of this page within the full listing.
    pub pagination: PageInfo,
}

/// Pagination metadata reported alongside each page.
///
/// Field names are camelCase on the wire to match the backend's JSON; the
/// same struct doubles as the paginated wrapper's local cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-based page the rows belong to.
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}
