//! Observable snapshot of a request slot.

use crate::error::ApiError;

/// What a request slot currently holds: the last fetched payload, whether a
/// request is in flight, and the error the last settled request produced.
///
/// Snapshots are read from a watch channel, so a consumer either polls the
/// current value or awaits changes; every mutation the core makes is a
/// single atomic update to one of these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    /// Payload of the most recent successful request, if any.
    pub data: Option<T>,
    /// Whether a request is currently in flight.
    pub loading: bool,
    /// Error from the most recent settled request, cleared when a new
    /// request starts.
    pub error: Option<ApiError>,
}

impl<T> RequestState<T> {
    pub(crate) fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    /// Whether a successful fetch has populated `data`.
    pub fn is_fetched(&self) -> bool {
        self.data.is_some()
    }

    /// Loading with nothing fetched yet, the "show a spinner" case.
    pub fn is_initial_loading(&self) -> bool {
        self.loading && self.data.is_none()
    }

    /// User-facing message of the current error, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(ApiError::message)
    }
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
