//! Error taxonomy for settled requests.

use thiserror::Error;

/// Message shown when the backend rejects an operation without saying why.
pub const DEFAULT_BUSINESS_MESSAGE: &str = "Request failed";
/// Message shown when the request never produced a usable envelope.
pub const DEFAULT_TRANSPORT_MESSAGE: &str = "An unexpected error occurred";

/// Why a request settled without data.
///
/// `Transport` and `Business` separate "the call never completed" from "the
/// backend said no"; callers that branch on the distinction match on the
/// variant rather than inspecting message text. `Cancelled` is the signal
/// threaded through a superseded or torn-down request so its outcome is
/// recognized structurally, never by comparing error strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request failed before an envelope arrived: connection refused,
    /// timeout, malformed body.
    #[error("{0}")]
    Transport(String),
    /// The backend returned `success: false`.
    #[error("{0}")]
    Business(String),
    /// The request was cancelled before settling.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Transport failure, falling back to [`DEFAULT_TRANSPORT_MESSAGE`]
    /// when `message` is empty.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Transport(DEFAULT_TRANSPORT_MESSAGE.to_string())
        } else {
            Self::Transport(message)
        }
    }

    /// Business rejection, falling back to [`DEFAULT_BUSINESS_MESSAGE`]
    /// when `message` is empty.
    pub fn business(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Business(DEFAULT_BUSINESS_MESSAGE.to_string())
        } else {
            Self::Business(message)
        }
    }

    /// The user-facing message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport(message) | Self::Business(message) => message,
            Self::Cancelled => "request cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
