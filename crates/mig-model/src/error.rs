//! Collaborator errors
//!
//! Transport failures, target-side validation rejections and missing records
//! are kept apart: the schedule submitter retries only on validation, and
//! the orchestrator reports each differently.

/// Error returned by [`SourceReader`](crate::SourceReader) and
/// [`TargetClient`](crate::TargetClient) implementations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Network failure or unexpected non-2xx status
    #[error("transport failure: {message}")]
    Transport {
        /// HTTP status, `None` for network-level failures
        status: Option<u16>,
        /// Method, URL and response text
        message: String,
    },

    /// Platform rejected the payload content
    #[error("validation rejected ({status}): {message}")]
    Validation {
        /// HTTP status (usually 400)
        status: u16,
        /// Response body describing the rejected fields
        message: String,
    },

    /// Single-record fetch found nothing
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Response could not be interpreted
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Create transport error
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Create validation error
    pub fn validation(status: u16, message: impl Into<String>) -> Self {
        Self::Validation {
            status,
            message: message.into(),
        }
    }

    /// Create not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether the platform rejected the payload itself
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether the record does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the credentials were refused (401/403)
    #[inline]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                status: Some(401 | 403),
                ..
            }
        )
    }
}
