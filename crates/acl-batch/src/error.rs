//! Error types for batch construction and submission.
//!
//! Errors are layered the way a batch moves through the engine:
//!
//! - [`ValidationError`]: one operation breaks its field contract
//! - [`BuildError`]: the batch as a whole cannot be assembled
//! - [`TransportError`]: the collaborator could not complete a call
//! - [`SubmissionError`]: the outcome of sending a built batch
//!
//! None of these are fatal; every failure is returned to the caller.

use acl_types::Field;
use thiserror::Error;

/// Result type alias for submissions.
pub type SubmissionResult<T> = Result<T, SubmissionError>;

/// A single operation violates the field contract of its operation type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field the operation type requires is absent (or empty).
    #[error("missing required field '{0}'")]
    MissingRequiredField(Field),

    /// A field the operation type does not accept is present.
    #[error("field '{0}' is not allowed for this operation")]
    ForbiddenField(Field),

    /// `subnet` is outside the prefix-length range of the address family.
    #[error("subnet /{subnet} is out of range (maximum /{max})")]
    InvalidSubnet {
        /// The rejected prefix length.
        subnet: u8,
        /// Longest prefix accepted for the inferred family.
        max: u8,
    },

    /// An update sets nothing besides `id`.
    #[error("update sets no fields besides 'id'")]
    EmptyUpdate,

    /// `ip` is present but is not an IPv4 or IPv6 literal.
    #[error("invalid IP address '{0}'")]
    InvalidIp(String),
}

/// The batch cannot be assembled. Raised before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("batch contains no operations")]
    EmptyBatch,

    #[error("batch has {actual} operations, maximum is {max}")]
    BatchTooLarge {
        /// Number of operations supplied.
        actual: usize,
        /// Configured upper bound.
        max: usize,
    },

    /// The operation at `index` (zero-based, in caller order) is invalid.
    #[error("operation {index} is invalid: {source}")]
    InvalidOperation {
        /// Position in the caller's input.
        index: usize,
        /// Why the operation was rejected.
        #[source]
        source: ValidationError,
    },

    /// More than one operation targets the same entry id.
    #[error("entry '{0}' is targeted by more than one operation")]
    DuplicateTarget(String),

    #[error("missing required service id")]
    MissingServiceId,

    #[error("missing required ACL id")]
    MissingAclId,
}

impl BuildError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(index: usize, source: ValidationError) -> Self {
        Self::InvalidOperation { index, source }
    }

    /// Position of the offending operation, if the error concerns one.
    pub fn index(&self) -> Option<usize> {
        match self {
            BuildError::InvalidOperation { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failure reported by a [`Transport`](crate::Transport) or
/// [`Lister`](crate::Lister).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response arrived within the allotted time.
    #[error("request timed out")]
    Timeout,

    /// The caller cancelled before a response was observed.
    #[error("request cancelled")]
    Cancelled,

    /// Any other I/O level failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// A listing call returned a non-success status.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Remote message, if any.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Returns true if the failure is transient: the call may succeed if
    /// repeated. Cancellation is never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_) | TransportError::Timeout | TransportError::Io(_)
        )
    }
}

/// Outcome of a failed submission.
///
/// A submission is all-or-nothing: when this is returned no operation of the
/// batch is known to have been applied. For
/// [`TransportFailure`](SubmissionError::TransportFailure) the outcome is
/// ambiguous and remote state should be re-listed before resubmitting a batch
/// containing creates.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The remote store answered with a non-success status.
    #[error("remote rejected batch with status {status}: {message}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Remote error message.
        message: String,
    },

    /// The transport failed before a response was observed.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// The request could not be encoded.
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SubmissionError {
    /// Creates a remote rejection error.
    pub fn remote_rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the failure is transient at the transport level.
    ///
    /// This does not consider the batch: a batch containing creates is never
    /// retried regardless of this value.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::TransportFailure(e) => e.is_retryable(),
            SubmissionError::RemoteRejected { .. } | SubmissionError::Encode(_) => false,
        }
    }

    /// Returns true if the caller cancelled the submission.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SubmissionError::TransportFailure(TransportError::Cancelled)
        )
    }
}
