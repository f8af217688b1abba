//! Error types for compute operations.
//!
//! Errors are categorized so callers can decide what to tell the user and
//! whether trying again could help. Every variant raised while a resource is
//! being reconciled names the resource kind and the caller-facing
//! (unqualified) identifier.

use crate::backend::Method;
use converge::InvalidWaitSpec;
use std::fmt;
use std::time::Duration;

/// Result type alias for compute operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server has no object at this path.
    #[error("no object at {path}")]
    NotFound {
        /// Request path.
        path: String,
    },

    /// The server answered with a non-success status.
    #[error("{method} {path} returned HTTP {status}: {message}")]
    Status {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response description.
        message: String,
    },

    /// The request never produced a response.
    #[error("{method} {path} failed: {message}")]
    Connection {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Whether this is the distinguished "not found" signal.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Categories of compute errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network or HTTP failure (transient, retryable).
    Transport,
    /// Resource does not exist.
    NotFound,
    /// Caller supplied an invalid input, wait or configuration.
    Validation,
    /// Resource did not converge in time.
    Timeout,
    /// Server reported a terminal failure.
    Failed,
    /// Server reported a status this client does not understand.
    UnknownStatus,
    /// Wait was cancelled by the caller.
    Cancelled,
    /// Response could not be decoded.
    Codec,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Network or API failure",
            Self::NotFound => "Resource not found",
            Self::Validation => "Invalid request",
            Self::Timeout => "Timed out waiting for resource",
            Self::Failed => "Resource failed",
            Self::UnknownStatus => "Unrecognized resource status",
            Self::Cancelled => "Cancelled",
            Self::Codec => "Malformed API payload",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transport => "Check the endpoint and your session cookie, then try again",
            Self::NotFound => "Verify the resource name; names are relative to your account",
            Self::Validation => "Fix the input and run the command again",
            Self::Timeout => "Query the resource again or raise the timeout",
            Self::Failed => "Inspect the reported cause and detail, fix and recreate",
            Self::UnknownStatus => "Upgrade the client; the server reported a new state",
            Self::Cancelled => "Run the command again when ready",
            Self::Codec => "Check that the endpoint serves the compute API",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// What the server said about a failed resource.
///
/// For composite resources `child` names the first child object that is
/// itself in an error state, and the cause/detail/error fields come from
/// that child rather than from the parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Failure {
    /// Status of the parent resource.
    pub status: String,
    /// Failing child object, if any.
    pub child: Option<String>,
    /// What caused the failure.
    pub cause: Option<String>,
    /// Specific details.
    pub detail: Option<String>,
    /// Error text from the server.
    pub error: Option<String>,
}

impl Failure {
    /// A failure known only by its status.
    pub fn from_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status '{}'", self.status)?;
        if let Some(child) = &self.child {
            write!(f, ", object '{}'", child)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ", cause: {}", cause)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ", detail: {}", detail)?;
        }
        if let Some(error) = &self.error {
            write!(f, ", error: {}", error)?;
        }
        Ok(())
    }
}

/// Errors that can occur during compute operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The resource does not exist.
    #[error("{kind} {name} not found")]
    NotFound {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
    },

    /// Transport failure other than "not found".
    #[error("{kind} {name}: {source}")]
    Transport {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },

    /// Payload could not be encoded or decoded.
    #[error("invalid API payload: {0}")]
    Codec(String),

    /// Malformed wait interval/timeout.
    #[error(transparent)]
    InvalidWait(#[from] InvalidWaitSpec),

    /// Input rejected before anything was sent.
    #[error("invalid {kind} input: {message}")]
    InvalidInput {
        /// Resource kind.
        kind: &'static str,
        /// What is wrong.
        message: String,
    },

    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The resource did not converge before the timeout.
    #[error(
        "timed out after {elapsed:?} waiting for {description} ({kind} {name}, {attempts} attempts, last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    ConvergenceTimeout {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// What was awaited.
        description: String,
        /// Status from the last sample.
        last_status: Option<String>,
        /// Time spent waiting.
        elapsed: Duration,
        /// Number of samples taken.
        attempts: u32,
    },

    /// The server reported a terminal failure.
    #[error("{kind} {name} failed after {elapsed:?}: {failure}")]
    ResourceFailed {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// What the server reported.
        failure: Failure,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The server reported a status outside the kind's state machine.
    #[error("{kind} {name} reported unknown status '{status}' after {elapsed:?}")]
    UnknownStatus {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// The unrecognized status.
        status: String,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// A probe saw the client's cancel flag raised.
    #[error("waiting for {kind} {name} was cancelled after {elapsed:?}")]
    Cancelled {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// A transport or payload failure ended a wait early.
    #[error(
        "stopped waiting for {description} after {elapsed:?} ({kind} {name}, {attempts} attempts, last status: {}): {source}",
        .last_status.as_deref().unwrap_or("none")
    )]
    Interrupted {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// What was awaited.
        description: String,
        /// Status from the last pending sample.
        last_status: Option<String>,
        /// Time spent waiting.
        elapsed: Duration,
        /// Number of samples taken, including the failing one.
        attempts: u32,
        /// What ended the wait.
        #[source]
        source: Box<Error>,
    },

    /// Create failed and the compensating delete failed too.
    #[error("creating {kind} {name} failed: {original}; compensating delete also failed: {rollback}")]
    RollbackFailed {
        /// Resource kind.
        kind: &'static str,
        /// Unqualified identifier.
        name: String,
        /// Why the create failed.
        #[source]
        original: Box<Error>,
        /// Why the delete failed.
        rollback: Box<Error>,
    },
}

impl Error {
    /// Create an input validation error.
    pub fn invalid_input(kind: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            kind,
            message: message.into(),
        }
    }

    /// Attach a resource to a transport error, keeping "not found" distinct.
    pub fn from_transport(kind: &'static str, name: impl Into<String>, source: TransportError) -> Self {
        if source.is_not_found() {
            Self::NotFound {
                kind,
                name: name.into(),
            }
        } else {
            Self::Transport {
                kind,
                name: name.into(),
                source,
            }
        }
    }

    /// Record how far a wait had got when this error ended it.
    ///
    /// Errors that carry their own elapsed time get it filled in. Transport
    /// and payload errors are wrapped in [`Error::Interrupted`].
    #[must_use]
    pub fn ended_wait(
        mut self,
        kind: &'static str,
        name: &str,
        description: String,
        at: Duration,
        attempts: u32,
        last_status: Option<String>,
    ) -> Self {
        if let Self::ResourceFailed { elapsed, .. }
        | Self::UnknownStatus { elapsed, .. }
        | Self::Cancelled { elapsed, .. } = &mut self
        {
            *elapsed = at;
            return self;
        }
        Self::Interrupted {
            kind,
            name: name.to_string(),
            description,
            last_status,
            elapsed: at,
            attempts,
            source: Box::new(self),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Transport { .. } => ErrorCategory::Transport,
            Error::Codec(_) => ErrorCategory::Codec,
            Error::InvalidWait(_) | Error::InvalidInput { .. } | Error::Config(_) => {
                ErrorCategory::Validation
            }
            Error::ConvergenceTimeout { .. } => ErrorCategory::Timeout,
            Error::ResourceFailed { .. } => ErrorCategory::Failed,
            Error::UnknownStatus { .. } => ErrorCategory::UnknownStatus,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::Interrupted { source, .. } => source.category(),
            // The original failure is what the caller needs to act on
            Error::RollbackFailed { original, .. } => original.category(),
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this is a "not found" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Interrupted { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
