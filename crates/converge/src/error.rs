//! Error types for convergence waits.
//!
//! A wait is rejected up front when its [`WaitSpec`](crate::WaitSpec) is
//! malformed. Once running it fails on timeout or on a probe error.

use std::time::Duration;
use thiserror::Error;

/// A malformed [`crate::WaitSpec`]. This is a caller error, not a runtime fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidWaitSpec {
    /// Poll interval must be positive
    #[error("invalid wait for {description}: poll interval must be greater than zero")]
    ZeroInterval {
        /// What the wait was for
        description: String,
    },

    /// Timeout must cover at least one poll interval
    #[error(
        "invalid wait for {description}: timeout {timeout:?} is shorter than poll interval {poll_interval:?}"
    )]
    TimeoutShorterThanInterval {
        /// What the wait was for
        description: String,
        /// Requested poll interval
        poll_interval: Duration,
        /// Requested timeout
        timeout: Duration,
    },
}

/// Why a call to [`crate::wait_for`] did not converge.
///
/// `E` is the probe's own error type; it is handed back untouched in
/// [`WaitError::Probe`] together with how far the wait had got.
#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    /// The wait spec was rejected before any probe ran
    #[error(transparent)]
    Invalid(#[from] InvalidWaitSpec),

    /// The timeout elapsed without convergence
    #[error(
        "timed out after {elapsed:?} waiting for {description} ({attempts} attempts, last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    TimedOut {
        /// What the wait was for
        description: String,
        /// Wall-clock time spent
        elapsed: Duration,
        /// Number of probes made
        attempts: u32,
        /// Status reported by the last pending sample
        last_status: Option<String>,
    },

    /// The probe failed; the wait stopped at once
    #[error("{description}: {source}")]
    Probe {
        /// What the wait was for
        description: String,
        /// The probe's error
        #[source]
        source: E,
        /// Wall-clock time spent before the failure
        elapsed: Duration,
        /// Number of probes made, including the failing one
        attempts: u32,
        /// Status reported by the last pending sample before the failure
        last_status: Option<String>,
    },
}

impl<E> WaitError<E>
where
    E: std::error::Error + 'static,
{
    /// Whether the wait ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Consume the error and return the probe's error, if that is what ended the wait
    pub fn into_probe_error(self) -> Option<E> {
        match self {
            Self::Probe { source, .. } => Some(source),
            _ => None,
        }
    }
}
