//! Core types for convergence waits

use crate::error::InvalidWaitSpec;
use std::time::Duration;

/// How long to wait for something, and how often to look
///
/// A valid spec has a non-zero `poll_interval` and a `timeout` at least as
/// long as one interval. [`WaitSpec::new`] enforces this; specs built by hand
/// are checked again by [`crate::wait_for`] before the first probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    /// What is being waited for, e.g. "orchestration to be ready"
    pub description: String,
    /// Delay between two probes
    pub poll_interval: Duration,
    /// Wall-clock budget for the whole wait
    pub timeout: Duration,
}

impl WaitSpec {
    /// Create a validated wait spec
    pub fn new(
        description: impl Into<String>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, InvalidWaitSpec> {
        let spec = Self {
            description: description.into(),
            poll_interval,
            timeout,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the interval/timeout invariants
    pub fn validate(&self) -> Result<(), InvalidWaitSpec> {
        if self.poll_interval.is_zero() {
            return Err(InvalidWaitSpec::ZeroInterval {
                description: self.description.clone(),
            });
        }
        if self.timeout < self.poll_interval {
            return Err(InvalidWaitSpec::TimeoutShorterThanInterval {
                description: self.description.clone(),
                poll_interval: self.poll_interval,
                timeout: self.timeout,
            });
        }
        Ok(())
    }

    /// Apply caller overrides on top of this spec and validate the result
    pub fn with_override(&self, over: &WaitOverride) -> Result<Self, InvalidWaitSpec> {
        Self::new(
            self.description.clone(),
            over.poll_interval.unwrap_or(self.poll_interval),
            over.timeout.unwrap_or(self.timeout),
        )
    }
}

/// Optional caller-supplied replacement for a default wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOverride {
    pub poll_interval: Option<Duration>,
    pub timeout: Option<Duration>,
}

impl WaitOverride {
    /// No override: use the resource kind's defaults
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Outcome of a single probe that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample<T> {
    /// Desired state reached; the wait ends with this value
    Ready(T),
    /// Not there yet; `status` is what was observed
    Pending { status: String },
}

impl<T> Sample<T> {
    /// Shorthand for a pending sample
    pub fn pending(status: impl Into<String>) -> Self {
        Self::Pending {
            status: status.into(),
        }
    }

    /// Check if the sample is ready
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}
