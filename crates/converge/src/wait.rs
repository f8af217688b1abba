//! The poll loop.
//!
//! [`wait_for`] runs a probe immediately, then once per poll interval, until
//! the probe reports [`Sample::Ready`], the probe fails, or the wall-clock
//! timeout is exhausted. Elapsed time is measured against an [`Instant`]
//! captured when the wait starts, so a slow probe eats into the budget.

use crate::error::WaitError;
use crate::types::{Sample, WaitSpec};
use std::thread;
use std::time::{Duration, Instant};

/// Callback trait for pending-sample notifications.
pub trait WaitObserver: Send + Sync {
    /// Called after each probe that did not converge.
    ///
    /// # Arguments
    /// * `description` - What is being waited for
    /// * `attempt` - Probe number (1-indexed)
    /// * `status` - The status the probe observed
    /// * `elapsed` - Time since the wait started
    fn on_pending(&self, description: &str, attempt: u32, status: &str, elapsed: Duration);
}

/// No-op observer.
pub struct NoObserver;

impl WaitObserver for NoObserver {
    fn on_pending(&self, _description: &str, _attempt: u32, _status: &str, _elapsed: Duration) {}
}

/// Observer that reports each pending sample through the `log` facade.
pub struct LogObserver;

impl WaitObserver for LogObserver {
    fn on_pending(&self, description: &str, attempt: u32, status: &str, elapsed: Duration) {
        log::info!(
            "Waiting for {}: attempt {} saw '{}' after {:.1}s",
            description,
            attempt,
            status,
            elapsed.as_secs_f64()
        );
    }
}

/// Poll until converged, failed, or timed out.
///
/// # Arguments
/// * `spec` - Interval, timeout and description of the wait
/// * `probe` - Samples the remote state once
///
/// # Returns
/// The value carried by the first [`Sample::Ready`], or why the wait ended.
pub fn wait_for<T, E, F>(spec: &WaitSpec, probe: F) -> Result<T, WaitError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Result<Sample<T>, E>,
{
    wait_for_with(spec, None, probe)
}

/// Poll until converged, failed, or timed out, notifying `observer` of each
/// pending sample.
pub fn wait_for_with<T, E, F>(
    spec: &WaitSpec,
    observer: Option<&dyn WaitObserver>,
    mut probe: F,
) -> Result<T, WaitError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Result<Sample<T>, E>,
{
    spec.validate()?;

    let started = Instant::now();
    let mut attempts: u32 = 0;
    let mut last_status: Option<String> = None;

    loop {
        attempts += 1;

        match probe() {
            Ok(Sample::Ready(value)) => {
                log::debug!(
                    "{} converged after {} attempts ({:?})",
                    spec.description,
                    attempts,
                    started.elapsed()
                );
                return Ok(value);
            }
            Ok(Sample::Pending { status }) => {
                let elapsed = started.elapsed();
                log::trace!(
                    "{}: attempt {} pending with status '{}'",
                    spec.description,
                    attempts,
                    status
                );
                if let Some(obs) = observer {
                    obs.on_pending(&spec.description, attempts, &status, elapsed);
                }
                last_status = Some(status);
            }
            Err(source) => {
                return Err(WaitError::Probe {
                    description: spec.description.clone(),
                    source,
                    elapsed: started.elapsed(),
                    attempts,
                    last_status,
                });
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= spec.timeout {
            return Err(timed_out(spec, elapsed, attempts, last_status));
        }

        // Never sleep past the deadline
        thread::sleep(spec.poll_interval.min(spec.timeout - elapsed));

        let elapsed = started.elapsed();
        if elapsed >= spec.timeout {
            return Err(timed_out(spec, elapsed, attempts, last_status));
        }
    }
}

fn timed_out<E>(
    spec: &WaitSpec,
    elapsed: Duration,
    attempts: u32,
    last_status: Option<String>,
) -> WaitError<E>
where
    E: std::error::Error + 'static,
{
    log::debug!(
        "{} timed out after {:?} ({} attempts)",
        spec.description,
        elapsed,
        attempts
    );
    WaitError::TimedOut {
        description: spec.description.clone(),
        elapsed,
        attempts,
        last_status,
    }
}
