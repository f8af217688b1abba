//! # Converge
//!
//! Primitives for driving eventually-consistent remote state to a desired
//! state and observing when it gets there.
//!
//! This crate knows nothing about any particular API. It provides:
//!
//! ## Core Concepts
//!
//! - **WaitSpec**: poll interval, timeout and a description of what is awaited
//! - **Sample**: what a single probe saw (`Ready` or `Pending` with a status)
//! - **wait_for**: the poll loop - probe, sleep, repeat until ready, error or timeout
//! - **StateMachine**: a table mapping status codes to a [`Verdict`]
//! - **CancelFlag**: a cooperative stop signal a probe can consult
//!
//! ## Example
//!
//! ```
//! use converge::{Sample, StateMachine, Verdict, WaitSpec, wait_for};
//! use std::time::Duration;
//!
//! let machine = StateMachine::new("volume")
//!     .converged(&["online"])
//!     .transient(&["initializing"])
//!     .failed(&["error"]);
//!
//! let mut statuses = vec!["online", "initializing"];
//! let spec = WaitSpec::new(
//!     "volume to come online",
//!     Duration::from_millis(1),
//!     Duration::from_secs(1),
//! )
//! .unwrap();
//!
//! let status = wait_for(&spec, || {
//!     let status = statuses.pop().unwrap();
//!     match machine.classify(status, None) {
//!         Verdict::Converged => Ok(Sample::Ready(status)),
//!         Verdict::Transient => Ok(Sample::pending(status)),
//!         other => Err(std::io::Error::other(format!("{other:?}"))),
//!     }
//! })
//! .unwrap();
//!
//! assert_eq!(status, "online");
//! ```
//!
//! ## Provider Traits
//!
//! - [`Observed`]: anything with a name, a reported status and optionally an
//!   echoed desired state can be classified by a [`StateMachine`]
//! - [`WaitObserver`]: receives a notification for every pending sample
//!
//! Nothing here retries a failing probe. A probe error ends the wait.

pub mod cancel;
pub mod error;
pub mod machine;
pub mod types;
pub mod wait;

pub use cancel::CancelFlag;
pub use error::{InvalidWaitSpec, WaitError};
pub use machine::{Observed, StateMachine, Verdict};
pub use types::{Sample, WaitOverride, WaitSpec};
pub use wait::{LogObserver, NoObserver, WaitObserver, wait_for, wait_for_with};
