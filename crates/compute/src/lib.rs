//! # compute
//!
//! Client for a compute cloud API whose resources converge asynchronously.
//!
//! Every call submits a request, then polls the resource until its status
//! says it is done, using the [`converge`] poll loop and one
//! [`converge::StateMachine`] per resource kind.
//!
//! This crate provides:
//! - Account-scoped identifiers: callers use short names, the API sees
//!   names qualified with the account [`Scope`]
//! - Create / get / update / delete with a wait, for each kind in [`kinds`]
//! - A compensating delete when a create does not converge
//! - Pluggable [`backend::Transport`] and [`codec::Codec`]
//!
//! ## Example
//!
//! ```
//! use compute::backend::{Method, MockResponse, MockTransport};
//! use compute::kinds::CreateStorageAttachmentInput;
//! use compute::{Client, Scope};
//! use converge::WaitOverride;
//! use std::time::Duration;
//!
//! let mock = MockTransport::new();
//! let attachment = r#"{"name": "/Compute-acme/jane/vm1/att", "index": 1,
//!     "instance_name": "/Compute-acme/jane/vm1",
//!     "storage_volume_name": "/Compute-acme/jane/data", "state": "attached"}"#;
//! mock.push(Method::Post, "/storage/attachment/", MockResponse::json(attachment));
//! mock.push(Method::Get, "/storage/attachment/Compute-acme/jane/vm1/att", MockResponse::json(attachment));
//!
//! let client = Client::with_transport(Scope::for_user("acme", "jane")?, Box::new(mock));
//! let wait = WaitOverride::none().poll_interval(Duration::from_millis(10));
//! let attached = client
//!     .storage_attachments()
//!     .create(&CreateStorageAttachmentInput::new(1, "vm1", "data"), &wait)?;
//!
//! assert_eq!(attached.name, "vm1/att");
//! assert_eq!(attached.storage_volume_name, "data");
//! # Ok::<(), compute::Error>(())
//! ```

pub mod backend;
pub mod client;
pub mod codec;
pub mod error;
pub mod kinds;
pub mod lifecycle;
pub mod qualify;

pub use client::{Client, ClientConfig};
pub use error::{Error, ErrorCategory, Failure, Result, TransportError};
pub use lifecycle::{Phase, ResourceKind, Resources, Updatable};
pub use qualify::{Qualify, Scope};
