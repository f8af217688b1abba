//! Client context shared by every lifecycle call.

use crate::backend::Transport;
use crate::backend::http::HttpTransport;
use crate::codec::{Codec, JsonCodec};
use crate::error::{Error, Result};
use crate::kinds::{Orchestration, StorageAttachment};
use crate::lifecycle::{ResourceKind, Resources};
use crate::qualify::Scope;
use converge::{CancelFlag, WaitObserver};

/// Connection settings for [`Client::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API endpoint, e.g. `https://api-z27.compute.us6.oraclecloud.com`.
    pub endpoint: String,
    /// Identity domain of the account.
    pub identity_domain: String,
    /// User name within the identity domain.
    pub user: String,
    /// Session cookie from a prior authentication, if any.
    pub cookie: Option<String>,
}

/// Client for the compute API.
///
/// Holds the transport, codec and scope every call works with. Calls do
/// not mutate the client, so one client can serve concurrent calls.
///
/// # Example
///
/// ```no_run
/// use compute::{Client, ClientConfig};
/// use converge::WaitOverride;
///
/// let client = Client::new(&ClientConfig {
///     endpoint: "https://api.compute.example.com".to_string(),
///     identity_domain: "acme".to_string(),
///     user: "jane@example.com".to_string(),
///     cookie: std::env::var("OPC_AUTH_COOKIE").ok(),
/// })
/// .unwrap();
///
/// let orchestration = client.orchestrations().get("web-app").unwrap();
/// println!("{} is {}", orchestration.name, orchestration.status);
///
/// client
///     .storage_attachments()
///     .delete("web-app/vm1/1f2e/aa11", &WaitOverride::none())
///     .unwrap();
/// ```
pub struct Client {
    transport: Box<dyn Transport>,
    codec: Box<dyn Codec>,
    scope: Scope,
    observer: Option<Box<dyn WaitObserver>>,
    cancel: Option<CancelFlag>,
}

impl Client {
    /// Create a client speaking HTTP to the configured endpoint.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        let scope = Scope::for_user(&config.identity_domain, &config.user)?;
        let mut transport = HttpTransport::new(config.endpoint.trim());
        if let Some(cookie) = &config.cookie {
            transport = transport.with_cookie(cookie);
        }
        Ok(Self::with_transport(scope, Box::new(transport)))
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(scope: Scope, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            codec: Box::new(JsonCodec),
            scope,
            observer: None,
            cancel: None,
        }
    }

    /// Replace the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Notify `observer` of every pending sample while waiting.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn WaitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stop waits early once `flag` is raised.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The scope identifiers are qualified against.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub(crate) fn observer(&self) -> Option<&dyn WaitObserver> {
        self.observer.as_deref()
    }

    pub(crate) fn cancel_flag(&self) -> Option<&CancelFlag> {
        self.cancel.as_ref()
    }

    /// Lifecycle operations for any resource kind.
    pub fn resources<K: ResourceKind>(&self) -> Resources<'_, K> {
        Resources::new(self)
    }

    /// Lifecycle operations for orchestrations.
    pub fn orchestrations(&self) -> Resources<'_, Orchestration> {
        self.resources()
    }

    /// Lifecycle operations for storage attachments.
    pub fn storage_attachments(&self) -> Resources<'_, StorageAttachment> {
        self.resources()
    }
}
