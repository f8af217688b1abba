//! opcctl settings (`config.toml`)
//!
//! ```toml
//! endpoint = "https://api-z27.compute.us6.oraclecloud.com"
//! identity_domain = "acme"
//! user = "jane@example.com"
//! auth_cookie_env = "OPC_AUTH_COOKIE"
//!
//! [waits.orchestration]
//! poll_interval = 10
//! timeout = 1800
//!
//! [waits.attachment]
//! timeout = 60
//! ```

use anyhow::{Context, Result, bail};
use compute::ClientConfig;
use converge::WaitOverride;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the session cookie unless configured otherwise
pub const DEFAULT_COOKIE_ENV: &str = "OPC_AUTH_COOKIE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub endpoint: String,
    pub identity_domain: String,
    pub user: String,
    /// Name of the environment variable holding the session cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_cookie_env: Option<String>,
    #[serde(default)]
    pub waits: Waits,
}

/// Per-kind wait defaults, in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Waits {
    #[serde(default)]
    pub orchestration: WaitSecs,
    #[serde(default)]
    pub attachment: WaitSecs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitSecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl WaitSecs {
    /// Layer `over` on top of these values
    pub fn merged(self, over: Self) -> Self {
        Self {
            poll_interval: over.poll_interval.or(self.poll_interval),
            timeout: over.timeout.or(self.timeout),
        }
    }

    pub fn to_override(self) -> WaitOverride {
        let mut wait = WaitOverride::none();
        if let Some(secs) = self.poll_interval {
            wait = wait.poll_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.timeout {
            wait = wait.timeout(Duration::from_secs(secs));
        }
        wait
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Could not read {} (run 'opcctl config show' for the expected location)",
                path.display()
            )
        })?;
        let settings = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(settings)
    }

    /// Parse and validate settings
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("endpoint", &self.endpoint),
            ("identity_domain", &self.identity_domain),
            ("user", &self.user),
        ] {
            if value.trim().is_empty() {
                bail!("'{}' must not be empty", field);
            }
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            bail!("'endpoint' must be an http(s) URL, got '{}'", self.endpoint);
        }
        for waits in [self.waits.orchestration, self.waits.attachment] {
            if waits.poll_interval == Some(0) {
                bail!("wait poll_interval must be at least 1 second");
            }
        }
        Ok(())
    }

    /// Environment variable the session cookie is read from
    pub fn cookie_env(&self) -> &str {
        self.auth_cookie_env.as_deref().unwrap_or(DEFAULT_COOKIE_ENV)
    }

    /// Client settings, with the cookie read from the environment
    pub fn client_config(&self) -> ClientConfig {
        let cookie = std::env::var(self.cookie_env())
            .ok()
            .filter(|c| !c.trim().is_empty());
        if cookie.is_none() {
            log::warn!(
                "{} is not set; requests will not be authenticated",
                self.cookie_env()
            );
        }
        ClientConfig {
            endpoint: self.endpoint.clone(),
            identity_domain: self.identity_domain.clone(),
            user: self.user.clone(),
            cookie,
        }
    }
}
