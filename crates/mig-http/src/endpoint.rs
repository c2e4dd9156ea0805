//! Platform connection settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Request timeout used unless overridden
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Listing page size used unless overridden
pub const DEFAULT_PAGE_SIZE: u32 = 200;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Where a platform lives and how to authenticate against it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Scheme and host, e.g. `https://awx.example.com`
    pub host: String,
    /// Bearer token
    pub token: String,
    /// Verify the server certificate (off by default)
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Endpoint {
    /// Create endpoint; trailing slashes on `host` are dropped
    #[must_use]
    pub fn new(host: impl AsRef<str>, token: impl Into<String>) -> Self {
        Self {
            host: host.as_ref().trim().trim_end_matches('/').to_string(),
            token: token.into(),
            verify_tls: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// With certificate verification
    #[inline]
    #[must_use]
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// With listing page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("token", &"[REDACTED]")
            .field("verify_tls", &self.verify_tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("page_size", &self.page_size)
            .finish()
    }
}
