//! Platform REST Clients
//!
//! reqwest-backed implementations of the migration collaborators.
//!
//! # Core Concepts
//!
//! - [`Endpoint`]: Host, bearer token and TLS/timeout settings
//! - [`AwxSource`]: [`SourceReader`](mig_model::SourceReader) over `/api/v2`
//! - [`ControllerTarget`]: [`TargetClient`](mig_model::TargetClient) over
//!   `/api/controller/v2`
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_http::{AwxSource, ControllerTarget, Endpoint};
//!
//! let source = AwxSource::new(&Endpoint::new("https://awx.example.com", awx_token))?;
//! let target = ControllerTarget::new(
//!     &Endpoint::new("https://aap.example.com", aap_token).with_verify_tls(true),
//! )?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod client;
mod endpoint;
mod source;
mod target;

pub use client::ApiClient;
pub use endpoint::{Endpoint, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};
pub use source::{AwxSource, SOURCE_API_PREFIX};
pub use target::{ControllerTarget, TARGET_API_PREFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
