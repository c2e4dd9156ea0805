//! Migration Engine
//!
//! Moves automation-controller configuration from one platform into an
//! organization on another, idempotently: rerunning a migration matches
//! what an earlier run created instead of duplicating it.
//!
//! # Core Concepts
//!
//! - [`MigrationOrchestrator`]: Runs a [`MigrationPlan`] and produces a [`Receipt`]
//! - [`Reconciler`]: Classifies one platform's entities against another's
//!   by natural key
//! - [`ReferenceResolver`]: Turns referenced names into target ids
//! - [`IdempotencyGuard`]: Existence check before every create
//! - [`SecretStore`]: Locally supplied values for redacted secret fields
//! - [`Receipt`]: One record per entity, plus summary and exit status
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_core::{MigrationOrchestrator, MigrationPlan, ReceiptHeader, RunConfig};
//! use mig_model::EntityId;
//!
//! let config = RunConfig::new(EntityId(2)).with_dry_run(true);
//! let orchestrator = MigrationOrchestrator::new(source, target, config)?;
//! let receipt = orchestrator
//!     .execute(MigrationPlan::Projects { id: None }, ReceiptHeader::new("awx", "aap"))
//!     .await?;
//! print!("{}", receipt.render_text());
//! std::process::exit(receipt.status().exit_code());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod context;
mod error;
mod export;
mod filter;
mod guard;
mod keylock;
mod orchestrator;
pub mod payload;
mod receipt;
mod reconciler;
mod resolver;
pub mod secrets;

pub use config::{AmbiguityPolicy, RunConfig, DEFAULT_PREFIX};
pub use context::{RunContext, RunId};
pub use error::{MigrationError, ReferenceKind, ResolutionFailure};
pub use export::{transform_export, transform_export_file, ExportReport, UserMap};
pub use filter::NameFilter;
pub use guard::IdempotencyGuard;
pub use keylock::{KeyGuard, KeyLocks};
pub use orchestrator::{MigrationOrchestrator, MigrationPlan};
pub use receipt::{
    Creation, Outcome, Receipt, ReceiptHeader, ReceiptRecord, RunStatus, Summary,
};
pub use reconciler::{PayloadFn, Reconciler};
pub use resolver::ReferenceResolver;
pub use secrets::SecretStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
