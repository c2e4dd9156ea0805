//! Migration Entity Model
//!
//! Shared vocabulary for every migration crate.
//!
//! # Core Concepts
//!
//! - [`Entity`]: One record read from a platform (project, job template, ...)
//! - [`EntityKind`]: Which collection a record belongs to
//! - [`Scope`]: The boundary that constrains name uniqueness on a platform
//! - [`SourceReader`] / [`TargetClient`]: The platform collaborators the
//!   migration engine talks to
//! - [`ClientError`]: Transport vs validation vs not-found, kept distinct
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_model::{Entity, EntityKind, EntityId};
//!
//! let project = Entity::new(EntityKind::Project, EntityId(7), "infra")
//!     .with_field("scm_url", "https://git.example.com/infra.git")
//!     .with_field("scm_branch", "main");
//!
//! assert_eq!(project.str_field("scm_branch"), Some("main"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod client;
mod entity;
mod error;
mod kind;

pub use client::{SourceReader, TargetClient};
pub use entity::{Entity, EntityId};
pub use error::ClientError;
pub use kind::{EntityKind, Relation, Scope};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
