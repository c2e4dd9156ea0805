//! Natural Keys
//!
//! Platforms that never shared a database have no common primary key. This
//! crate derives a content-based [`NaturalKey`] for each entity and indexes a
//! platform's entities by it.
//!
//! # Core Concepts
//!
//! - [`normalize`]: Pure, total canonicalisation of a [`RawKey`]
//! - [`NaturalKey`]: SCM identity (URL + branch) or name identity (name + scope)
//! - [`NaturalKeyIndex`]: First-wins map from key to entity, built once per run
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_key::{NaturalKey, normalize_url};
//!
//! let a = NaturalKey::scm("https://GIT.example.com/repo.git", Some("main"));
//! let b = NaturalKey::scm("https://git.example.com/repo/", Some("main"));
//! assert_eq!(a, b);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod index;
mod key;
mod normalize;

pub use index::NaturalKeyIndex;
pub use key::{NaturalKey, RawKey};
pub use normalize::{normalize, normalize_branch, normalize_name, normalize_url};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
