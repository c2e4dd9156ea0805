//! Schedule Migration
//!
//! Schedules are the one entity whose creation contract differs between
//! target versions. This crate repairs their recurrence rules and submits
//! them through an ordered list of payload variants.
//!
//! # Core Concepts
//!
//! - [`synthesize`]: Rebuilds a missing `DTSTART` anchor from the next run
//! - [`VariantRegistry`]: Data-driven, ordered payload shapes
//! - [`VariantSubmitter`]: Tries each variant until the target accepts one
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_schedule::{ScheduleCandidate, VariantSubmitter};
//!
//! let submitter = VariantSubmitter::new(target);
//! let submission = submitter.submit(&ScheduleCandidate::new(schedule, owner_id)).await?;
//! println!("created {} after {} attempt(s)", submission.created.id, submission.attempts.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod candidate;
mod error;
mod rrule;
mod submitter;
mod variant;

pub use candidate::{ScheduleCandidate, ScheduleOverrides};
pub use error::SubmitError;
pub use rrule::{synthesize, Repair, Synthesized};
pub use submitter::{Attempt, AttemptOutcome, Submission, VariantSubmitter};
pub use variant::{FieldSet, OwnerRef, SubmissionVariant, VariantRegistry, OWNER_FIELD};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
