//! Submission errors

use crate::submitter::Attempt;
use mig_model::ClientError;

/// Schedule submission failed
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    /// Every variant was rejected by target validation
    #[error("all {} submission variants rejected", .attempts.len())]
    Exhausted {
        /// One entry per variant, in order
        attempts: Vec<Attempt>,
    },

    /// A non-validation error stopped the sequence
    #[error("submission aborted after {} attempt(s): {error}", .attempts.len())]
    Aborted {
        /// Attempts made so far, the failing one last
        attempts: Vec<Attempt>,
        /// The stopping error
        error: ClientError,
    },
}

impl SubmitError {
    /// Attempts made before giving up
    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::Exhausted { attempts } | Self::Aborted { attempts, .. } => attempts,
        }
    }

    /// One diagnostic line per attempt
    #[must_use]
    pub fn diagnostics(&self) -> String {
        self.attempts()
            .iter()
            .enumerate()
            .map(|(i, a)| format!("#{} {a}", i + 1))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
