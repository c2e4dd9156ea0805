//! Error types for the migration engine
//!
//! Provides error handling for:
//! - Transport failures talking to either platform
//! - Name-based references that cannot be resolved on the target
//! - Target-side payload validation
//! - Run configuration problems (the only run-fatal kind)
//! - Schedule submission exhaustion

use mig_model::{ClientError, EntityKind, Scope};
use mig_schedule::SubmitError;
use std::fmt::{self, Display, Formatter};

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Network failure or non-2xx response
    #[error("transport error: {0}")]
    Transport(ClientError),

    /// Named reference not found (or ambiguous) on the target
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionFailure),

    /// Target rejected the payload content
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing or invalid run parameter
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No schedule variant was accepted
    #[error("schedule submission failed: {0}")]
    ScheduleExhausted(#[from] SubmitError),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File content could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MigrationError {
    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the whole run must stop
    #[inline]
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Short label used in receipts
    #[inline]
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Resolution(_) => "resolution",
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::ScheduleExhausted(_) => "schedule",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Message including per-attempt diagnostics for schedule failures
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::ScheduleExhausted(err) => format!("{err}: {}", err.diagnostics()),
            other => other.to_string(),
        }
    }
}

impl From<ClientError> for MigrationError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation { .. } => Self::Validation(err.to_string()),
            ClientError::NotFound { what } => Self::Resolution(ResolutionFailure::Missing { what }),
            other => Self::Transport(other),
        }
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for MigrationError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Kind of a name-based reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Project,
    Inventory,
    Credential,
    ExecutionEnvironment,
    CredentialType,
    NotificationTemplate,
}

impl ReferenceKind {
    /// Target collection searched
    #[inline]
    #[must_use]
    pub fn entity_kind(self) -> EntityKind {
        match self {
            Self::Project => EntityKind::Project,
            Self::Inventory => EntityKind::Inventory,
            Self::Credential => EntityKind::Credential,
            Self::ExecutionEnvironment => EntityKind::ExecutionEnvironment,
            Self::CredentialType => EntityKind::CredentialType,
            Self::NotificationTemplate => EntityKind::NotificationTemplate,
        }
    }

    /// Summary field that disambiguates same-named matches
    #[inline]
    #[must_use]
    pub fn discriminator_field(self) -> Option<&'static str> {
        match self {
            Self::Credential => Some("credential_type"),
            _ => None,
        }
    }
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_kind().label())
    }
}

/// A name-based reference that did not resolve to exactly one target entity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionFailure {
    /// Nothing with that name in scope
    #[error("{kind} '{name}' not found in {scope}")]
    NotFound {
        kind: ReferenceKind,
        name: String,
        scope: Scope,
    },

    /// Several matches and the policy forbids guessing
    #[error("{kind} '{name}' is ambiguous in {scope} ({candidates} matches)")]
    Ambiguous {
        kind: ReferenceKind,
        name: String,
        scope: Scope,
        candidates: usize,
    },

    /// A record fetched by id is gone
    #[error("{what} not found")]
    Missing { what: String },
}
