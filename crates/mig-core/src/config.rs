//! Run configuration

use crate::error::MigrationError;
use crate::filter::NameFilter;
use mig_model::EntityId;
use mig_schedule::ScheduleOverrides;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default name prefix for entities created in compare mode
pub const DEFAULT_PREFIX: &str = "PROD_";

/// What to do when a name resolves to several target entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first result and log a warning
    #[default]
    FirstMatch,
    /// Fail the entity with an ambiguity error
    Reject,
}

/// Settings for one migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Target organization every entity is created in
    pub organization: Option<EntityId>,
    /// Only names matching this regex are considered
    pub include: Option<String>,
    /// Names matching this regex are skipped
    pub exclude: Option<String>,
    /// Stop after this many processed (non-filtered) candidates
    pub limit: Option<usize>,
    /// Read and resolve everything, mutate nothing
    pub dry_run: bool,
    /// Prefix for names created in compare mode
    pub prefix: String,
    /// Execution environment forced onto migrated job templates
    pub force_execution_environment: Option<EntityId>,
    /// Values forced onto migrated schedules
    pub schedule_overrides: ScheduleOverrides,
    /// Migrate job template schedules
    pub migrate_schedules: bool,
    /// Multi-match resolution policy
    pub ambiguity: AmbiguityPolicy,
    /// Where the receipt is written
    pub receipt_path: Option<PathBuf>,
}

impl RunConfig {
    /// Create configuration for an organization
    #[inline]
    #[must_use]
    pub fn new(organization: EntityId) -> Self {
        Self {
            organization: Some(organization),
            ..Self::default()
        }
    }

    /// With name filters
    #[inline]
    #[must_use]
    pub fn with_filters(mut self, include: Option<String>, exclude: Option<String>) -> Self {
        self.include = include;
        self.exclude = exclude;
        self
    }

    /// With processed-count limit
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// With dry-run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With compare-mode name prefix
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// With forced execution environment
    #[inline]
    #[must_use]
    pub fn with_execution_environment(mut self, id: EntityId) -> Self {
        self.force_execution_environment = Some(id);
        self
    }

    /// With schedule overrides
    #[inline]
    #[must_use]
    pub fn with_schedule_overrides(mut self, overrides: ScheduleOverrides) -> Self {
        self.schedule_overrides = overrides;
        self
    }

    /// With ambiguity policy
    #[inline]
    #[must_use]
    pub fn with_ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    /// With receipt path
    #[inline]
    #[must_use]
    pub fn with_receipt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.receipt_path = Some(path.into());
        self
    }

    /// Check settings that every mode needs and compile the name filter
    ///
    /// # Errors
    /// [`MigrationError::Configuration`] for a missing organization, an
    /// invalid regex or a zero limit.
    pub fn validate(&self) -> Result<(EntityId, NameFilter), MigrationError> {
        let organization = self
            .organization
            .ok_or_else(|| MigrationError::config("an organization id is required"))?;

        if self.limit == Some(0) {
            return Err(MigrationError::config("limit must be at least 1"));
        }

        let filter = NameFilter::new(self.include.as_deref(), self.exclude.as_deref())
            .map_err(|e| MigrationError::config(format!("invalid name filter: {e}")))?;

        Ok((organization, filter))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            organization: None,
            include: None,
            exclude: None,
            limit: None,
            dry_run: false,
            prefix: DEFAULT_PREFIX.to_string(),
            force_execution_environment: None,
            schedule_overrides: ScheduleOverrides::default(),
            migrate_schedules: true,
            ambiguity: AmbiguityPolicy::default(),
            receipt_path: None,
        }
    }
}
