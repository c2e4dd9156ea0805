//! Schedule candidates

use mig_model::{Entity, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-run values forced onto every migrated schedule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOverrides {
    pub job_tags: Option<String>,
    pub skip_tags: Option<String>,
    pub limit: Option<String>,
    pub verbosity: Option<u8>,
    pub timeout: Option<u32>,
    pub execution_environment: Option<EntityId>,
}

impl ScheduleOverrides {
    /// Whether no override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A source schedule ready to be submitted under its target owner
#[derive(Debug, Clone)]
pub struct ScheduleCandidate {
    /// Schedule as read from the source
    pub schedule: Entity,
    /// Owning job template on the target
    pub owner: EntityId,
    /// Owner's resolved inventory on the target
    pub inventory: Option<EntityId>,
    /// Per-run overrides
    pub overrides: ScheduleOverrides,
}

impl ScheduleCandidate {
    /// Create candidate with no inventory and no overrides
    #[must_use]
    pub fn new(schedule: Entity, owner: EntityId) -> Self {
        Self {
            schedule,
            owner,
            inventory: None,
            overrides: ScheduleOverrides::default(),
        }
    }

    /// Set owner inventory
    #[inline]
    #[must_use]
    pub fn with_inventory(mut self, inventory: Option<EntityId>) -> Self {
        self.inventory = inventory;
        self
    }

    /// Set overrides
    #[inline]
    #[must_use]
    pub fn with_overrides(mut self, overrides: ScheduleOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Trimmed schedule name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.schedule.name.trim()
    }

    /// Schedules are enabled unless the source says otherwise
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.schedule
            .field("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Run limit: override first, then the schedule's own
    #[must_use]
    pub fn limit(&self) -> Option<String> {
        non_blank(self.overrides.limit.as_deref())
            .or_else(|| non_blank(self.schedule.str_field("limit")))
            .map(str::to_string)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_model::EntityKind;

    #[test]
    fn limit_prefers_override() {
        let schedule = Entity::new(EntityKind::Schedule, EntityId(1), "nightly")
            .with_field("limit", "web");
        let candidate = ScheduleCandidate::new(schedule.clone(), EntityId(9));
        assert_eq!(candidate.limit().as_deref(), Some("web"));

        let overridden = ScheduleCandidate::new(schedule, EntityId(9)).with_overrides(
            ScheduleOverrides {
                limit: Some("db".into()),
                ..ScheduleOverrides::default()
            },
        );
        assert_eq!(overridden.limit().as_deref(), Some("db"));
    }

    #[test]
    fn enabled_defaults_to_true() {
        let schedule = Entity::new(EntityKind::Schedule, EntityId(1), "nightly");
        assert!(ScheduleCandidate::new(schedule.clone(), EntityId(2)).enabled());

        let disabled = schedule.with_field("enabled", false);
        assert!(!ScheduleCandidate::new(disabled, EntityId(2)).enabled());
    }
}
