//! Platform records
//!
//! An [`Entity`] keeps the raw field map exactly as the platform returned it,
//! so payload builders can decide what to copy. Only the identity fields are
//! lifted out.

use crate::error::ClientError;
use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

/// Platform-assigned numeric identifier
///
/// Identifiers are only meaningful on the platform that issued them; a
/// source id is never reused as a target id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Read an id from a JSON value (number or numeric string)
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self),
            Value::String(s) => s.trim().parse().ok().map(Self),
            _ => None,
        }
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One migratable record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Collection the record came from
    pub kind: EntityKind,
    /// Id on the platform that returned it
    pub id: EntityId,
    /// Display name (not unique across scopes)
    pub name: String,
    /// Owning organization, if any
    pub organization: Option<EntityId>,
    /// Every field as returned by the platform
    pub fields: Map<String, Value>,
}

impl Entity {
    /// Create an entity with no extra fields
    #[must_use]
    pub fn new(kind: EntityKind, id: EntityId, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::from(id.0));
        fields.insert("name".to_string(), Value::String(name.clone()));
        Self {
            kind,
            id,
            name,
            organization: None,
            fields,
        }
    }

    /// Decode a platform JSON record
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the record is not an object or has
    /// no usable `id`.
    pub fn from_record(kind: EntityKind, record: Value) -> Result<Self, ClientError> {
        let Value::Object(fields) = record else {
            return Err(ClientError::Decode(format!(
                "{kind} record is not a JSON object"
            )));
        };

        let id = fields
            .get("id")
            .and_then(EntityId::from_value)
            .ok_or_else(|| ClientError::Decode(format!("{kind} record has no numeric id")))?;

        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(|| format!("{}-{id}", kind.endpoint()), str::to_string);

        let organization = fields.get("organization").and_then(EntityId::from_value);

        Ok(Self {
            kind,
            id,
            name,
            organization,
            fields,
        })
    }

    /// Set organization
    #[inline]
    #[must_use]
    pub fn with_organization(mut self, organization: EntityId) -> Self {
        self.organization = Some(organization);
        self.fields
            .insert("organization".to_string(), Value::from(organization.0));
        self
    }

    /// Set a raw field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set `summary_fields.<relation>.name`
    #[must_use]
    pub fn with_related_name(mut self, relation: &str, name: impl Into<String>) -> Self {
        let summary = self
            .fields
            .entry("summary_fields")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(summary) = summary {
            let mut related = Map::new();
            related.insert("name".to_string(), Value::String(name.into()));
            summary.insert(relation.to_string(), Value::Object(related));
        }
        self
    }

    /// Raw field
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field, `None` when absent or not a string
    #[inline]
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Boolean field, `false` when absent or null
    #[inline]
    #[must_use]
    pub fn bool_field(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Integer field, `0` when absent or null
    #[inline]
    #[must_use]
    pub fn int_field(&self, key: &str) -> i64 {
        self.fields.get(key).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Name of a related object from `summary_fields`
    ///
    /// Platforms denormalise the names of referenced objects into
    /// `summary_fields.<relation>.name`; cross-platform references are
    /// resolved through these names because ids differ per platform.
    #[must_use]
    pub fn related_name(&self, relation: &str) -> Option<&str> {
        self.fields
            .get("summary_fields")?
            .get(relation)?
            .get("name")?
            .as_str()
            .filter(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_platform_record() {
        let record = json!({
            "id": 12,
            "name": "deploy",
            "organization": 3,
            "summary_fields": { "project": { "id": 4, "name": "infra" } }
        });
        let entity = Entity::from_record(EntityKind::JobTemplate, record).unwrap();

        assert_eq!(entity.id, EntityId(12));
        assert_eq!(entity.name, "deploy");
        assert_eq!(entity.organization, Some(EntityId(3)));
        assert_eq!(entity.related_name("project"), Some("infra"));
        assert_eq!(entity.related_name("inventory"), None);
    }

    #[test]
    fn missing_name_falls_back_to_kind_and_id() {
        let entity = Entity::from_record(EntityKind::Project, json!({ "id": 5 })).unwrap();
        assert_eq!(entity.name, "projects-5");
    }

    #[test]
    fn rejects_records_without_id() {
        let err = Entity::from_record(EntityKind::Project, json!({ "name": "x" })).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));

        let err = Entity::from_record(EntityKind::Project, json!([1, 2])).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn builder_sets_summary_names() {
        let entity = Entity::new(EntityKind::Credential, EntityId(1), "vault")
            .with_related_name("credential_type", "Vault")
            .with_organization(EntityId(2));

        assert_eq!(entity.related_name("credential_type"), Some("Vault"));
        assert_eq!(entity.field("organization"), Some(&json!(2)));
    }

    #[test]
    fn blank_related_names_are_absent() {
        let entity = Entity::new(EntityKind::JobTemplate, EntityId(1), "jt")
            .with_related_name("inventory", "  ");
        assert_eq!(entity.related_name("inventory"), None);
    }
}
