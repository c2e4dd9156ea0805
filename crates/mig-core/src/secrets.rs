//! Secret merge policy
//!
//! Exported configuration arrives with secrets masked. [`merge`] fills masked
//! or blank fields from a local [`SecretStore`] without ever overwriting a
//! genuine exported value.

use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Masked-value markers emitted by controller exports
pub const REDACTION_SENTINELS: [&str; 4] = ["$encrypted$", "********", "<redacted>", "REDACTED"];

/// Whether a value is a masked placeholder
#[must_use]
pub fn is_redacted(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let s = s.trim();
    REDACTION_SENTINELS.contains(&s) || (s.len() >= 3 && s.chars().all(|c| c == '*'))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Fill masked or blank fields from local secrets
///
/// 1. Each source field that is blank or masked takes the local value when
///    one exists.
/// 2. Local keys absent (or still blank) in the result are added.
///
/// A genuine source value always wins.
#[must_use]
pub fn merge(source: &Map<String, Value>, local: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = source.clone();

    for (key, value) in &mut merged {
        if is_blank(value) || is_redacted(value) {
            if let Some(secret) = local.get(key) {
                *value = secret.clone();
            }
        }
    }

    for (key, secret) in local {
        let missing = merged.get(key).map_or(true, is_blank);
        if missing {
            merged.insert(key.clone(), secret.clone());
        }
    }

    merged
}

/// Field names still masked after merging
#[must_use]
pub fn unresolved(fields: &Map<String, Value>) -> Vec<&str> {
    fields
        .iter()
        .filter(|(_, v)| is_redacted(v))
        .map(|(k, _)| k.as_str())
        .collect()
}

/// Locally supplied secrets, keyed by entity name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretStore {
    /// Credential name → input fields
    pub credentials: BTreeMap<String, Map<String, Value>>,
    /// Notification template name → configuration fields
    pub notification_templates: BTreeMap<String, Map<String, Value>>,
}

impl SecretStore {
    /// Load a store file (YAML for `.yml`/`.yaml`, JSON otherwise)
    ///
    /// # Errors
    /// Returns an I/O error for an unreadable file and a serialization error
    /// for malformed content.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let text = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));

        let store: Self = if is_yaml {
            serde_yaml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        tracing::info!(
            "Loaded secret store {} ({} credential(s), {} notification template(s))",
            path.display(),
            store.credentials.len(),
            store.notification_templates.len()
        );
        Ok(store)
    }

    /// Secrets for a credential
    #[must_use]
    pub fn credential(&self, name: &str) -> Option<&Map<String, Value>> {
        self.credentials.get(name.trim())
    }

    /// Secrets for a notification template
    #[must_use]
    pub fn notification_template(&self, name: &str) -> Option<&Map<String, Value>> {
        self.notification_templates.get(name.trim())
    }
}
