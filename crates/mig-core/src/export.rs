//! Export bundle rewriting
//!
//! Rewrites local usernames in an exported asset bundle to the names used by
//! the target's directory, optionally dropping the local user list.
//!
//! Rewritten locations:
//! - `roles[].user`, `memberships[].user`
//! - `teams[].members[]`
//! - `organizations[]` and `job_templates[]` `created_by` / `modified_by`

use crate::error::MigrationError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Username mapping (source name → target name)
pub type UserMap = BTreeMap<String, String>;

/// What a rewrite did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Usernames seen but not in the mapping, sorted
    pub unmapped: Vec<String>,
    /// Usernames rewritten
    pub rewritten: usize,
    /// Whether `users` was emptied
    pub stripped_users: bool,
}

struct Mapper<'a> {
    map: &'a UserMap,
    seen: BTreeSet<String>,
    rewritten: usize,
}

impl Mapper<'_> {
    fn apply(&mut self, slot: &mut Value) {
        let Some(name) = slot.as_str() else {
            return;
        };
        self.seen.insert(name.to_string());
        if let Some(mapped) = self.map.get(name) {
            *slot = Value::String(mapped.clone());
            self.rewritten += 1;
        }
    }

    fn field(&mut self, items: Option<&mut Value>, field: &str) {
        for item in items.and_then(Value::as_array_mut).into_iter().flatten() {
            if let Some(slot) = item.get_mut(field) {
                self.apply(slot);
            }
        }
    }
}

/// Rewrite usernames in place
#[must_use]
pub fn transform_export(doc: &mut Value, map: &UserMap, strip_users: bool) -> ExportReport {
    let mut stripped_users = false;
    if strip_users {
        if let Some(users) = doc.get_mut("users") {
            tracing::info!("Stripping local users");
            *users = Value::Array(Vec::new());
            stripped_users = true;
        }
    }

    let mut mapper = Mapper {
        map,
        seen: BTreeSet::new(),
        rewritten: 0,
    };

    mapper.field(doc.get_mut("roles"), "user");
    mapper.field(doc.get_mut("memberships"), "user");

    let teams = doc.get_mut("teams").and_then(Value::as_array_mut);
    for team in teams.into_iter().flatten() {
        let members = team.get_mut("members").and_then(Value::as_array_mut);
        for member in members.into_iter().flatten() {
            mapper.apply(member);
        }
    }

    for section in ["organizations", "job_templates"] {
        mapper.field(doc.get_mut(section), "created_by");
        mapper.field(doc.get_mut(section), "modified_by");
    }

    let unmapped: Vec<String> = mapper
        .seen
        .into_iter()
        .filter(|u| !map.contains_key(u))
        .collect();
    if !unmapped.is_empty() {
        tracing::warn!(
            "{} user(s) not in mapping and were left unchanged: {}",
            unmapped.len(),
            unmapped.join(", ")
        );
    }

    ExportReport {
        unmapped,
        rewritten: mapper.rewritten,
        stripped_users,
    }
}

/// Rewrite an export file
///
/// # Errors
/// Returns an I/O error for unreadable inputs or an unwritable output, and a
/// serialization error for malformed JSON.
pub fn transform_export_file(
    input: &Path,
    output: &Path,
    mapping: &Path,
    strip_users: bool,
) -> Result<ExportReport, MigrationError> {
    let mut doc: Value = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let map: UserMap = serde_json::from_str(&std::fs::read_to_string(mapping)?)?;

    let report = transform_export(&mut doc, &map, strip_users);

    std::fs::write(output, serde_json::to_string_pretty(&doc)?)?;
    tracing::info!("Output written to: {}", output.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn mapping() -> UserMap {
        [("jdoe", "john.doe"), ("admin", "svc-admin")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn rewrites_every_location() {
        let mut doc = json!({
            "users": [{ "username": "jdoe" }],
            "roles": [{ "user": "jdoe", "role": "admin" }, { "team": "ops" }],
            "memberships": [{ "user": "admin" }],
            "teams": [{ "name": "ops", "members": ["jdoe", "zed"] }],
            "organizations": [{ "created_by": "admin", "modified_by": "amy" }],
            "job_templates": [{ "created_by": "jdoe" }]
        });

        let report = transform_export(&mut doc, &mapping(), true);

        assert_eq!(
            doc,
            json!({
                "users": [],
                "roles": [{ "user": "john.doe", "role": "admin" }, { "team": "ops" }],
                "memberships": [{ "user": "svc-admin" }],
                "teams": [{ "name": "ops", "members": ["john.doe", "zed"] }],
                "organizations": [{ "created_by": "svc-admin", "modified_by": "amy" }],
                "job_templates": [{ "created_by": "john.doe" }]
            })
        );
        assert_eq!(report.unmapped, vec!["amy".to_string(), "zed".to_string()]);
        assert_eq!(report.rewritten, 5);
        assert!(report.stripped_users);
    }

    #[test]
    fn users_kept_unless_stripping() {
        let mut doc = json!({ "users": [{ "username": "a" }] });
        let report = transform_export(&mut doc, &UserMap::new(), false);
        assert_eq!(doc["users"], json!([{ "username": "a" }]));
        assert!(!report.stripped_users);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.json");
        let output = dir.path().join("out.json");
        let map = dir.path().join("users.json");
        std::fs::write(&input, r#"{ "roles": [{ "user": "jdoe" }] }"#).unwrap();
        std::fs::write(&map, r#"{ "jdoe": "john.doe" }"#).unwrap();

        let report = transform_export_file(&input, &output, &map, false).unwrap();
        assert!(report.unmapped.is_empty());

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["roles"][0]["user"], json!("john.doe"));
    }
}
