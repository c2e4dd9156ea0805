//! Testing utilities for the migration workspace
//!
//! [`FakePlatform`] is an in-memory platform that implements both
//! [`SourceReader`] and [`TargetClient`], with knobs for injecting failures.

#![allow(missing_docs)]

pub mod fixtures;

use mig_model::{ClientError, Entity, EntityId, EntityKind, Relation, Scope, SourceReader, TargetClient};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

const FIRST_ID: u64 = 100;

/// One recorded association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub parent_kind: EntityKind,
    pub parent: EntityId,
    pub relation: Relation,
    pub child: EntityId,
}

#[derive(Debug)]
struct Rejection {
    kind: EntityKind,
    remaining: usize,
    error: ClientError,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    entities: Vec<Entity>,
    related: HashMap<(EntityId, Relation), Vec<EntityId>>,
    created: Vec<EntityId>,
    create_attempts: Vec<(EntityKind, Value)>,
    patches: Vec<(EntityKind, EntityId, Value)>,
    attachments: Vec<Attachment>,
    rejections: Vec<Rejection>,
    lookups: usize,
    lookup_failure: Option<String>,
    ping_failure: Option<ClientError>,
}

impl State {
    fn fresh_id(&mut self) -> EntityId {
        self.next_id = self.next_id.max(FIRST_ID) + 1;
        EntityId(self.next_id)
    }

    fn find(&self, kind: EntityKind, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind && e.id == id)
    }
}

/// In-memory platform
#[derive(Debug, Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity under a fresh id and return the id
    pub fn seed(&self, mut entity: Entity) -> EntityId {
        let mut state = self.state.lock();
        let id = state.fresh_id();
        entity.id = id;
        entity.fields.insert("id".into(), Value::from(id.0));
        state.entities.push(entity);
        id
    }

    /// Store `child` and link it under `parent`'s `relation`
    pub fn seed_related(&self, parent: EntityId, relation: Relation, child: Entity) -> EntityId {
        let id = self.seed(child);
        self.state
            .lock()
            .related
            .entry((parent, relation))
            .or_default()
            .push(id);
        id
    }

    /// Link an already seeded entity under `parent`'s `relation`
    pub fn link(&self, parent: EntityId, relation: Relation, child: EntityId) {
        self.state
            .lock()
            .related
            .entry((parent, relation))
            .or_default()
            .push(child);
    }

    /// Make the next `times` creates of `kind` fail with `error`
    pub fn reject_creates(&self, kind: EntityKind, times: usize, error: ClientError) {
        self.state.lock().rejections.push(Rejection {
            kind,
            remaining: times,
            error,
        });
    }

    /// Make every name lookup fail with a transport error
    pub fn fail_lookups(&self, message: &str) {
        self.state.lock().lookup_failure = Some(message.to_string());
    }

    /// Make ping fail
    pub fn fail_ping(&self, error: ClientError) {
        self.state.lock().ping_failure = Some(error);
    }

    /// Number of `find_by_name` calls so far
    pub fn lookup_count(&self) -> usize {
        self.state.lock().lookups
    }

    /// Entities of a kind, in insertion order
    pub fn entities(&self, kind: EntityKind) -> Vec<Entity> {
        self.state
            .lock()
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Entity of a kind with this exact name
    pub fn named(&self, kind: EntityKind, name: &str) -> Option<Entity> {
        self.state
            .lock()
            .entities
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .cloned()
    }

    /// Entities of a kind created through [`TargetClient::create`]
    pub fn created(&self, kind: EntityKind) -> Vec<Entity> {
        let state = self.state.lock();
        state
            .created
            .iter()
            .filter_map(|id| state.entities.iter().find(|e| e.id == *id))
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Total successful creates
    pub fn create_count(&self) -> usize {
        self.state.lock().created.len()
    }

    /// Every create payload, accepted or not
    pub fn create_attempts(&self, kind: EntityKind) -> Vec<Value> {
        self.state
            .lock()
            .create_attempts
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn patches(&self) -> Vec<(EntityKind, EntityId, Value)> {
        self.state.lock().patches.clone()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.state.lock().attachments.clone()
    }

    fn api_path(kind: EntityKind, id: EntityId) -> String {
        format!("/api/controller/v2/{}/{}/", kind.endpoint(), id)
    }

    fn in_scope(entity: &Entity, scope: Scope) -> bool {
        match scope {
            Scope::Global => true,
            Scope::Organization(org) => entity.organization == Some(org),
            Scope::Owner(owner) => entity.field("unified_job_template").is_some_and(|v| {
                EntityId::from_value(v) == Some(owner)
                    || v.as_str() == Some(Self::api_path(EntityKind::JobTemplate, owner).as_str())
            }),
        }
    }

    fn matches_filter(entity: &Entity, field: &str, wanted: &str) -> bool {
        match entity.field(field) {
            Some(Value::String(s)) => s.trim() == wanted.trim(),
            Some(Value::Number(n)) => n.to_string() == wanted,
            Some(Value::Bool(b)) => b.to_string() == wanted,
            _ => false,
        }
    }

    fn lookup_error(state: &State) -> Option<ClientError> {
        state
            .lookup_failure
            .as_ref()
            .map(|message| ClientError::transport(None, message.clone()))
    }
}

#[async_trait::async_trait]
impl SourceReader for FakePlatform {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, ClientError> {
        Ok(self.entities(kind))
    }

    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError> {
        self.state
            .lock()
            .find(kind, id)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("{kind} {id}")))
    }

    async fn related(
        &self,
        _kind: EntityKind,
        id: EntityId,
        relation: Relation,
    ) -> Result<Vec<Entity>, ClientError> {
        let state = self.state.lock();
        let ids = state.related.get(&(id, relation)).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|child| state.find(relation.child_kind(), child).cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl TargetClient for FakePlatform {
    async fn ping(&self) -> Result<(), ClientError> {
        match self.state.lock().ping_failure.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError> {
        SourceReader::get(self, kind, id).await
    }

    async fn find_by_name(
        &self,
        kind: EntityKind,
        name: &str,
        scope: Scope,
    ) -> Result<Vec<Entity>, ClientError> {
        let mut state = self.state.lock();
        state.lookups += 1;
        if let Some(error) = Self::lookup_error(&state) {
            return Err(error);
        }
        Ok(state
            .entities
            .iter()
            .filter(|e| e.kind == kind && e.name.trim() == name.trim())
            .filter(|e| Self::in_scope(e, scope))
            .cloned()
            .collect())
    }

    async fn find(
        &self,
        kind: EntityKind,
        filters: &[(String, String)],
    ) -> Result<Vec<Entity>, ClientError> {
        let state = self.state.lock();
        if let Some(error) = Self::lookup_error(&state) {
            return Err(error);
        }
        Ok(state
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| filters.iter().all(|(f, v)| Self::matches_filter(e, f, v)))
            .cloned()
            .collect())
    }

    async fn create(&self, kind: EntityKind, payload: Value) -> Result<Entity, ClientError> {
        let mut state = self.state.lock();
        state.create_attempts.push((kind, payload.clone()));

        if let Some(rule) = state
            .rejections
            .iter_mut()
            .find(|r| r.kind == kind && r.remaining > 0)
        {
            rule.remaining -= 1;
            return Err(rule.error.clone());
        }

        let id = state.fresh_id();
        let mut record = payload;
        if let Value::Object(fields) = &mut record {
            fields.insert("id".into(), Value::from(id.0));
        }
        let entity = Entity::from_record(kind, record)?;
        state.entities.push(entity.clone());
        state.created.push(id);
        Ok(entity)
    }

    async fn patch(
        &self,
        kind: EntityKind,
        id: EntityId,
        partial: Value,
    ) -> Result<Entity, ClientError> {
        let mut state = self.state.lock();
        state.patches.push((kind, id, partial.clone()));
        let entity = state
            .entities
            .iter_mut()
            .find(|e| e.kind == kind && e.id == id)
            .ok_or_else(|| ClientError::not_found(format!("{kind} {id}")))?;
        if let Value::Object(fields) = partial {
            entity.fields.extend(fields);
        }
        Ok(entity.clone())
    }

    async fn attach(
        &self,
        parent_kind: EntityKind,
        parent: EntityId,
        relation: Relation,
        child: EntityId,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        if state.find(parent_kind, parent).is_none() {
            return Err(ClientError::not_found(format!("{parent_kind} {parent}")));
        }
        state.attachments.push(Attachment {
            parent_kind,
            parent,
            relation,
            child,
        });
        Ok(())
    }

    fn resource_url(&self, kind: EntityKind, id: EntityId) -> String {
        Self::api_path(kind, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_entities_are_found_by_name_in_scope() {
        let platform = FakePlatform::new();
        let id = platform.seed(fixtures::inventory("Prod Inv", 5));

        let found = platform
            .find_by_name(EntityKind::Inventory, "Prod Inv", Scope::Organization(EntityId(5)))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(platform.lookup_count(), 1);
    }

    #[tokio::test]
    async fn rejections_are_consumed() {
        let platform = FakePlatform::new();
        platform.reject_creates(EntityKind::Schedule, 1, ClientError::validation(400, "bad"));

        let payload = serde_json::json!({ "name": "nightly" });
        assert!(platform
            .create(EntityKind::Schedule, payload.clone())
            .await
            .unwrap_err()
            .is_validation());
        assert!(platform.create(EntityKind::Schedule, payload).await.is_ok());
        assert_eq!(platform.create_attempts(EntityKind::Schedule).len(), 2);
        assert_eq!(platform.created(EntityKind::Schedule).len(), 1);
    }
}
