//! Read/write automation-controller client

use crate::client::{collection, entities, item, ApiClient};
use crate::endpoint::Endpoint;
use mig_model::{ClientError, Entity, EntityId, EntityKind, Relation, Scope, TargetClient};
use serde_json::{json, Value};

/// API prefix of the target platform
pub const TARGET_API_PREFIX: &str = "/api/controller/v2";

/// [`TargetClient`] over the controller REST API
#[derive(Debug, Clone)]
pub struct ControllerTarget {
    client: ApiClient,
}

impl ControllerTarget {
    /// Connect to a controller endpoint
    ///
    /// # Errors
    /// Returns a transport error for an invalid host or token.
    pub fn new(endpoint: &Endpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ApiClient::new(endpoint, TARGET_API_PREFIX)?,
        })
    }

    fn created(kind: EntityKind, response: Option<Value>) -> Result<Entity, ClientError> {
        let record = response
            .ok_or_else(|| ClientError::Decode(format!("empty response creating {kind}")))?;
        Entity::from_record(kind, record)
    }
}

#[async_trait::async_trait]
impl TargetClient for ControllerTarget {
    async fn ping(&self) -> Result<(), ClientError> {
        self.client.get_json("ping/").await.map(|_| ())
    }

    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError> {
        let value = self.client.get_json(&item(kind, id)).await?;
        Entity::from_record(kind, value)
    }

    async fn find_by_name(
        &self,
        kind: EntityKind,
        name: &str,
        scope: Scope,
    ) -> Result<Vec<Entity>, ClientError> {
        let name = name.trim();
        let mut query = vec![("name".to_string(), name.to_string())];
        if let Some((field, value)) = scope.query_pair() {
            query.push((field.to_string(), value));
        }

        let values = self.client.list_json(&collection(kind), &query).await?;
        let mut found = entities(kind, values)?;
        found.retain(|e| e.name.trim() == name);
        tracing::debug!("Found {} {}(s) named '{}' in {}", found.len(), kind, name, scope);
        Ok(found)
    }

    async fn find(
        &self,
        kind: EntityKind,
        filters: &[(String, String)],
    ) -> Result<Vec<Entity>, ClientError> {
        let values = self.client.list_json(&collection(kind), filters).await?;
        entities(kind, values)
    }

    async fn create(&self, kind: EntityKind, payload: Value) -> Result<Entity, ClientError> {
        let response = self.client.post_json(&collection(kind), &payload).await?;
        Self::created(kind, response)
    }

    async fn patch(
        &self,
        kind: EntityKind,
        id: EntityId,
        partial: Value,
    ) -> Result<Entity, ClientError> {
        match self.client.patch_json(&item(kind, id), &partial).await? {
            Some(record) => Entity::from_record(kind, record),
            None => self.get(kind, id).await,
        }
    }

    async fn attach(
        &self,
        parent_kind: EntityKind,
        parent_id: EntityId,
        relation: Relation,
        child_id: EntityId,
    ) -> Result<(), ClientError> {
        let path = format!("{}{}/", item(parent_kind, parent_id), relation.path());
        self.client
            .post_json(&path, &json!({ "id": child_id.0 }))
            .await
            .map(|_| ())
    }

    fn resource_url(&self, kind: EntityKind, id: EntityId) -> String {
        format!("{TARGET_API_PREFIX}/{}", item(kind, id))
    }
}
