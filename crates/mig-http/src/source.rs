//! Read-only AWX client

use crate::client::{collection, entities, item, ApiClient};
use crate::endpoint::Endpoint;
use mig_model::{ClientError, Entity, EntityId, EntityKind, Relation, SourceReader};

/// API prefix of the source platform
pub const SOURCE_API_PREFIX: &str = "/api/v2";

/// [`SourceReader`] over the AWX REST API
#[derive(Debug, Clone)]
pub struct AwxSource {
    client: ApiClient,
}

impl AwxSource {
    /// Connect to an AWX endpoint
    ///
    /// # Errors
    /// Returns a transport error for an invalid host or token.
    pub fn new(endpoint: &Endpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ApiClient::new(endpoint, SOURCE_API_PREFIX)?,
        })
    }
}

#[async_trait::async_trait]
impl SourceReader for AwxSource {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, ClientError> {
        let values = self.client.list_json(&collection(kind), &[]).await?;
        entities(kind, values)
    }

    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError> {
        let value = self.client.get_json(&item(kind, id)).await?;
        Entity::from_record(kind, value)
    }

    async fn related(
        &self,
        kind: EntityKind,
        id: EntityId,
        relation: Relation,
    ) -> Result<Vec<Entity>, ClientError> {
        let path = format!("{}{}/", item(kind, id), relation.path());
        let values = self.client.list_json(&path, &[]).await?;
        entities(relation.child_kind(), values)
    }
}
