//! Request pipeline: parse → fetch roots → populate → envelope
//!
//! One [`ExpansionPipeline`] is built at startup and shared across requests.
//! Every request gets its own [`ExpansionSet`]; the registry and
//! configuration are read-only.

use crate::config::{PaginationConfig, UnfoldConfig};
use crate::core::document::Document;
use crate::core::entity::Projectable;
use crate::core::error::{PopulateError, ResourceError, UnfoldError, UnfoldResult};
use crate::core::query::ExpandQuery;
use crate::core::service::ResourceService;
use crate::expansion::directive::{ExpansionSet, parse_expand};
use crate::expansion::envelope::{Envelope, RootResult, build_envelope, item_url};
use crate::expansion::gateway::PopulationGateway;
use crate::expansion::schema::{ExpansionSchema, SchemaRegistry};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shared gateway handle
pub type DocumentGateway = Arc<dyn PopulationGateway<Entity = Document>>;

/// Orchestrates a single expandable request
pub struct ExpansionPipeline {
    registry: Arc<SchemaRegistry>,
    pagination: PaginationConfig,
    gateway_timeout: Option<Duration>,
    service: Arc<dyn ResourceService>,
    gateway: DocumentGateway,
}

impl ExpansionPipeline {
    pub fn new(
        config: &UnfoldConfig,
        registry: Arc<SchemaRegistry>,
        service: Arc<dyn ResourceService>,
        gateway: DocumentGateway,
    ) -> Self {
        Self {
            registry,
            pagination: config.pagination,
            gateway_timeout: config.gateway_timeout_ms.map(Duration::from_millis),
            service,
            gateway,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    fn schema(&self, resource: &str) -> UnfoldResult<ExpansionSchema<'_>> {
        self.registry.schema(resource).ok_or_else(|| {
            ResourceError::UnknownResource {
                resource: resource.to_string(),
            }
            .into()
        })
    }

    fn collection_url(&self, resource: &str) -> String {
        self.registry
            .resource(resource)
            .map(|schema| schema.collection_url())
            .unwrap_or_else(|| format!("/{resource}"))
    }

    /// Parse the include directives of a request against a resource schema
    pub fn expansion_set(&self, resource: &str, query: &ExpandQuery) -> UnfoldResult<ExpansionSet> {
        let schema = self.schema(resource)?;
        Ok(parse_expand(&query.includes(), &schema, &self.pagination))
    }

    /// Hand the roots to the gateway, bounded by the configured timeout
    ///
    /// Dropping the returned future abandons the gateway call; nothing is
    /// emitted for an aborted request.
    pub async fn populate(&self, roots: Vec<Document>, set: &ExpansionSet) -> UnfoldResult<Vec<Document>> {
        let call = self.gateway.populate(roots, set);
        let result = match self.gateway_timeout {
            Some(budget) => match tokio::time::timeout(budget, call).await {
                Ok(result) => result,
                Err(_) => Err(PopulateError::Timeout {
                    millis: budget.as_millis() as u64,
                }),
            },
            None => call.await,
        };

        result.map_err(|e| {
            tracing::warn!(paths = set.len(), error = %e, "population failed");
            UnfoldError::from(e)
        })
    }

    /// List one page of a resource with its requested relations
    pub async fn list(&self, resource: &str, query: &ExpandQuery) -> UnfoldResult<Envelope> {
        let schema = self.schema(resource)?;
        let set = parse_expand(&query.includes(), &schema, &self.pagination);
        let options = query.root_options(&self.pagination);

        let page = self.service.list(resource, &options).await?;
        tracing::debug!(
            resource,
            returned = page.items.len(),
            total = page.total,
            paths = set.len(),
            "loaded root page"
        );

        let items = self.populate(page.items, &set).await?;
        let root = RootResult::Collection {
            items: items.iter().map(|item| item as &dyn Projectable).collect(),
            total: page.total,
            options: Some(&options),
        };

        Ok(build_envelope(root, self.collection_url(resource), &set, Some(schema)))
    }

    /// Fetch one record with its requested relations
    pub async fn get(&self, resource: &str, id: &Uuid, query: &ExpandQuery) -> UnfoldResult<Envelope> {
        let schema = self.schema(resource)?;
        let set = parse_expand(&query.includes(), &schema, &self.pagination);

        let document = self
            .service
            .get(resource, id)
            .await?
            .ok_or_else(|| ResourceError::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            })?;

        self.single(resource, document, &set, schema).await
    }

    /// Create a record and respond with its item-form envelope
    pub async fn create(
        &self,
        resource: &str,
        record: Map<String, Value>,
        query: &ExpandQuery,
    ) -> UnfoldResult<Envelope> {
        let schema = self.schema(resource)?;
        let set = parse_expand(&query.includes(), &schema, &self.pagination);

        let document = self.service.create(resource, record).await?;
        tracing::info!(resource, id = %document.id, "created record");

        self.single(resource, document, &set, schema).await
    }

    async fn single(
        &self,
        resource: &str,
        document: Document,
        set: &ExpansionSet,
        schema: ExpansionSchema<'_>,
    ) -> UnfoldResult<Envelope> {
        let url = item_url(&self.collection_url(resource), &document.id.to_string());
        let populated = self.populate(vec![document], set).await?;
        let entity = populated.first().map(|doc| doc as &dyn Projectable);

        Ok(build_envelope(RootResult::Single(entity), url, set, Some(schema)))
    }
}
