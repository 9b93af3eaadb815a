//! Service trait for resource storage

use crate::core::document::Document;
use crate::expansion::directive::ExpansionOptions;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

/// One page of a root collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Size of the whole filtered collection
    pub total: usize,
}

/// Service trait for loading root resources
///
/// Implementations provide the root records; related records are attached
/// afterwards by a population gateway. The framework is agnostic to the
/// underlying storage mechanism.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// List one page of a resource, honoring `filter`, `sort`, `skip` and `limit`
    async fn list(&self, resource: &str, options: &ExpansionOptions) -> Result<Page<Document>>;

    /// Get a record by ID
    async fn get(&self, resource: &str, id: &Uuid) -> Result<Option<Document>>;

    /// Create a record from a JSON object
    async fn create(&self, resource: &str, record: Map<String, Value>) -> Result<Document>;
}
