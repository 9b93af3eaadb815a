//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::expansion::schema::{ResourceSchema, SchemaRegistry};
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Pagination defaults shared by root listings and expanded relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when a directive does not set `per_page`/`limit`
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound every requested page size is clamped to
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl PaginationConfig {
    /// Clamp a requested page size to `[1, max_limit]`
    pub fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.max_limit.max(1))
    }
}

/// Complete configuration for the expansion layer
///
/// # Example
///
/// ```yaml
/// pagination:
///   default_limit: 20
///   max_limit: 200
/// gateway_timeout_ms: 2000
/// resources:
///   articles:
///     depth: 2
///     relations:
///       tags:
///         route: /articles/:parentId/tags
///         resource: tags
///   tags:
///     depth: 2
///     relations:
///       articles:
///         route: /tags/:parentId/articles
///         resource: articles
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnfoldConfig {
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Budget for a single population call, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_timeout_ms: Option<u64>,

    /// Schema declarations keyed by resource name
    #[serde(default)]
    pub resources: IndexMap<String, ResourceSchema>,
}

impl UnfoldConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Add a resource declaration, keyed by its name
    pub fn with_resource(mut self, schema: ResourceSchema) -> Self {
        self.resources.insert(schema.name.clone(), schema);
        self
    }

    /// Validate the declared schemas and build the shared registry
    ///
    /// Map keys name the resources; a `name` field inside a declaration is
    /// overwritten by its key.
    pub fn build_registry(&self) -> Result<SchemaRegistry, ConfigError> {
        SchemaRegistry::build(self.resources.iter().map(|(name, schema)| {
            let mut schema = schema.clone();
            schema.name = name.clone();
            schema
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG_YAML: &str = r#"
pagination:
  default_limit: 10
  max_limit: 200
gateway_timeout_ms: 500
resources:
  articles:
    url: /api/articles
    depth: 2
    relations:
      tags:
        route: /articles/:parentId/tags
        resource: tags
  tags:
    depth: 2
    relations:
      articles:
        route: /tags/:parentId/articles
        resource: articles
"#;

    #[test]
    fn test_pagination_defaults() {
        let config = PaginationConfig::default();
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.max_limit, 100);
        assert_eq!(config.clamp_limit(0), 1);
        assert_eq!(config.clamp_limit(500), 100);
    }

    #[test]
    fn test_yaml_parsing() {
        let config = UnfoldConfig::from_yaml_str(BLOG_YAML).unwrap();
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.pagination.max_limit, 200);
        assert_eq!(config.gateway_timeout_ms, Some(500));
        assert_eq!(config.resources.len(), 2);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = UnfoldConfig::from_yaml_str("resources: {}").unwrap();
        assert_eq!(config.pagination, PaginationConfig::default());
        assert!(config.gateway_timeout_ms.is_none());
    }

    #[test]
    fn test_build_registry_names_resources_by_key() {
        let config = UnfoldConfig::from_yaml_str(BLOG_YAML).unwrap();
        let registry = config.build_registry().unwrap();

        let articles = registry.resource("articles").unwrap();
        assert_eq!(articles.name, "articles");
        assert_eq!(articles.collection_url(), "/api/articles");
        assert_eq!(registry.schema("tags").unwrap().depth(), 2);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = UnfoldConfig::from_yaml_str(BLOG_YAML).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = UnfoldConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.resources.len(), config.resources.len());
        assert_eq!(parsed.pagination, config.pagination);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unfold.yaml");
        std::fs::write(&path, BLOG_YAML).unwrap();

        let config = UnfoldConfig::from_yaml_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.resources.len(), 2);
    }

    #[test]
    fn test_from_yaml_file_missing() {
        assert!(UnfoldConfig::from_yaml_file("/definitely/not/here.yaml").is_err());
    }
}
