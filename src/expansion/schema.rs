//! Expansion schemas
//!
//! A schema declares, per resource type, which relations may be expanded, the
//! URL route template of each relation and how deep expansion may go.
//!
//! Schemas are registered by name in a [`SchemaRegistry`]. A relation can point
//! at another registered resource instead of embedding its schema, so resources
//! may reference each other (articles ↔ tags) without building a cyclic object
//! graph. Lookups go through the registry lazily, via [`ExpansionSchema`].

use crate::core::error::ConfigError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Declaration of a single expandable relation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationSchema {
    /// Route template, may contain `:parentId` and `:itemId`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    /// Registered resource whose schema describes the related records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Inline child relations, used when `resource` is not set
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relations: IndexMap<String, RelationSchema>,
}

impl RelationSchema {
    /// Leaf relation with a route
    pub fn leaf(route: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            ..Default::default()
        }
    }

    /// Relation whose children come from a registered resource
    pub fn to_resource(resource: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            resource: Some(resource.into()),
            relations: IndexMap::new(),
        }
    }

    /// Add an inline child relation
    pub fn with_relation(mut self, name: impl Into<String>, relation: RelationSchema) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    fn is_leaf(&self) -> bool {
        self.resource.is_none() && self.relations.is_empty()
    }
}

/// Declaration of a resource type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Registry key (e.g. "articles")
    #[serde(default)]
    pub name: String,

    /// Collection URL (e.g. "/articles"); defaults to `/{name}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Explicit depth cap, required when the schema reaches itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    #[serde(default)]
    pub relations: IndexMap<String, RelationSchema>,
}

impl ResourceSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: RelationSchema) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// Collection URL of the resource
    pub fn collection_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| format!("/{}", self.name))
    }
}

fn relation_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("relation name pattern is valid")
    })
}

/// Registry of all resource schemas
///
/// Built once at startup and shared read-only (typically behind an `Arc`)
/// across concurrent requests.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    resources: HashMap<String, ResourceSchema>,
    depths: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Validate the declarations and compute each resource's depth
    ///
    /// Fails when a relation references an unknown resource, a relation name
    /// is not a plain identifier, or a cyclic schema declares no depth cap.
    pub fn build(schemas: impl IntoIterator<Item = ResourceSchema>) -> Result<Self, ConfigError> {
        let resources: HashMap<String, ResourceSchema> = schemas
            .into_iter()
            .map(|schema| (schema.name.clone(), schema))
            .collect();

        let mut registry = Self {
            resources,
            depths: HashMap::new(),
        };

        for schema in registry.resources.values() {
            registry.validate_relations(&schema.name, &schema.relations)?;
        }

        let mut depths = HashMap::new();
        for schema in registry.resources.values() {
            let mut visiting = vec![schema.name.as_str()];
            let walked = registry.walk_depth(&schema.relations, &mut visiting);

            let depth = match (walked, schema.depth) {
                (Some(walked), Some(cap)) => walked.min(cap),
                (Some(walked), None) => walked,
                (None, Some(cap)) => cap,
                (None, None) => {
                    return Err(ConfigError::UnboundedDepth {
                        resource: schema.name.clone(),
                    });
                }
            };

            tracing::debug!(resource = %schema.name, depth, "registered expansion schema");
            depths.insert(schema.name.clone(), depth);
        }
        registry.depths = depths;

        Ok(registry)
    }

    fn validate_relations(
        &self,
        owner: &str,
        relations: &IndexMap<String, RelationSchema>,
    ) -> Result<(), ConfigError> {
        for (name, relation) in relations {
            if !relation_name_pattern().is_match(name) {
                return Err(ConfigError::InvalidRelationName {
                    resource: owner.to_string(),
                    relation: name.clone(),
                });
            }

            if let Some(target) = &relation.resource {
                if !self.resources.contains_key(target) {
                    return Err(ConfigError::UnknownReference {
                        resource: owner.to_string(),
                        relation: name.clone(),
                        target: target.clone(),
                    });
                }
            }

            self.validate_relations(owner, &relation.relations)?;
        }
        Ok(())
    }

    /// Longest relation chain below `relations`; `None` when a cycle is reachable
    fn walk_depth<'a>(
        &'a self,
        relations: &'a IndexMap<String, RelationSchema>,
        visiting: &mut Vec<&'a str>,
    ) -> Option<usize> {
        let mut deepest = 0;

        for relation in relations.values() {
            let below = match &relation.resource {
                Some(target) => {
                    if visiting.contains(&target.as_str()) {
                        return None;
                    }
                    let schema = self.resources.get(target)?;
                    visiting.push(target.as_str());
                    let below = self.walk_depth(&schema.relations, visiting);
                    visiting.pop();
                    below?
                }
                None => self.walk_depth(&relation.relations, visiting)?,
            };
            deepest = deepest.max(below + 1);
        }

        Some(deepest)
    }

    /// Root schema view for a resource
    pub fn schema(&self, resource: &str) -> Option<ExpansionSchema<'_>> {
        let declaration = self.resources.get(resource)?;
        Some(ExpansionSchema {
            registry: self,
            relations: &declaration.relations,
            depth: self.depths.get(resource).copied().unwrap_or(0),
        })
    }

    /// Raw declaration of a resource
    pub fn resource(&self, resource: &str) -> Option<&ResourceSchema> {
        self.resources.get(resource)
    }

    /// All registered resource names
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }
}

/// Read-only view over one level of an expansion schema
///
/// `depth` is the number of relation segments that may still be expanded
/// below this level.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionSchema<'r> {
    registry: &'r SchemaRegistry,
    relations: &'r IndexMap<String, RelationSchema>,
    depth: usize,
}

impl<'r> ExpansionSchema<'r> {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Declared relation names at this level
    pub fn relation_names(&self) -> Vec<&'r str> {
        self.relations.keys().map(String::as_str).collect()
    }

    pub fn relation(&self, name: &str) -> Option<&'r RelationSchema> {
        self.relations.get(name)
    }

    /// Nested schema for `relation`, or `None` at a leaf or for an undeclared relation
    pub fn children(&self, relation: &str) -> Option<ExpansionSchema<'r>> {
        let declaration = self.relations.get(relation)?;
        if declaration.is_leaf() {
            return None;
        }

        let relations = match &declaration.resource {
            Some(target) => &self.registry.resources.get(target)?.relations,
            None => &declaration.relations,
        };

        Some(ExpansionSchema {
            registry: self.registry,
            relations,
            depth: self.depth.saturating_sub(1),
        })
    }

    /// Route template declared for a relation path relative to this level
    pub fn route_template<S: AsRef<str>>(&self, path: &[S]) -> Option<&'r str> {
        let (last, parents) = path.split_last()?;
        let mut schema = *self;
        for segment in parents {
            schema = schema.children(segment.as_ref())?;
        }
        schema.relation(last.as_ref())?.route.as_deref()
    }

    /// Whether every segment of `path` names a declared relation
    pub fn declares<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut schema = *self;
        for segment in parents {
            match schema.children(segment.as_ref()) {
                Some(child) => schema = child,
                None => return false,
            }
        }
        schema.relation(last.as_ref()).is_some()
    }
}
