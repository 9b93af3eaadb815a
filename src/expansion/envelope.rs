//! Response envelope
//!
//! Wraps a projected root result into the top-level `{meta, data}` shape:
//!
//! ```json
//! {
//!   "meta": { "url": "/articles", "paginator": { "totalEntries": 12, ... } },
//!   "data": [ { "title": "...", "tags": { "meta": { ... }, "data": [ ... ] } } ]
//! }
//! ```

use crate::core::entity::Projectable;
use crate::expansion::directive::{ExpansionOptions, ExpansionSet};
use crate::expansion::projector::{Paginator, TreeProjector};
use crate::expansion::schema::ExpansionSchema;
use serde::Serialize;
use serde_json::Value;

/// Root result handed to the envelope builder
pub enum RootResult<'a> {
    /// A single entity (absent when nothing matched)
    Single(Option<&'a dyn Projectable>),

    /// One page of a collection
    ///
    /// `options` is set when the collection is paginated; `total` counts the
    /// whole collection, not just this page.
    Collection {
        items: Vec<&'a dyn Projectable>,
        total: usize,
        options: Option<&'a ExpansionOptions>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeMeta {
    /// Canonical URL of the request
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginator: Option<Paginator>,
}

/// Top-level response body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub meta: EnvelopeMeta,
    pub data: Value,
}

/// Item-form URL below a collection URL
pub fn item_url(collection_url: &str, id: &str) -> String {
    format!("{}/{}", collection_url.trim_end_matches('/'), id)
}

/// Build the envelope for a root result
///
/// The root level is projected with stack `[]` and an expansion ceiling of
/// `schema.depth - 1`: the root itself is not wrapped in a meta/data pair, so
/// the deepest expandable relation sits one level above the schema depth.
pub fn build_envelope(
    root: RootResult<'_>,
    resource_url: impl Into<String>,
    set: &ExpansionSet,
    schema: Option<ExpansionSchema<'_>>,
) -> Envelope {
    let mut projector = TreeProjector::new(set);
    if let Some(schema) = schema {
        projector = projector.with_max_level(schema.depth().saturating_sub(1));
    }

    let (data, paginator) = match root {
        RootResult::Single(entity) => (projector.project(entity, schema, &[]), None),
        RootResult::Collection {
            items,
            total,
            options,
        } => (
            projector.project_all(&items, schema, &[]),
            options.map(|options| Paginator::new(total, options)),
        ),
    };

    Envelope {
        meta: EnvelopeMeta {
            url: resource_url.into(),
            paginator,
        },
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::core::document::{Document, Item};
    use crate::expansion::directive::parse_expand;
    use crate::expansion::schema::{RelationSchema, ResourceSchema, SchemaRegistry};
    use serde_json::json;
    use uuid::Uuid;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::build(vec![
            ResourceSchema::new("articles")
                .with_relation("tags", RelationSchema::leaf("/articles/:parentId/tags")),
        ])
        .unwrap()
    }

    fn article(tags: usize) -> Document {
        Document::new("articles", Uuid::new_v4()).with_many(
            "tags",
            (0..tags).map(|_| Item::reference(Uuid::new_v4())).collect(),
        )
    }

    #[test]
    fn test_single_entity_envelope() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["tags"], &schema, &PaginationConfig::default());
        let doc = article(2);
        let url = item_url("/articles", &doc.id.to_string());

        let envelope = build_envelope(RootResult::Single(Some(&doc)), url.clone(), &set, Some(schema));

        assert_eq!(envelope.meta.url, url);
        assert!(envelope.meta.paginator.is_none());
        assert_eq!(envelope.data["tags"]["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_paginated_collection_envelope() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = ExpansionSet::new();
        let docs = [article(1), article(0)];
        let options = ExpansionOptions {
            limit: 2,
            skip: 2,
            sort: None,
            filter: None,
        };

        let envelope = build_envelope(
            RootResult::Collection {
                items: docs.iter().map(|d| d as &dyn Projectable).collect(),
                total: 5,
                options: Some(&options),
            },
            "/articles",
            &set,
            Some(schema),
        );

        assert_eq!(
            serde_json::to_value(&envelope.meta).unwrap(),
            json!({
                "url": "/articles",
                "paginator": {"totalEntries": 5, "totalPages": 3, "page": 2, "perPage": 2}
            })
        );
        assert_eq!(envelope.data.as_array().unwrap().len(), 2);
        assert_eq!(envelope.data[0]["tags"]["meta"]["count"], 1);
    }

    #[test]
    fn test_unpaginated_collection_has_no_paginator() {
        let set = ExpansionSet::new();
        let envelope = build_envelope(
            RootResult::Collection {
                items: vec![],
                total: 0,
                options: None,
            },
            "/articles",
            &set,
            None,
        );
        let body = serde_json::to_value(&envelope).unwrap();
        assert_eq!(body, json!({"meta": {"url": "/articles"}, "data": []}));
    }

    #[test]
    fn test_absent_single_entity() {
        let set = ExpansionSet::new();
        let envelope = build_envelope(RootResult::Single(None), "/articles/x", &set, None);
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn test_item_url() {
        assert_eq!(item_url("/articles/", "7"), "/articles/7");
        assert_eq!(item_url("/articles", "7"), "/articles/7");
    }
}
