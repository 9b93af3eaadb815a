//! Tree projection
//!
//! Walks an entity (or a collection of entities) together with the parsed
//! [`ExpansionSet`] and the resource schema, and replaces every relation field
//! with a projection node:
//!
//! - **Collapsed**: `{"meta": {"url": ..., "count": n}}`
//! - **Expanded**: `{"meta": {"url": ..., "paginator": {...}}, "data": ...}`
//!
//! Expanded nodes recurse into the related records with the subset of the
//! expansion set that lies below the relation, so recursion depth is bounded
//! by the longest parsed path.

use crate::core::entity::{Projectable, Related};
use crate::core::sort::SortSpec;
use crate::expansion::directive::{ExpansionOptions, ExpansionSet};
use crate::expansion::schema::ExpansionSchema;
use serde::Serialize;
use serde_json::Value;

/// Pagination metadata of an expanded relation or a root collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginator {
    pub total_entries: usize,
    pub total_pages: usize,
    pub page: usize,
    pub per_page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

impl Paginator {
    pub fn new(total_entries: usize, options: &ExpansionOptions) -> Self {
        let per_page = options.limit.max(1);
        Self {
            total_entries,
            total_pages: total_entries.div_ceil(per_page),
            page: options.page(),
            per_page,
            sort: options.sort.clone(),
        }
    }
}

/// `meta` block of a projection node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMeta {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginator: Option<Paginator>,
}

/// Projection of a single relation field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProjectionNode {
    Collapsed { meta: NodeMeta },
    Expanded { meta: NodeMeta, data: Value },
}

impl ProjectionNode {
    pub fn collapsed(url: String, count: usize) -> Self {
        ProjectionNode::Collapsed {
            meta: NodeMeta {
                url,
                count: Some(count),
                paginator: None,
            },
        }
    }

    pub fn expanded(url: String, paginator: Paginator, data: Value) -> Self {
        ProjectionNode::Expanded {
            meta: NodeMeta {
                url,
                count: None,
                paginator: Some(paginator),
            },
            data,
        }
    }

    pub fn meta(&self) -> &NodeMeta {
        match self {
            ProjectionNode::Collapsed { meta } | ProjectionNode::Expanded { meta, .. } => meta,
        }
    }

    /// JSON form of the node
    ///
    /// Nodes hold only strings, counts and JSON values, so serialization
    /// cannot fail.
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Substitute `:parentId` and `:itemId` in a route template
///
/// Missing identifiers are substituted with an empty string.
pub fn expand_route(template: &str, parent_id: Option<&str>, item_id: Option<&str>) -> String {
    template
        .replace(":parentId", parent_id.unwrap_or_default())
        .replace(":itemId", item_id.unwrap_or_default())
}

/// Recursive projector over one request's expansion set
#[derive(Debug, Clone, Copy)]
pub struct TreeProjector<'a> {
    set: &'a ExpansionSet,
    max_level: usize,
}

impl<'a> TreeProjector<'a> {
    pub fn new(set: &'a ExpansionSet) -> Self {
        Self {
            set,
            max_level: usize::MAX,
        }
    }

    /// Deepest stack length at which relations may still be expanded
    ///
    /// A ceiling of 0 allows only the relations of the root entity.
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Project a single entity; an absent entity projects to `null`
    pub fn project(
        &self,
        entity: Option<&dyn Projectable>,
        schema: Option<ExpansionSchema<'_>>,
        stack: &[String],
    ) -> Value {
        let Some(entity) = entity else {
            return Value::Null;
        };

        let record = entity.to_wire();
        let Some(descriptor) = entity.relations() else {
            return record;
        };
        let Value::Object(mut record) = record else {
            return record;
        };

        let parent_id = entity.identifier();
        for relation in descriptor.relation_names() {
            let node = self.project_relation(
                relation,
                descriptor.related(relation),
                parent_id.as_deref(),
                schema,
                stack,
            );
            record.insert(relation.to_string(), node.into_value());
        }

        Value::Object(record)
    }

    /// Project a collection, preserving order
    pub fn project_all(
        &self,
        entities: &[&dyn Projectable],
        schema: Option<ExpansionSchema<'_>>,
        stack: &[String],
    ) -> Value {
        Value::Array(
            entities
                .iter()
                .map(|entity| self.project(Some(*entity), schema, stack))
                .collect(),
        )
    }

    fn project_relation(
        &self,
        relation: &str,
        related: Related<'_>,
        parent_id: Option<&str>,
        schema: Option<ExpansionSchema<'_>>,
        stack: &[String],
    ) -> ProjectionNode {
        let total = related.total_count();
        let item_id = match &related {
            Related::One(item) => item.identifier(),
            _ => None,
        };
        let url = schema
            .and_then(|schema| schema.route_template(&[relation]))
            .map(|template| expand_route(template, parent_id, item_id.as_deref()))
            .unwrap_or_default();

        let options = if stack.len() <= self.max_level {
            self.set.child(stack, relation)
        } else {
            None
        };
        let Some(options) = options else {
            return ProjectionNode::collapsed(url, total);
        };

        let mut nested_stack = stack.to_vec();
        nested_stack.push(relation.to_string());
        let nested_set = self.set.subset(&nested_stack);
        let nested = TreeProjector {
            set: &nested_set,
            max_level: self.max_level,
        };
        let child_schema = schema.and_then(|schema| schema.children(relation));

        let data = match related {
            Related::Many { items, .. } => {
                let window = page_window(&items, total, options);
                nested.project_all(window, child_schema, &nested_stack)
            }
            Related::One(item) => nested.project(Some(item), child_schema, &nested_stack),
            Related::Absent => Value::Null,
        };

        ProjectionNode::expanded(url, Paginator::new(total, options), data)
    }
}

/// Items of the requested page
///
/// A page already cut by the source (fewer items than the total) is only
/// capped at `limit`. When a source hands over the whole relation, the
/// `skip`/`limit` window is applied here, so a page past the end is empty.
fn page_window<'i, 'p>(
    items: &'i [&'p dyn Projectable],
    total: usize,
    options: &ExpansionOptions,
) -> &'i [&'p dyn Projectable] {
    let start = if items.len() == total {
        options.skip.min(items.len())
    } else {
        0
    };
    let end = (start + options.limit).min(items.len());
    &items[start..end]
}
