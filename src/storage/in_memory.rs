//! In-memory store for testing and development
//!
//! Keeps records per resource kind together with declared relations and the
//! links between records. It serves root listings as a [`ResourceService`]
//! and attaches related records as a [`PopulationGateway`].

use crate::core::document::{Document, Item};
use crate::core::error::PopulateError;
use crate::core::service::{Page, ResourceService};
use crate::core::sort::{SortDirection, SortSpec};
use crate::expansion::directive::{ExpansionOptions, ExpansionSet};
use crate::expansion::gateway::PopulationGateway;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Whether a relation points at one record or at many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Relation declared on a resource kind
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDef {
    pub target: String,
    pub cardinality: Cardinality,
}

type LinkKey = (String, Uuid, String);

#[derive(Debug, Default)]
struct State {
    records: HashMap<String, IndexMap<Uuid, Map<String, Value>>>,
    relations: HashMap<String, IndexMap<String, RelationDef>>,
    links: HashMap<LinkKey, Vec<Uuid>>,
}

/// In-memory resource store
///
/// Uses RwLock for thread-safe access; clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a relation from `kind` to `target`
    pub fn define_relation(
        &self,
        kind: &str,
        relation: &str,
        target: &str,
        cardinality: Cardinality,
    ) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        state.relations.entry(kind.to_string()).or_default().insert(
            relation.to_string(),
            RelationDef {
                target: target.to_string(),
                cardinality,
            },
        );
        Ok(())
    }

    /// Link `target_id` to the relation of a record
    ///
    /// A to-one relation is replaced; a to-many relation is appended to,
    /// ignoring duplicates.
    pub async fn link(&self, kind: &str, id: &Uuid, relation: &str, target_id: &Uuid) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let def = state
            .relation(kind, relation)
            .cloned()
            .ok_or_else(|| anyhow!("Relation '{}' is not defined on '{}'", relation, kind))?;
        if state.record(kind, id).is_none() {
            return Err(anyhow!("{} '{}' not found", kind, id));
        }
        if state.record(&def.target, target_id).is_none() {
            return Err(anyhow!("{} '{}' not found", def.target, target_id));
        }

        let linked = state
            .links
            .entry((kind.to_string(), *id, relation.to_string()))
            .or_default();
        match def.cardinality {
            Cardinality::One => *linked = vec![*target_id],
            Cardinality::Many if !linked.contains(target_id) => linked.push(*target_id),
            Cardinality::Many => {}
        }
        Ok(())
    }

    /// Number of records of a kind
    pub fn count(&self, kind: &str) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state.records.get(kind).map_or(0, IndexMap::len))
    }
}

impl State {
    fn relation(&self, kind: &str, relation: &str) -> Option<&RelationDef> {
        self.relations.get(kind)?.get(relation)
    }

    fn record(&self, kind: &str, id: &Uuid) -> Option<&Map<String, Value>> {
        self.records.get(kind)?.get(id)
    }

    fn linked(&self, kind: &str, id: &Uuid, relation: &str) -> &[Uuid] {
        self.links
            .get(&(kind.to_string(), *id, relation.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    /// Document with every declared relation as bare references
    fn document(&self, kind: &str, id: &Uuid, record: &Map<String, Value>) -> Document {
        let mut doc = Document::from_record(kind, *id, record.clone());
        let Some(relations) = self.relations.get(kind) else {
            return doc;
        };

        for (name, def) in relations {
            let linked = self.linked(kind, id, name);
            doc = match def.cardinality {
                Cardinality::Many => {
                    doc.with_many(name.as_str(), linked.iter().copied().map(Item::reference).collect())
                }
                Cardinality::One => {
                    doc.with_one(name.as_str(), linked.first().copied().map(Item::reference))
                }
            };
        }
        doc
    }

    /// Check that every requested path exists on `kind`
    fn validate(&self, kind: &str, paths: &ExpansionSet) -> Result<(), PopulateError> {
        for path in paths.paths() {
            let mut current = kind;
            for segment in path.segments() {
                let def = self.relation(current, segment).ok_or_else(|| {
                    PopulateError::UnknownRelation {
                        resource: current.to_string(),
                        relation: segment.to_string(),
                    }
                })?;
                current = def.target.as_str();
            }
        }
        Ok(())
    }

    /// Replace the references of every requested relation with records
    fn attach(&self, mut doc: Document, stack: &[String], paths: &ExpansionSet) -> Document {
        let Some(relations) = self.relations.get(&doc.kind) else {
            return doc;
        };

        for (name, def) in relations {
            let Some(options) = paths.child(stack, name) else {
                continue;
            };

            let mut nested_stack = stack.to_vec();
            nested_stack.push(name.clone());

            let candidates: Vec<(Uuid, &Map<String, Value>)> = self
                .linked(&doc.kind, &doc.id, name)
                .iter()
                .filter_map(|target_id| match self.record(&def.target, target_id) {
                    Some(record) => Some((*target_id, record)),
                    None => {
                        tracing::warn!(kind = %def.target, id = %target_id, "dangling link skipped");
                        None
                    }
                })
                .collect();

            doc = match def.cardinality {
                Cardinality::Many => {
                    let (window, total) = select(candidates, options);
                    let items = window
                        .into_iter()
                        .map(|(id, record)| {
                            let child = self.document(&def.target, &id, record);
                            Item::from(self.attach(child, &nested_stack, paths))
                        })
                        .collect();
                    doc.with_page(name.as_str(), items, total)
                }
                Cardinality::One => {
                    let item = candidates.first().map(|(id, record)| {
                        let child = self.document(&def.target, id, record);
                        Item::from(self.attach(child, &nested_stack, paths))
                    });
                    doc.with_one(name.as_str(), item)
                }
            };
        }
        doc
    }
}

/// Filter, sort and page records; returns the page and the filtered total
fn select<'r>(
    records: Vec<(Uuid, &'r Map<String, Value>)>,
    options: &ExpansionOptions,
) -> (Vec<(Uuid, &'r Map<String, Value>)>, usize) {
    let mut matching: Vec<_> = records
        .into_iter()
        .filter(|(_, record)| {
            options
                .filter
                .as_ref()
                .is_none_or(|filter| matches_filter(record, filter))
        })
        .collect();

    if let Some(sort) = &options.sort {
        matching.sort_by(|(_, a), (_, b)| compare_records(a, b, sort));
    }

    let total = matching.len();
    let page = matching
        .into_iter()
        .skip(options.skip)
        .take(options.limit)
        .collect();
    (page, total)
}

/// Match a record against a filter object
///
/// Keys are field names, optionally suffixed with a comparison operator
/// (`>`, `>=`, `<`, `<=`, `!=`). A bare key tests equality. A filter that is
/// not an object matches everything.
fn matches_filter(record: &Map<String, Value>, filter: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return true;
    };

    conditions.iter().all(|(key, expected)| {
        let (field, op) = split_operator(key);
        let actual = record.get(field).unwrap_or(&Value::Null);
        match op {
            "" => actual == expected,
            "!=" => actual != expected,
            _ => {
                let Some(ordering) = compare_values(actual, expected) else {
                    return false;
                };
                match op {
                    ">" => ordering == Ordering::Greater,
                    ">=" => ordering != Ordering::Less,
                    "<" => ordering == Ordering::Less,
                    "<=" => ordering != Ordering::Greater,
                    _ => false,
                }
            }
        }
    })
}

fn split_operator(key: &str) -> (&str, &str) {
    for op in [">=", "<=", "!=", ">", "<"] {
        if let Some(field) = key.strip_suffix(op) {
            return (field.trim_end(), op);
        }
    }
    (key, "")
}

/// Compare two values of the same JSON type
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Missing and null values sort first
fn compare_records(a: &Map<String, Value>, b: &Map<String, Value>, sort: &SortSpec) -> Ordering {
    for (field, direction) in sort {
        let left = a.get(field).filter(|v| !v.is_null());
        let right = b.get(field).filter(|v| !v.is_null());
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
        };
        let ordering = match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl ResourceService for InMemoryStore {
    async fn list(&self, resource: &str, options: &ExpansionOptions) -> Result<Page<Document>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let records: Vec<_> = state
            .records
            .get(resource)
            .map(|records| records.iter().map(|(id, record)| (*id, record)).collect())
            .unwrap_or_default();

        let (page, total) = select(records, options);
        let items = page
            .into_iter()
            .map(|(id, record)| state.document(resource, &id, record))
            .collect();

        Ok(Page { items, total })
    }

    async fn get(&self, resource: &str, id: &Uuid) -> Result<Option<Document>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state
            .record(resource, id)
            .map(|record| state.document(resource, id, record)))
    }

    async fn create(&self, resource: &str, mut record: Map<String, Value>) -> Result<Document> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = Uuid::new_v4();
        record.insert("id".to_string(), Value::String(id.to_string()));
        record
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        state
            .records
            .entry(resource.to_string())
            .or_default()
            .insert(id, record);

        let stored = state
            .record(resource, &id)
            .ok_or_else(|| anyhow!("{} '{}' vanished after insert", resource, id))?;
        Ok(state.document(resource, &id, stored))
    }
}

#[async_trait]
impl PopulationGateway for InMemoryStore {
    type Entity = Document;

    async fn populate(
        &self,
        roots: Vec<Document>,
        paths: &ExpansionSet,
    ) -> Result<Vec<Document>, PopulateError> {
        if paths.is_empty() {
            return Ok(roots);
        }

        let state = self.state.read().map_err(|e| PopulateError::Backend {
            message: format!("Failed to acquire read lock: {}", e),
        })?;

        for root in &roots {
            state.validate(&root.kind, paths)?;
        }

        Ok(roots
            .into_iter()
            .map(|root| state.attach(root, &[], paths))
            .collect())
    }
}
