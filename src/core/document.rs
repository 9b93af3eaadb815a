//! Dynamic entity record
//!
//! [`Document`] is the entity shape produced by storage backends and filled in
//! by population gateways: scalar attributes plus relation slots that hold
//! either unpopulated references or nested documents.

use crate::core::entity::{Projectable, Related, RelationDescriptor};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored entity with its relation slots
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Resource kind (e.g. "articles")
    pub kind: String,

    pub id: Uuid,

    /// Non-relation fields
    pub attributes: Map<String, Value>,

    /// Relation fields, in declaration order
    pub relations: IndexMap<String, RelationValue>,
}

/// Content of a relation slot
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// To-many relation; `total` is set when `items` is a single page
    Many {
        items: Vec<Item>,
        total: Option<usize>,
    },

    /// To-one relation
    One(Option<Item>),
}

/// A related record: populated document or bare reference
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Document(Document),
    Reference(Value),
}

impl Document {
    pub fn new(kind: impl Into<String>, id: Uuid) -> Self {
        Self {
            kind: kind.into(),
            id,
            attributes: Map::new(),
            relations: IndexMap::new(),
        }
    }

    /// Build a document from a JSON object, taking `id` out of it if present
    pub fn from_record(kind: impl Into<String>, id: Uuid, mut record: Map<String, Value>) -> Self {
        record.remove("id");
        Self {
            kind: kind.into(),
            id,
            attributes: record,
            relations: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a to-many relation from its full item list
    pub fn with_many(mut self, relation: impl Into<String>, items: Vec<Item>) -> Self {
        self.relations
            .insert(relation.into(), RelationValue::Many { items, total: None });
        self
    }

    /// Set a to-many relation from one page of items and the relation's size
    pub fn with_page(mut self, relation: impl Into<String>, items: Vec<Item>, total: usize) -> Self {
        self.relations.insert(
            relation.into(),
            RelationValue::Many {
                items,
                total: Some(total),
            },
        );
        self
    }

    /// Set a to-one relation
    pub fn with_one(mut self, relation: impl Into<String>, item: Option<Item>) -> Self {
        self.relations.insert(relation.into(), RelationValue::One(item));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        if name == "id" {
            return None;
        }
        self.attributes.get(name)
    }
}

impl Item {
    /// Reference to a record by id
    pub fn reference(id: Uuid) -> Self {
        Item::Reference(Value::String(id.to_string()))
    }

    fn as_projectable(&self) -> &dyn Projectable {
        match self {
            Item::Document(doc) => doc,
            Item::Reference(value) => value,
        }
    }
}

impl From<Document> for Item {
    fn from(doc: Document) -> Self {
        Item::Document(doc)
    }
}

impl RelationValue {
    fn to_wire(&self) -> Value {
        match self {
            RelationValue::Many { items, .. } => {
                Value::Array(items.iter().map(Projectable::to_wire).collect())
            }
            RelationValue::One(Some(item)) => item.to_wire(),
            RelationValue::One(None) => Value::Null,
        }
    }
}

impl Projectable for Document {
    fn identifier(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn to_wire(&self) -> Value {
        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(self.id.to_string()));
        for (name, value) in &self.attributes {
            record.insert(name.clone(), value.clone());
        }
        for (name, value) in &self.relations {
            record.insert(name.clone(), value.to_wire());
        }
        Value::Object(record)
    }

    fn relations(&self) -> Option<&dyn RelationDescriptor> {
        Some(self)
    }
}

impl RelationDescriptor for Document {
    fn relation_names(&self) -> Vec<&str> {
        self.relations.keys().map(String::as_str).collect()
    }

    fn related(&self, relation: &str) -> Related<'_> {
        match self.relations.get(relation) {
            Some(RelationValue::Many { items, total }) => Related::Many {
                items: items.iter().map(Item::as_projectable).collect(),
                total: *total,
            },
            Some(RelationValue::One(Some(item))) => Related::One(item.as_projectable()),
            Some(RelationValue::One(None)) | None => Related::Absent,
        }
    }
}

impl Projectable for Item {
    fn identifier(&self) -> Option<String> {
        self.as_projectable().identifier()
    }

    fn to_wire(&self) -> Value {
        self.as_projectable().to_wire()
    }

    fn relations(&self) -> Option<&dyn RelationDescriptor> {
        self.as_projectable().relations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_wire_keeps_raw_relations() {
        let tag = Uuid::new_v4();
        let doc = Document::new("articles", Uuid::nil())
            .with_attribute("title", "Hello")
            .with_many("tags", vec![Item::reference(tag)])
            .with_one("category", None);

        let wire = doc.to_wire();
        assert_eq!(wire["id"], Uuid::nil().to_string());
        assert_eq!(wire["title"], "Hello");
        assert_eq!(wire["tags"], json!([tag.to_string()]));
        assert_eq!(wire["category"], Value::Null);
    }

    #[test]
    fn test_from_record_strips_id() {
        let record = json!({"id": "ignored", "name": "rust"});
        let doc = Document::from_record("tags", Uuid::nil(), record.as_object().unwrap().clone());
        assert!(doc.attributes.get("id").is_none());
        assert_eq!(doc.attribute("name"), Some(&json!("rust")));
    }

    #[test]
    fn test_relation_descriptor() {
        let category = Document::new("categories", Uuid::new_v4());
        let doc = Document::new("articles", Uuid::new_v4())
            .with_many("tags", vec![Item::reference(Uuid::new_v4())])
            .with_one("category", Some(category.clone().into()));

        assert_eq!(doc.relation_names(), vec!["tags", "category"]);
        assert_eq!(doc.related("tags").total_count(), 1);
        match doc.related("category") {
            Related::One(item) => assert_eq!(item.identifier(), category.identifier()),
            _ => panic!("expected a to-one relation"),
        }
        assert!(matches!(doc.related("missing"), Related::Absent));
    }
}
