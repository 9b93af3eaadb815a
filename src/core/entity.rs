//! Entity traits consumed by the tree projector
//!
//! Every value handed to the projector implements [`Projectable`]. Values that
//! also expose a [`RelationDescriptor`] have their relation fields replaced by
//! projection nodes; everything else is opaque and passes through unchanged.

use serde_json::Value;

/// A value the projector can serialize
pub trait Projectable: Send + Sync {
    /// Identifier substituted into `:parentId` / `:itemId` route placeholders
    fn identifier(&self) -> Option<String>;

    /// The plain wire-format record, relation fields in their raw form
    fn to_wire(&self) -> Value;

    /// The relation capability of this value
    ///
    /// Returns `None` by default: the value is treated as opaque data.
    fn relations(&self) -> Option<&dyn RelationDescriptor> {
        None
    }
}

/// Explicit declaration of which fields of an entity are relations
///
/// # Example
///
/// ```rust,ignore
/// impl RelationDescriptor for Article {
///     fn relation_names(&self) -> Vec<&str> {
///         vec!["tags", "category"]
///     }
///
///     fn related(&self, relation: &str) -> Related<'_> {
///         match relation {
///             "tags" => Related::many(self.tags.iter().map(|t| t as &dyn Projectable)),
///             "category" => Related::from_option(self.category.as_ref().map(|c| c as _)),
///             _ => Related::Absent,
///         }
///     }
/// }
/// ```
pub trait RelationDescriptor {
    /// Names of the relation fields, in output order
    fn relation_names(&self) -> Vec<&str>;

    /// Current (possibly populated) value of a relation field
    fn related(&self, relation: &str) -> Related<'_>;
}

/// Borrowed view over a relation field
pub enum Related<'a> {
    /// To-many relation
    ///
    /// `total` is the size of the whole relation when the populated items are
    /// only one page of it.
    Many {
        items: Vec<&'a dyn Projectable>,
        total: Option<usize>,
    },

    /// Present to-one relation
    One(&'a dyn Projectable),

    /// Absent to-one relation (or a relation the entity does not carry)
    Absent,
}

impl<'a> Related<'a> {
    /// Build an unpaged to-many view
    pub fn many<I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a dyn Projectable>,
    {
        Related::Many {
            items: items.into_iter().collect(),
            total: None,
        }
    }

    pub fn from_option(item: Option<&'a dyn Projectable>) -> Self {
        item.map_or(Related::Absent, Related::One)
    }

    /// Number of related records: collection size, or 1/0 for to-one
    pub fn total_count(&self) -> usize {
        match self {
            Related::Many { items, total } => total.unwrap_or(items.len()),
            Related::One(_) => 1,
            Related::Absent => 0,
        }
    }
}

/// Plain JSON is opaque data
///
/// Its identifier is the value itself for strings and numbers (an unpopulated
/// reference), or its `id` field for objects.
impl Projectable for Value {
    fn identifier(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => map.get("id").and_then(|id| id.identifier()),
            _ => None,
        }
    }

    fn to_wire(&self) -> Value {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_identifier() {
        assert_eq!(json!("abc").identifier(), Some("abc".to_string()));
        assert_eq!(json!(7).identifier(), Some("7".to_string()));
        assert_eq!(json!({"id": "x1", "name": "n"}).identifier(), Some("x1".to_string()));
        assert_eq!(json!({"name": "n"}).identifier(), None);
        assert_eq!(json!(null).identifier(), None);
    }

    #[test]
    fn test_value_is_opaque() {
        assert!(json!({"id": 1}).relations().is_none());
    }

    #[test]
    fn test_total_count() {
        let a = json!("a");
        let b = json!("b");
        let many = Related::many([&a as &dyn Projectable, &b as &dyn Projectable]);
        assert_eq!(many.total_count(), 2);

        let paged = Related::Many {
            items: vec![&a as &dyn Projectable],
            total: Some(10),
        };
        assert_eq!(paged.total_count(), 10);

        assert_eq!(Related::One(&a).total_count(), 1);
        assert_eq!(Related::Absent.total_count(), 0);
        assert_eq!(Related::from_option(None).total_count(), 0);
    }
}
