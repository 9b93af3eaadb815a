//! Core module containing fundamental traits and types for the framework

pub mod document;
pub mod entity;
pub mod error;
pub mod query;
pub mod service;
pub mod sort;

pub use document::{Document, Item, RelationValue};
pub use entity::{Projectable, Related, RelationDescriptor};
pub use error::{
    ConfigError, ErrorResponse, PopulateError, RequestError, ResourceError, UnfoldError,
    UnfoldResult,
};
pub use query::ExpandQuery;
pub use service::{Page, ResourceService};
pub use sort::{SortDirection, SortSpec, parse_sort};
