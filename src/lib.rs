//! # Unfold
//!
//! Relation expansion and projection for REST APIs.
//!
//! Clients ask for related records with compact `include` directives
//! (`tags:per_page(5):sort(name),category`). The framework parses them
//! against declared resource schemas, hands the whole expansion set to a
//! population gateway in a single batched call, and projects the result into
//! a uniform tree where every relation is either collapsed (`meta` only,
//! with a count) or expanded (`meta` with a paginator, plus `data`).
//!
//! ## Features
//!
//! - **Declarative schemas**: resources and relations declared in YAML or code
//! - **Per-relation pagination**: `page`, `per_page`/`limit`, `sort`, `filter`
//! - **Cyclic schemas**: self-referencing resources with an explicit depth cap
//! - **Pluggable storage**: `ResourceService` and `PopulationGateway` traits
//! - **In-memory store**: ready-made backend for tests and development
//! - **Axum server**: list/get/create routes with graceful shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unfold::prelude::*;
//!
//! let config = UnfoldConfig::from_yaml_file("unfold.yaml")?;
//! let store = InMemoryStore::new();
//! store.define_relation("articles", "tags", "tags", Cardinality::Many)?;
//!
//! ServerBuilder::new()
//!     .with_config(config)
//!     .with_store(store)
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```
//!
//! ```text
//! GET /articles?include=tags:per_page(2)
//! ```

pub mod config;
pub mod core;
pub mod expansion;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Document, ExpandQuery, Item, Page, Projectable, Related, RelationDescriptor,
        RelationValue, ResourceService, SortDirection, SortSpec, parse_sort,
    };

    // === Errors ===
    pub use crate::core::error::{
        ConfigError, PopulateError, RequestError, ResourceError, UnfoldError, UnfoldResult,
    };

    // === Expansion ===
    pub use crate::expansion::{
        Envelope, ExpandPath, ExpansionOptions, ExpansionPipeline, ExpansionSchema, ExpansionSet,
        Paginator, PopulationGateway, RelationSchema, ResourceSchema, RootResult, SchemaRegistry,
        TreeProjector, build_envelope, parse_expand,
    };

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::{Cardinality, InMemoryStore};

    // === Config ===
    pub use crate::config::{PaginationConfig, UnfoldConfig};

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use uuid::Uuid;
}
