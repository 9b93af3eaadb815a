//! Relation expansion
//!
//! Turns `include` directives into an [`ExpansionSet`], hands it to a
//! [`PopulationGateway`] and projects the populated entities into the
//! collapsed/expanded response tree.

pub mod directive;
pub mod envelope;
pub mod gateway;
pub mod pipeline;
pub mod projector;
pub mod schema;

pub use directive::{
    ExpandPath, ExpansionOptions, ExpansionSet, Modifier, parse_expand, parse_root_options,
};
pub use envelope::{Envelope, EnvelopeMeta, RootResult, build_envelope, item_url};
pub use gateway::PopulationGateway;
pub use pipeline::{DocumentGateway, ExpansionPipeline};
pub use projector::{NodeMeta, Paginator, ProjectionNode, TreeProjector, expand_route};
pub use schema::{ExpansionSchema, RelationSchema, ResourceSchema, SchemaRegistry};
