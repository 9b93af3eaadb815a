//! Population gateway contract
//!
//! The expansion layer never fetches related records itself. Once the include
//! directives are parsed, the complete [`ExpansionSet`] is handed to a gateway
//! in one batched call, so nested relations are fetched without a round trip
//! per nesting level.

use crate::core::entity::Projectable;
use crate::core::error::PopulateError;
use crate::expansion::directive::ExpansionSet;
use async_trait::async_trait;

/// Attaches requested relations to root entities
///
/// Implementations must:
/// - honor `limit`/`skip`/`sort`/`filter` of every path per parent entity
///   (pagination is local to each parent, not global to the relation name);
/// - report the unpaged size of a paginated to-many relation so paginators
///   count the whole relation;
/// - treat the expansion set as read-only;
/// - fail atomically: on any error no entity is returned.
#[async_trait]
pub trait PopulationGateway: Send + Sync {
    type Entity: Projectable;

    async fn populate(
        &self,
        roots: Vec<Self::Entity>,
        paths: &ExpansionSet,
    ) -> Result<Vec<Self::Entity>, PopulateError>;
}
