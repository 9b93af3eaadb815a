//! HTTP handlers for expandable resources
//!
//! Handlers are resource-agnostic: the resource name comes from the path and
//! is resolved against the schema registry by the pipeline.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{RequestError, UnfoldError};
use crate::core::query::ExpandQuery;
use crate::expansion::envelope::Envelope;
use crate::expansion::pipeline::ExpansionPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExpansionPipeline>,
}

fn query_or_default(query: Result<Query<ExpandQuery>, QueryRejection>) -> ExpandQuery {
    match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "ignoring unparseable query string");
            ExpandQuery::default()
        }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, UnfoldError> {
    Uuid::parse_str(raw).map_err(|_| {
        RequestError::InvalidEntityId {
            id: raw.to_string(),
        }
        .into()
    })
}

/// List a resource
///
/// GET /{resource}?page=&per_page=&sort=&filter=&include=
pub async fn list_resources(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: Result<Query<ExpandQuery>, QueryRejection>,
) -> Result<Json<Envelope>, UnfoldError> {
    let query = query_or_default(query);
    let envelope = state.pipeline.list(&resource, &query).await?;
    Ok(Json(envelope))
}

/// Get a single record
///
/// GET /{resource}/{id}?include=
pub async fn get_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    query: Result<Query<ExpandQuery>, QueryRejection>,
) -> Result<Json<Envelope>, UnfoldError> {
    let id = parse_id(&id)?;
    let query = query_or_default(query);
    let envelope = state.pipeline.get(&resource, &id, &query).await?;
    Ok(Json(envelope))
}

/// Create a record
///
/// POST /{resource}?include=
pub async fn create_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: Result<Query<ExpandQuery>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope>), UnfoldError> {
    let Json(body) = payload.map_err(|rejection| RequestError::InvalidBody {
        message: rejection.body_text(),
    })?;
    let Value::Object(record) = body else {
        return Err(RequestError::InvalidBody {
            message: "expected a JSON object".to_string(),
        }
        .into());
    };

    let query = query_or_default(query);
    let envelope = state.pipeline.create(&resource, record, &query).await?;
    Ok((StatusCode::CREATED, Json(envelope)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);

        let err = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
