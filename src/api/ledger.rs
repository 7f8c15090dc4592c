//! Activity ledger read endpoint for audit consumers.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::identity;
use crate::authz::Action;
use crate::ledger::{LedgerAction, LedgerQuery, LedgerQueryResult};
use crate::shared::error::CoreError;
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn parse_action(value: &str) -> Result<LedgerAction, CoreError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| CoreError::Validation(format!("unknown action {value}")))
}

pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<LedgerQueryResult>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ViewReports, None)
        .await?;

    let mut query = LedgerQuery::new().for_organization(id.organization_id);
    if let Some(actor) = params.actor_id {
        query = query.with_actor(actor);
    }
    if let Some(action) = &params.action {
        query = query.with_action(parse_action(action)?);
    }
    if let Some(entity_type) = &params.entity_type {
        query.entity_type = Some(entity_type.clone());
    }
    if let Some(entity_id) = params.entity_id {
        query.entity_id = Some(entity_id);
    }
    if let (Some(start), Some(end)) = (params.start_time, params.end_time) {
        query = query.with_time_range(start, end);
    }
    if let Some(limit) = params.limit {
        query = query.with_limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.with_offset(offset);
    }

    let result = state
        .ledger
        .query(query)
        .await
        .map_err(|e| CoreError::PersistenceFailure(e.to_string()))?;
    Ok(Json(result))
}
