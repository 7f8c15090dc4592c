//! Lead, client-request and deal endpoints. Every mutation goes through the
//! authorizer first; listings are filtered by the actor's resolved scope.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::identity;
use crate::authz::Action;
use crate::pipeline::{
    ClientRequest, Deal, DealPatch, Lead, LeadPatch, LeadStatus, NewClientRequest, NewDeal,
    NewLead, RequestDecision,
};
use crate::shared::error::CoreError;
use crate::shared::state::AppState;

// ===== Leads =====

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewLead>,
) -> Result<Json<Lead>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::CreateLead, None)
        .await?;
    let lead = state
        .pipeline
        .create_lead(id.organization_id, id.actor_id, body)
        .await?;
    Ok(Json(lead))
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Lead>>, CoreError> {
    let id = identity(&headers)?;
    state
        .directory
        .require_actor(id.organization_id, id.actor_id)
        .await?;
    let scope = state
        .directory
        .resolve_scope(id.organization_id, id.actor_id)
        .await;
    Ok(Json(state.pipeline.leads_for_owners(id.organization_id, &scope).await))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Lead>, CoreError> {
    let id = identity(&headers)?;
    state
        .directory
        .require_actor(id.organization_id, id.actor_id)
        .await?;
    let lead = state.pipeline.lead(id.organization_id, lead_id).await?;
    let scope = state
        .directory
        .resolve_scope(id.organization_id, id.actor_id)
        .await;
    if !scope.contains(&lead.owner_id) {
        return Err(CoreError::OutOfScope(format!(
            "lead {lead_id} is outside the scope of {}",
            id.actor_id
        )));
    }
    Ok(Json(lead))
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
    Json(patch): Json<LeadPatch>,
) -> Result<Json<Lead>, CoreError> {
    let id = identity(&headers)?;
    let lead = state.pipeline.lead(id.organization_id, lead_id).await?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::UpdateLead,
            Some(lead.owner_id),
        )
        .await?;
    let updated = state
        .pipeline
        .update_lead(id.organization_id, lead_id, id.actor_id, patch)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct LeadStatusRequest {
    pub status: LeadStatus,
}

pub async fn transition_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
    Json(body): Json<LeadStatusRequest>,
) -> Result<Json<Lead>, CoreError> {
    let id = identity(&headers)?;
    let lead = state.pipeline.lead(id.organization_id, lead_id).await?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::UpdateLead,
            Some(lead.owner_id),
        )
        .await?;
    let updated = state
        .pipeline
        .transition_lead(id.organization_id, lead_id, id.actor_id, body.status)
        .await?;
    Ok(Json(updated))
}

pub async fn convert_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Deal>, CoreError> {
    let id = identity(&headers)?;
    let lead = state.pipeline.lead(id.organization_id, lead_id).await?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::ConvertLead,
            Some(lead.owner_id),
        )
        .await?;
    let deal = state
        .pipeline
        .convert_lead(id.organization_id, lead_id, id.actor_id)
        .await?;
    Ok(Json(deal))
}

// ===== Client requests =====

pub async fn create_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewClientRequest>,
) -> Result<Json<ClientRequest>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::CreateRequest, None)
        .await?;
    let request = state
        .pipeline
        .create_request(id.organization_id, id.actor_id, body)
        .await?;
    Ok(Json(request))
}

pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ClientRequest>>, CoreError> {
    let id = identity(&headers)?;
    state
        .directory
        .require_actor(id.organization_id, id.actor_id)
        .await?;
    let scope = state
        .directory
        .resolve_scope(id.organization_id, id.actor_id)
        .await;
    Ok(Json(
        state.pipeline.requests_for_owners(id.organization_id, &scope).await,
    ))
}

/// Pending requests routed to the calling leader for decision.
pub async fn request_inbox(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ClientRequest>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::DecideRequest, None)
        .await?;
    Ok(Json(
        state
            .pipeline
            .requests_routed_to(id.organization_id, id.actor_id)
            .await,
    ))
}

pub async fn decide_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
    Json(decision): Json<RequestDecision>,
) -> Result<Json<ClientRequest>, CoreError> {
    let id = identity(&headers)?;
    let grant = state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::DecideRequest, None)
        .await?;
    let request = state
        .pipeline
        .decide_request(id.organization_id, request_id, &grant.actor, decision)
        .await?;
    Ok(Json(request))
}

pub async fn convert_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Deal>, CoreError> {
    let id = identity(&headers)?;
    let request = state.pipeline.request(id.organization_id, request_id).await?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::ConvertRequest,
            Some(request.owner_id),
        )
        .await?;
    let deal = state
        .pipeline
        .convert_request(id.organization_id, request_id, id.actor_id)
        .await?;
    Ok(Json(deal))
}

// ===== Deals =====

pub async fn create_deal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewDeal>,
) -> Result<Json<Deal>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::CreateDeal, None)
        .await?;
    let deal = state
        .pipeline
        .create_deal(id.organization_id, id.actor_id, body)
        .await?;
    Ok(Json(deal))
}

pub async fn list_deals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Deal>>, CoreError> {
    let id = identity(&headers)?;
    state
        .directory
        .require_actor(id.organization_id, id.actor_id)
        .await?;
    let scope = state
        .directory
        .resolve_scope(id.organization_id, id.actor_id)
        .await;
    Ok(Json(state.pipeline.deals_for_owners(id.organization_id, &scope).await))
}

pub async fn update_deal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(deal_id): Path<Uuid>,
    Json(patch): Json<DealPatch>,
) -> Result<Json<Deal>, CoreError> {
    let id = identity(&headers)?;
    let deal = state.pipeline.deal(id.organization_id, deal_id).await?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::UpdateDeal,
            Some(deal.owner_id),
        )
        .await?;
    let updated = state
        .pipeline
        .update_deal(id.organization_id, deal_id, id.actor_id, patch)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_deal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(deal_id): Path<Uuid>,
) -> Result<Json<Deal>, CoreError> {
    let id = identity(&headers)?;
    let deal = state.pipeline.deal(id.organization_id, deal_id).await?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::DeleteDeal,
            Some(deal.owner_id),
        )
        .await?;
    let removed = state
        .pipeline
        .delete_deal(id.organization_id, deal_id, id.actor_id)
        .await?;
    Ok(Json(removed))
}
