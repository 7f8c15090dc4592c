//! Organization administration endpoints: bootstrap, profiles, business
//! units, teams, supervision.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::identity;
use crate::authz::Action;
use crate::ledger::LedgerAction;
use crate::org::{BusinessUnit, Organization, Profile, Role, Team};
use crate::shared::error::CoreError;
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub admin_name: String,
    pub admin_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrganizationResponse {
    pub organization: Organization,
    pub admin: Profile,
}

/// Bootstrap endpoint: creates the tenant and its first admin profile. The
/// only route that takes no identity headers.
pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrganizationRequest>,
) -> Result<Json<CreateOrganizationResponse>, CoreError> {
    let organization = state.directory.create_organization(body.name).await;
    let mut admin = Profile::new(organization.id, body.admin_name, Role::Admin);
    if let Some(email) = body.admin_email {
        admin = admin.with_email(email);
    }
    let admin = state.directory.create_profile(admin).await?;
    Ok(Json(CreateOrganizationResponse { organization, admin }))
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub business_unit_id: Option<Uuid>,
}

pub async fn invite_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<InviteUserRequest>,
) -> Result<Json<Profile>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::InviteUser, None)
        .await?;

    let mut profile = Profile::new(id.organization_id, body.full_name, body.role);
    if let Some(email) = body.email {
        profile = profile.with_email(email);
    }
    if let Some(unit) = body.business_unit_id {
        profile = profile.with_business_unit(unit);
    }
    let profile = state.directory.create_profile(profile).await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::UserInvited,
            "profile",
            Some(profile.id),
            serde_json::json!({ "role": profile.role.as_str() }),
        )
        .await;
    Ok(Json(profile))
}

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Profile>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ViewReports, None)
        .await?;
    Ok(Json(
        state.directory.profiles_in_organization(id.organization_id).await,
    ))
}

pub async fn deactivate_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Profile>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    let profile = state
        .directory
        .deactivate_profile(id.organization_id, profile_id)
        .await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::ProfileDeactivated,
            "profile",
            Some(profile_id),
            serde_json::json!({}),
        )
        .await;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct CreateBusinessUnitRequest {
    pub name: String,
    pub leader_id: Option<Uuid>,
}

pub async fn create_business_unit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBusinessUnitRequest>,
) -> Result<Json<BusinessUnit>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    let unit = state
        .directory
        .create_business_unit(id.organization_id, body.name, body.leader_id)
        .await?;
    Ok(Json(unit))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub business_unit_id: Option<Uuid>,
    pub leader_id: Option<Uuid>,
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTeamRequest>,
) -> Result<Json<Team>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    let team = state
        .directory
        .create_team(id.organization_id, body.name, body.business_unit_id, body.leader_id)
        .await?;
    Ok(Json(team))
}

#[derive(Debug, Deserialize)]
pub struct SetTeamLeaderRequest {
    pub leader_id: Uuid,
}

pub async fn set_team_leader(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    Json(body): Json<SetTeamLeaderRequest>,
) -> Result<Json<Team>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    let team = state
        .directory
        .set_team_leader(id.organization_id, team_id, body.leader_id)
        .await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::TeamLeaderChanged,
            "team",
            Some(team_id),
            serde_json::json!({ "leader_id": body.leader_id }),
        )
        .await;
    Ok(Json(team))
}

#[derive(Debug, Deserialize)]
pub struct JoinTeamRequest {
    pub profile_id: Uuid,
}

pub async fn join_team(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    Json(body): Json<JoinTeamRequest>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    state
        .directory
        .join_team(id.organization_id, body.profile_id, team_id)
        .await?;
    Ok(Json(serde_json::json!({ "status": "joined" })))
}

#[derive(Debug, Deserialize)]
pub struct SetSupervisionRequest {
    pub supervisor_id: Uuid,
}

pub async fn set_supervision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<SetSupervisionRequest>,
) -> Result<Json<Profile>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    let profile = state
        .directory
        .set_supervision(id.organization_id, profile_id, body.supervisor_id)
        .await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::SupervisionGranted,
            "profile",
            Some(profile_id),
            serde_json::json!({ "supervisor_id": body.supervisor_id }),
        )
        .await;
    Ok(Json(profile))
}

pub async fn clear_supervision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Profile>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ManageOrganization, None)
        .await?;
    let profile = state
        .directory
        .clear_supervision(id.organization_id, profile_id)
        .await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::SupervisionCleared,
            "profile",
            Some(profile_id),
            serde_json::json!({}),
        )
        .await;
    Ok(Json(profile))
}

#[derive(Debug, Serialize)]
pub struct ScopeResponse {
    pub actor_id: Uuid,
    pub scope: HashSet<Uuid>,
}

/// The actor's own resolved visibility scope. Useful for client-side
/// filtering; recomputed on every call.
pub async fn resolve_scope(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ScopeResponse>, CoreError> {
    let id = identity(&headers)?;
    state
        .directory
        .require_actor(id.organization_id, id.actor_id)
        .await?;
    let scope = state
        .directory
        .resolve_scope(id.organization_id, id.actor_id)
        .await;
    Ok(Json(ScopeResponse {
        actor_id: id.actor_id,
        scope,
    }))
}
