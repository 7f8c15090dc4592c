//! Commission-rate, salary and cost endpoints. Rate and salary changes go
//! through the temporal store's close-and-open enactment; history is
//! readable but never rewritten.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::identity;
use crate::authz::Action;
use crate::finance::{CostEntry, NewCostEntry};
use crate::ledger::LedgerAction;
use crate::org::Role;
use crate::shared::error::CoreError;
use crate::shared::state::AppState;
use crate::temporal::commission::CommissionKey;
use crate::temporal::salary::SalaryKey;
use crate::temporal::TemporalRecord;

fn parse_role(value: &str) -> Result<Role, CoreError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| CoreError::Validation(format!("unknown role {value}")))
}

#[derive(Debug, Deserialize)]
pub struct SetRateRequest {
    pub rate_per_million: f64,
    pub effective_from: Option<NaiveDate>,
}

pub async fn set_commission_rate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(role): Path<String>,
    Json(body): Json<SetRateRequest>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::UpdateCommissionConfig,
            None,
        )
        .await?;
    let role = parse_role(&role)?;
    let effective_from = body.effective_from.unwrap_or_else(|| Utc::now().date_naive());
    let version_id = state
        .commission
        .set_rate(
            id.organization_id,
            role,
            body.rate_per_million,
            effective_from,
            Some(id.actor_id),
        )
        .await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::CommissionRateChanged,
            "commission_config",
            Some(version_id),
            serde_json::json!({
                "role": role.as_str(),
                "rate_per_million": body.rate_per_million,
                "effective_from": effective_from,
            }),
        )
        .await;
    Ok(Json(serde_json::json!({ "version_id": version_id })))
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub date: Option<NaiveDate>,
}

pub async fn get_commission_rate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(role): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<TemporalRecord<CommissionKey>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ViewReports, None)
        .await?;
    let role = parse_role(&role)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let record = state.commission.rate_at(id.organization_id, role, date).await?;
    Ok(Json(record))
}

pub async fn commission_rate_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(role): Path<String>,
) -> Result<Json<Vec<TemporalRecord<CommissionKey>>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ViewReports, None)
        .await?;
    let role = parse_role(&role)?;
    Ok(Json(state.commission.history(id.organization_id, role).await))
}

#[derive(Debug, Deserialize)]
pub struct SetSalaryRequest {
    pub monthly_salary: f64,
    pub effective_from: Option<NaiveDate>,
}

pub async fn set_salary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<SetSalaryRequest>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::ManageSalary,
            Some(employee_id),
        )
        .await?;
    // The target must be a known profile, not just any uuid inside scope.
    state
        .directory
        .profile(id.organization_id, employee_id)
        .await
        .ok_or_else(|| CoreError::NotFound(format!("profile {employee_id}")))?;
    let effective_from = body.effective_from.unwrap_or_else(|| Utc::now().date_naive());
    let version_id = state
        .salaries
        .set_salary(
            id.organization_id,
            employee_id,
            body.monthly_salary,
            effective_from,
            Some(id.actor_id),
        )
        .await?;
    state
        .ledger
        .record(
            id.organization_id,
            Some(id.actor_id),
            LedgerAction::SalaryChanged,
            "employee_salary",
            Some(version_id),
            serde_json::json!({
                "employee_id": employee_id,
                "effective_from": effective_from,
            }),
        )
        .await;
    Ok(Json(serde_json::json!({ "version_id": version_id })))
}

pub async fn get_salary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<TemporalRecord<SalaryKey>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::ManageSalary,
            Some(employee_id),
        )
        .await?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let record = state
        .salaries
        .salary_at(id.organization_id, employee_id, date)
        .await?;
    Ok(Json(record))
}

pub async fn salary_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<Vec<TemporalRecord<SalaryKey>>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(
            id.organization_id,
            id.actor_id,
            Action::ManageSalary,
            Some(employee_id),
        )
        .await?;
    Ok(Json(
        state.salaries.history(id.organization_id, employee_id).await,
    ))
}

pub async fn add_cost_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewCostEntry>,
) -> Result<Json<CostEntry>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::AddCostEntry, None)
        .await?;
    let entry = state
        .costs
        .add_cost_entry(id.organization_id, id.actor_id, body)
        .await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct CostQuery {
    pub month: NaiveDate,
    pub business_unit_id: Option<Uuid>,
}

pub async fn list_costs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CostQuery>,
) -> Result<Json<Vec<CostEntry>>, CoreError> {
    let id = identity(&headers)?;
    state
        .authorizer
        .authorize(id.organization_id, id.actor_id, Action::ViewReports, None)
        .await?;
    Ok(Json(
        state
            .costs
            .costs_for_month(id.organization_id, query.month, query.business_unit_id)
            .await,
    ))
}
