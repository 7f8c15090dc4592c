//! Deals. The stage field is freely editable; won and lost are terminal by
//! convention only, so financial corrections stay possible. Winning a deal
//! stamps `closed_at` once and computes commission from the rate in force
//! at that instant.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use super::PipelineService;
use crate::ledger::LedgerAction;
use crate::shared::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Prospecting,
    Qualified,
    Negotiation,
    ContractSent,
    Won,
    Lost,
}

impl DealStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prospecting => "prospecting",
            Self::Qualified => "qualified",
            Self::Negotiation => "negotiation",
            Self::ContractSent => "contract_sent",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealSource {
    Direct,
    Lead,
    ClientRequest,
}

impl DealSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Lead => "lead",
            Self::ClientRequest => "client_request",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub stage: DealStage,
    pub deal_value: f64,
    pub commission_value: Option<f64>,
    pub probability: u8,
    pub expected_close_date: Option<NaiveDate>,
    pub closed_at: Option<DateTime<Utc>>,
    pub source: DealSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDeal {
    pub title: String,
    pub deal_value: f64,
    pub probability: Option<u8>,
    pub expected_close_date: Option<NaiveDate>,
}

/// Typed patch; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealPatch {
    pub title: Option<String>,
    pub stage: Option<DealStage>,
    pub deal_value: Option<f64>,
    pub probability: Option<u8>,
    pub expected_close_date: Option<NaiveDate>,
}

const DEFAULT_DEAL_PROBABILITY: u8 = 50;

fn validate_probability(probability: u8) -> Result<(), CoreError> {
    if probability > 100 {
        return Err(CoreError::Validation(format!(
            "probability must be between 0 and 100, got {probability}"
        )));
    }
    Ok(())
}

impl PipelineService {
    pub async fn create_deal(
        &self,
        organization_id: Uuid,
        owner_id: Uuid,
        new_deal: NewDeal,
    ) -> Result<Deal, CoreError> {
        let probability = new_deal.probability.unwrap_or(DEFAULT_DEAL_PROBABILITY);
        validate_probability(probability)?;
        self.directory
            .profile(organization_id, owner_id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("profile {owner_id}")))?;

        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4(),
            organization_id,
            owner_id,
            title: new_deal.title,
            stage: DealStage::Prospecting,
            deal_value: new_deal.deal_value,
            commission_value: None,
            probability,
            expected_close_date: new_deal.expected_close_date,
            closed_at: None,
            source: DealSource::Direct,
            created_at: now,
            updated_at: now,
        };
        {
            let mut state = self.state.write().await;
            state.deals.insert(deal.id, deal.clone());
        }
        self.ledger
            .record(
                organization_id,
                Some(owner_id),
                LedgerAction::DealCreated,
                "deal",
                Some(deal.id),
                serde_json::json!({ "deal_value": deal.deal_value }),
            )
            .await;
        Ok(deal)
    }

    pub async fn deal(&self, organization_id: Uuid, deal_id: Uuid) -> Result<Deal, CoreError> {
        let state = self.state.read().await;
        state
            .deals
            .get(&deal_id)
            .filter(|d| d.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("deal {deal_id}")))
    }

    pub async fn deals_for_owners(
        &self,
        organization_id: Uuid,
        owners: &HashSet<Uuid>,
    ) -> Vec<Deal> {
        let state = self.state.read().await;
        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| d.organization_id == organization_id && owners.contains(&d.owner_id))
            .cloned()
            .collect();
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        deals
    }

    pub async fn update_deal(
        &self,
        organization_id: Uuid,
        deal_id: Uuid,
        actor_id: Uuid,
        patch: DealPatch,
    ) -> Result<Deal, CoreError> {
        if let Some(probability) = patch.probability {
            validate_probability(probability)?;
        }

        let (updated, newly_won) = {
            let mut state = self.state.write().await;
            let deal = state
                .deals
                .get_mut(&deal_id)
                .filter(|d| d.organization_id == organization_id)
                .ok_or_else(|| CoreError::NotFound(format!("deal {deal_id}")))?;

            let now = Utc::now();
            let mut newly_won = false;
            if let Some(title) = patch.title {
                deal.title = title;
            }
            if let Some(value) = patch.deal_value {
                deal.deal_value = value;
            }
            if let Some(probability) = patch.probability {
                deal.probability = probability;
            }
            if let Some(date) = patch.expected_close_date {
                deal.expected_close_date = Some(date);
            }
            if let Some(stage) = patch.stage {
                if stage != deal.stage {
                    newly_won = stage == DealStage::Won;
                    if stage.is_closed() {
                        deal.closed_at.get_or_insert(now);
                    }
                    deal.stage = stage;
                }
            }
            deal.updated_at = now;
            (deal.clone(), newly_won)
        };

        let updated = if newly_won {
            self.settle_commission(organization_id, updated).await
        } else {
            updated
        };

        let action = if newly_won {
            LedgerAction::DealWon
        } else {
            LedgerAction::DealUpdated
        };
        self.ledger
            .record(
                organization_id,
                Some(actor_id),
                action,
                "deal",
                Some(deal_id),
                serde_json::json!({
                    "stage": updated.stage.as_str(),
                    "deal_value": updated.deal_value,
                }),
            )
            .await;
        Ok(updated)
    }

    /// Computes commission for a newly won deal from the owner's role rate
    /// in force at the close date. A missing rate is not an error here: the
    /// deal closes, commission stays unset, and the gap is logged.
    async fn settle_commission(&self, organization_id: Uuid, deal: Deal) -> Deal {
        let owner_role = match self.directory.profile(organization_id, deal.owner_id).await {
            Some(profile) => profile.role,
            None => {
                warn!(deal = %deal.id, owner = %deal.owner_id, "won deal has no owner profile");
                return deal;
            }
        };
        let close_date = deal
            .closed_at
            .map(|t| t.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive());
        match self
            .commission
            .commission_for(organization_id, owner_role, deal.deal_value, close_date)
            .await
        {
            Ok(commission) => {
                let mut state = self.state.write().await;
                if let Some(stored) = state.deals.get_mut(&deal.id) {
                    stored.commission_value = Some(commission);
                    return stored.clone();
                }
                deal
            }
            Err(CoreError::NotFound(_)) => {
                warn!(
                    deal = %deal.id,
                    role = owner_role.as_str(),
                    "no commission rate configured at close date"
                );
                deal
            }
            Err(err) => {
                warn!(deal = %deal.id, "commission calculation failed: {err}");
                deal
            }
        }
    }

    /// Owner-initiated delete. The record goes away; the ledger entry that
    /// documents the deletion does not.
    pub async fn delete_deal(
        &self,
        organization_id: Uuid,
        deal_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Deal, CoreError> {
        let removed = {
            let mut state = self.state.write().await;
            let owned_here = state
                .deals
                .get(&deal_id)
                .map(|d| d.organization_id == organization_id)
                .unwrap_or(false);
            if !owned_here {
                return Err(CoreError::NotFound(format!("deal {deal_id}")));
            }
            match state.deals.remove(&deal_id) {
                Some(deal) => deal,
                None => return Err(CoreError::NotFound(format!("deal {deal_id}"))),
            }
        };
        self.ledger
            .record(
                organization_id,
                Some(actor_id),
                LedgerAction::DealDeleted,
                "deal",
                Some(deal_id),
                serde_json::json!({
                    "title": removed.title,
                    "deal_value": removed.deal_value,
                }),
            )
            .await;
        Ok(removed)
    }
}
