//! Lead lifecycle: `new -> contacted -> qualified -> {converted | unqualified}`,
//! with `qualified -> lost` as the rejection path. Converted and lost are
//! terminal. Each forward transition stamps its date field exactly once;
//! re-sending the current status is a no-op, not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::PipelineService;
use crate::ledger::LedgerAction;
use crate::shared::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Unqualified => "unqualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converted | Self::Unqualified | Self::Lost)
    }

    /// Legal forward moves. Converted is reachable only through the convert
    /// operation, never by a plain status update.
    fn can_move_to(&self, target: LeadStatus) -> bool {
        matches!(
            (self, target),
            (Self::New, LeadStatus::Contacted)
                | (Self::Contacted, LeadStatus::Qualified)
                | (Self::Qualified, LeadStatus::Unqualified)
                | (Self::Qualified, LeadStatus::Lost)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub estimated_budget: Option<f64>,
    pub notes: Option<String>,
    pub status: LeadStatus,
    pub contacted_date: Option<DateTime<Utc>>,
    pub qualified_date: Option<DateTime<Utc>>,
    pub converted_date: Option<DateTime<Utc>>,
    pub lost_date: Option<DateTime<Utc>>,
    pub converted_deal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub estimated_budget: Option<f64>,
    pub notes: Option<String>,
}

/// Typed patch; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub estimated_budget: Option<f64>,
    pub notes: Option<String>,
}

impl PipelineService {
    pub async fn create_lead(
        &self,
        organization_id: Uuid,
        owner_id: Uuid,
        new_lead: NewLead,
    ) -> Result<Lead, CoreError> {
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            organization_id,
            owner_id,
            name: new_lead.name,
            company: new_lead.company,
            email: new_lead.email,
            phone: new_lead.phone,
            estimated_budget: new_lead.estimated_budget,
            notes: new_lead.notes,
            status: LeadStatus::New,
            contacted_date: None,
            qualified_date: None,
            converted_date: None,
            lost_date: None,
            converted_deal_id: None,
            created_at: now,
            updated_at: now,
        };
        {
            let mut state = self.state.write().await;
            state.leads.insert(lead.id, lead.clone());
        }
        self.ledger
            .record(
                organization_id,
                Some(owner_id),
                LedgerAction::LeadCreated,
                "lead",
                Some(lead.id),
                serde_json::json!({ "name": lead.name }),
            )
            .await;
        Ok(lead)
    }

    pub async fn lead(&self, organization_id: Uuid, lead_id: Uuid) -> Result<Lead, CoreError> {
        let state = self.state.read().await;
        state
            .leads
            .get(&lead_id)
            .filter(|l| l.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("lead {lead_id}")))
    }

    /// Leads whose owner falls inside the given scope, newest first.
    pub async fn leads_for_owners(
        &self,
        organization_id: Uuid,
        owners: &HashSet<Uuid>,
    ) -> Vec<Lead> {
        let state = self.state.read().await;
        let mut leads: Vec<Lead> = state
            .leads
            .values()
            .filter(|l| l.organization_id == organization_id && owners.contains(&l.owner_id))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        leads
    }

    pub async fn update_lead(
        &self,
        organization_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
        patch: LeadPatch,
    ) -> Result<Lead, CoreError> {
        let updated = {
            let mut state = self.state.write().await;
            let lead = state
                .leads
                .get_mut(&lead_id)
                .filter(|l| l.organization_id == organization_id)
                .ok_or_else(|| CoreError::NotFound(format!("lead {lead_id}")))?;
            if let Some(name) = patch.name {
                lead.name = name;
            }
            if let Some(company) = patch.company {
                lead.company = Some(company);
            }
            if let Some(email) = patch.email {
                lead.email = Some(email);
            }
            if let Some(phone) = patch.phone {
                lead.phone = Some(phone);
            }
            if let Some(budget) = patch.estimated_budget {
                lead.estimated_budget = Some(budget);
            }
            if let Some(notes) = patch.notes {
                lead.notes = Some(notes);
            }
            lead.updated_at = Utc::now();
            lead.clone()
        };
        self.ledger
            .record(
                organization_id,
                Some(actor_id),
                LedgerAction::LeadUpdated,
                "lead",
                Some(lead_id),
                serde_json::json!({}),
            )
            .await;
        Ok(updated)
    }

    /// Moves a lead along its state machine. The same status twice is a
    /// no-op that leaves the original stamp date alone; an illegal move is a
    /// conflict, never coerced.
    pub async fn transition_lead(
        &self,
        organization_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
        target: LeadStatus,
    ) -> Result<Lead, CoreError> {
        let (updated, previous) = {
            let mut state = self.state.write().await;
            let lead = state
                .leads
                .get_mut(&lead_id)
                .filter(|l| l.organization_id == organization_id)
                .ok_or_else(|| CoreError::NotFound(format!("lead {lead_id}")))?;

            if lead.status == target {
                return Ok(lead.clone());
            }
            if target == LeadStatus::Converted {
                return Err(CoreError::InvalidTransition(
                    "a lead becomes converted only through conversion".to_string(),
                ));
            }
            if !lead.status.can_move_to(target) {
                return Err(CoreError::InvalidTransition(format!(
                    "lead may not move from {} to {}",
                    lead.status.as_str(),
                    target.as_str()
                )));
            }

            let previous = lead.status;
            let now = Utc::now();
            lead.status = target;
            match target {
                LeadStatus::Contacted => {
                    lead.contacted_date.get_or_insert(now);
                }
                LeadStatus::Qualified => {
                    lead.qualified_date.get_or_insert(now);
                }
                LeadStatus::Lost => {
                    lead.lost_date.get_or_insert(now);
                }
                _ => {}
            }
            lead.updated_at = now;
            (lead.clone(), previous)
        };
        self.ledger
            .record(
                organization_id,
                Some(actor_id),
                LedgerAction::LeadStatusChanged,
                "lead",
                Some(lead_id),
                serde_json::json!({
                    "from": previous.as_str(),
                    "to": target.as_str(),
                }),
            )
            .await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::fixture;

    #[tokio::test]
    async fn test_new_lead_starts_unstamped() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(
                fx.org.id,
                fx.agent.id,
                NewLead {
                    name: "Nile Towers".to_string(),
                    estimated_budget: Some(2_500_000.0),
                    ..Default::default()
                },
            )
            .await
            .expect("create");

        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.contacted_date.is_none());
        assert!(lead.qualified_date.is_none());
        assert!(lead.converted_deal_id.is_none());
    }

    #[tokio::test]
    async fn test_forward_transitions_stamp_dates() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "L".to_string(), ..Default::default() })
            .await
            .expect("create");

        let contacted = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Contacted)
            .await
            .expect("contacted");
        assert!(contacted.contacted_date.is_some());

        let qualified = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Qualified)
            .await
            .expect("qualified");
        assert!(qualified.qualified_date.is_some());
    }

    #[tokio::test]
    async fn test_resending_status_does_not_restamp_date() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "L".to_string(), ..Default::default() })
            .await
            .expect("create");
        fx.service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Contacted)
            .await
            .expect("contacted");
        let first = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Qualified)
            .await
            .expect("qualified");

        let again = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Qualified)
            .await
            .expect("no-op");
        assert_eq!(again.qualified_date, first.qualified_date);
        assert_eq!(again.status, LeadStatus::Qualified);
    }

    #[tokio::test]
    async fn test_skipping_stages_is_invalid() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "L".to_string(), ..Default::default() })
            .await
            .expect("create");

        let result = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Qualified)
            .await;
        assert!(matches!(result, Err(CoreError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_converted_is_not_reachable_by_status_update() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "L".to_string(), ..Default::default() })
            .await
            .expect("create");

        let result = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Converted)
            .await;
        assert!(matches!(result, Err(CoreError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_lost_is_terminal() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "L".to_string(), ..Default::default() })
            .await
            .expect("create");
        for status in [LeadStatus::Contacted, LeadStatus::Qualified, LeadStatus::Lost] {
            fx.service
                .transition_lead(fx.org.id, lead.id, fx.agent.id, status)
                .await
                .expect("transition");
        }

        let result = fx
            .service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Contacted)
            .await;
        assert!(matches!(result, Err(CoreError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_leads_filtered_by_owner_scope() {
        let fx = fixture().await;
        fx.service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "Mine".to_string(), ..Default::default() })
            .await
            .expect("create");
        fx.service
            .create_lead(fx.org.id, fx.leader.id, NewLead { name: "Theirs".to_string(), ..Default::default() })
            .await
            .expect("create");

        let scope: HashSet<Uuid> = [fx.agent.id].into_iter().collect();
        let visible = fx.service.leads_for_owners(fx.org.id, &scope).await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Mine");
    }
}
