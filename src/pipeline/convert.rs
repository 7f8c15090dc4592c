//! Conversion: the atomic creation of a deal from a qualified lead or an
//! approved client request. Source validation, deal insert and source
//! marking all happen under one write guard, so converting is exactly-once;
//! a second attempt sees the converted source and gets a conflict.

use chrono::Utc;
use uuid::Uuid;

use super::deal::{Deal, DealSource, DealStage};
use super::lead::LeadStatus;
use super::request::RequestStatus;
use super::PipelineService;
use crate::ledger::LedgerAction;
use crate::shared::error::CoreError;

/// Default win probability for a deal born from a qualified lead.
pub const DEFAULT_LEAD_PROBABILITY: u8 = 75;
/// Default win probability for a deal born from an approved request.
pub const DEFAULT_REQUEST_PROBABILITY: u8 = 50;

impl PipelineService {
    /// Converts a qualified lead into a deal. The new deal starts at the
    /// qualified stage with value seeded from the lead's estimated budget.
    pub async fn convert_lead(
        &self,
        organization_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Deal, CoreError> {
        let deal = {
            let mut state = self.state.write().await;
            let lead = state
                .leads
                .get(&lead_id)
                .filter(|l| l.organization_id == organization_id)
                .ok_or_else(|| CoreError::NotFound(format!("lead {lead_id}")))?;

            match lead.status {
                LeadStatus::Qualified => {}
                LeadStatus::Converted => {
                    return Err(CoreError::InvalidTransition(format!(
                        "lead {lead_id} is already converted"
                    )));
                }
                other => {
                    return Err(CoreError::InvalidTransition(format!(
                        "only a qualified lead can convert, lead is {}",
                        other.as_str()
                    )));
                }
            }

            let now = Utc::now();
            let deal = Deal {
                id: Uuid::new_v4(),
                organization_id,
                owner_id: lead.owner_id,
                title: lead.name.clone(),
                stage: DealStage::Qualified,
                deal_value: lead.estimated_budget.unwrap_or(0.0),
                commission_value: None,
                probability: DEFAULT_LEAD_PROBABILITY,
                expected_close_date: None,
                closed_at: None,
                source: DealSource::Lead,
                created_at: now,
                updated_at: now,
            };
            state.deals.insert(deal.id, deal.clone());

            // Source marking and deal creation share the one guard, so the
            // conversion cannot half-happen.
            if let Some(lead) = state.leads.get_mut(&lead_id) {
                lead.status = LeadStatus::Converted;
                lead.converted_date.get_or_insert(now);
                lead.converted_deal_id = Some(deal.id);
                lead.updated_at = now;
            }
            deal
        };

        self.ledger
            .record(
                organization_id,
                Some(actor_id),
                LedgerAction::LeadConverted,
                "lead",
                Some(lead_id),
                serde_json::json!({ "deal_id": deal.id }),
            )
            .await;
        Ok(deal)
    }

    /// Converts an approved client request into a deal at the prospecting
    /// stage.
    pub async fn convert_request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Deal, CoreError> {
        let deal = {
            let mut state = self.state.write().await;
            let request = state
                .requests
                .get(&request_id)
                .filter(|r| r.organization_id == organization_id)
                .ok_or_else(|| CoreError::NotFound(format!("request {request_id}")))?;

            match request.status {
                RequestStatus::Approved => {}
                RequestStatus::Converted => {
                    return Err(CoreError::InvalidTransition(format!(
                        "request {request_id} is already converted"
                    )));
                }
                other => {
                    return Err(CoreError::InvalidTransition(format!(
                        "only an approved request can convert, request is {}",
                        other.as_str()
                    )));
                }
            }

            let now = Utc::now();
            let deal = Deal {
                id: Uuid::new_v4(),
                organization_id,
                owner_id: request.owner_id,
                title: request.title.clone(),
                stage: DealStage::Prospecting,
                deal_value: request.estimated_budget.unwrap_or(0.0),
                commission_value: None,
                probability: DEFAULT_REQUEST_PROBABILITY,
                expected_close_date: None,
                closed_at: None,
                source: DealSource::ClientRequest,
                created_at: now,
                updated_at: now,
            };
            state.deals.insert(deal.id, deal.clone());

            if let Some(request) = state.requests.get_mut(&request_id) {
                request.status = RequestStatus::Converted;
                request.converted_deal_id = Some(deal.id);
                request.updated_at = now;
            }
            deal
        };

        self.ledger
            .record(
                organization_id,
                Some(actor_id),
                LedgerAction::RequestConverted,
                "client_request",
                Some(request_id),
                serde_json::json!({ "deal_id": deal.id }),
            )
            .await;
        Ok(deal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::fixture;
    use crate::pipeline::{NewClientRequest, NewLead, RequestDecision};

    async fn qualified_lead(fx: &crate::pipeline::test_support::Fixture) -> Uuid {
        let lead = fx
            .service
            .create_lead(
                fx.org.id,
                fx.agent.id,
                NewLead {
                    name: "Palm Hills villa".to_string(),
                    estimated_budget: Some(2_500_000.0),
                    ..Default::default()
                },
            )
            .await
            .expect("create");
        fx.service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Contacted)
            .await
            .expect("contacted");
        fx.service
            .transition_lead(fx.org.id, lead.id, fx.agent.id, LeadStatus::Qualified)
            .await
            .expect("qualified");
        lead.id
    }

    #[tokio::test]
    async fn test_qualified_lead_converts_to_qualified_deal() {
        let fx = fixture().await;
        let lead_id = qualified_lead(&fx).await;

        let deal = fx
            .service
            .convert_lead(fx.org.id, lead_id, fx.agent.id)
            .await
            .expect("convert");

        assert_eq!(deal.probability, 75);
        assert_eq!(deal.stage, DealStage::Qualified);
        assert_eq!(deal.deal_value, 2_500_000.0);
        assert_eq!(deal.source, DealSource::Lead);
        assert_eq!(deal.owner_id, fx.agent.id);

        let lead = fx.service.lead(fx.org.id, lead_id).await.expect("lead");
        assert_eq!(lead.status, LeadStatus::Converted);
        assert_eq!(lead.converted_deal_id, Some(deal.id));
        assert!(lead.converted_date.is_some());
    }

    #[tokio::test]
    async fn test_convert_is_exactly_once() {
        let fx = fixture().await;
        let lead_id = qualified_lead(&fx).await;

        let first = fx
            .service
            .convert_lead(fx.org.id, lead_id, fx.agent.id)
            .await
            .expect("convert");
        let second = fx.service.convert_lead(fx.org.id, lead_id, fx.agent.id).await;
        assert!(matches!(second, Err(CoreError::InvalidTransition(_))));

        // One deal exists, and the lead still points at the first.
        let scope = [fx.agent.id].into_iter().collect();
        let deals = fx.service.deals_for_owners(fx.org.id, &scope).await;
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].id, first.id);
    }

    #[tokio::test]
    async fn test_unqualified_source_does_not_convert() {
        let fx = fixture().await;
        let lead = fx
            .service
            .create_lead(fx.org.id, fx.agent.id, NewLead { name: "L".to_string(), ..Default::default() })
            .await
            .expect("create");

        let result = fx.service.convert_lead(fx.org.id, lead.id, fx.agent.id).await;
        assert!(matches!(result, Err(CoreError::InvalidTransition(_))));

        // The failed conversion left the lead untouched and convertible later.
        let unchanged = fx.service.lead(fx.org.id, lead.id).await.expect("lead");
        assert_eq!(unchanged.status, LeadStatus::New);
        assert!(unchanged.converted_deal_id.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_converts_yield_one_deal() {
        let fx = fixture().await;
        let lead_id = qualified_lead(&fx).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = fx.service.clone();
            let org = fx.org.id;
            let actor = fx.agent.id;
            handles.push(tokio::spawn(async move {
                service.convert_lead(org, lead_id, actor).await
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.expect("join").is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let scope = [fx.agent.id].into_iter().collect();
        assert_eq!(fx.service.deals_for_owners(fx.org.id, &scope).await.len(), 1);
    }

    #[tokio::test]
    async fn test_approved_request_converts_at_50() {
        let fx = fixture().await;
        let request = fx
            .service
            .create_request(
                fx.org.id,
                fx.agent.id,
                NewClientRequest {
                    title: "Corporate lease".to_string(),
                    description: None,
                    estimated_budget: Some(800_000.0),
                    team_leader_id: fx.leader.id,
                },
            )
            .await
            .expect("create");
        fx.service
            .decide_request(fx.org.id, request.id, &fx.leader, RequestDecision::Approve)
            .await
            .expect("approve");

        let deal = fx
            .service
            .convert_request(fx.org.id, request.id, fx.agent.id)
            .await
            .expect("convert");
        assert_eq!(deal.probability, 50);
        assert_eq!(deal.stage, DealStage::Prospecting);
        assert_eq!(deal.deal_value, 800_000.0);
        assert_eq!(deal.source, DealSource::ClientRequest);

        let converted = fx.service.request(fx.org.id, request.id).await.expect("request");
        assert_eq!(converted.status, RequestStatus::Converted);
        assert_eq!(converted.converted_deal_id, Some(deal.id));
    }

    #[tokio::test]
    async fn test_pending_or_rejected_request_does_not_convert() {
        let fx = fixture().await;
        let pending = fx
            .service
            .create_request(
                fx.org.id,
                fx.agent.id,
                NewClientRequest {
                    title: "R".to_string(),
                    description: None,
                    estimated_budget: None,
                    team_leader_id: fx.leader.id,
                },
            )
            .await
            .expect("create");

        let result = fx.service.convert_request(fx.org.id, pending.id, fx.agent.id).await;
        assert!(matches!(result, Err(CoreError::InvalidTransition(_))));

        fx.service
            .decide_request(
                fx.org.id,
                pending.id,
                &fx.leader,
                RequestDecision::Reject { reason: None },
            )
            .await
            .expect("reject");
        let rejected = fx.service.convert_request(fx.org.id, pending.id, fx.agent.id).await;
        assert!(matches!(rejected, Err(CoreError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_conversion_is_ledgered() {
        let fx = fixture().await;
        let lead_id = qualified_lead(&fx).await;
        let deal = fx
            .service
            .convert_lead(fx.org.id, lead_id, fx.agent.id)
            .await
            .expect("convert");

        let entries = fx
            .ledger
            .query(
                crate::ledger::LedgerQuery::new()
                    .for_organization(fx.org.id)
                    .with_action(LedgerAction::LeadConverted),
            )
            .await
            .expect("query");
        assert_eq!(entries.total_count, 1);
        assert_eq!(
            entries.entries[0].metadata["deal_id"],
            serde_json::json!(deal.id)
        );
    }
}
