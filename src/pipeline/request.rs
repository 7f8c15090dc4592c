//! Client request lifecycle: `pending -> {approved | rejected}`,
//! `approved -> converted`. A request is routed to exactly one team leader;
//! only that leader (or ceo/admin) may decide it. Rejected is terminal and
//! never auto-resubmitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::PipelineService;
use crate::ledger::LedgerAction;
use crate::org::{Profile, Role};
use crate::shared::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Converted,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Converted => "converted",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum RequestDecision {
    Approve,
    Reject { reason: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub team_leader_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub estimated_budget: Option<f64>,
    pub status: RequestStatus,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub converted_deal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClientRequest {
    pub title: String,
    pub description: Option<String>,
    pub estimated_budget: Option<f64>,
    pub team_leader_id: Uuid,
}

impl PipelineService {
    /// Creates a request routed to a specific team leader for approval.
    pub async fn create_request(
        &self,
        organization_id: Uuid,
        owner_id: Uuid,
        new_request: NewClientRequest,
    ) -> Result<ClientRequest, CoreError> {
        let leader = self
            .directory
            .profile(organization_id, new_request.team_leader_id)
            .await
            .ok_or_else(|| {
                CoreError::NotFound(format!("team leader {}", new_request.team_leader_id))
            })?;
        if leader.role != Role::TeamLeader {
            return Err(CoreError::Validation(format!(
                "requests are routed to a team leader, {} is {}",
                leader.id,
                leader.role.as_str()
            )));
        }

        let now = Utc::now();
        let request = ClientRequest {
            id: Uuid::new_v4(),
            organization_id,
            owner_id,
            team_leader_id: new_request.team_leader_id,
            title: new_request.title,
            description: new_request.description,
            estimated_budget: new_request.estimated_budget,
            status: RequestStatus::Pending,
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
            converted_deal_id: None,
            created_at: now,
            updated_at: now,
        };
        {
            let mut state = self.state.write().await;
            state.requests.insert(request.id, request.clone());
        }
        self.ledger
            .record(
                organization_id,
                Some(owner_id),
                LedgerAction::RequestCreated,
                "client_request",
                Some(request.id),
                serde_json::json!({ "team_leader_id": request.team_leader_id }),
            )
            .await;
        Ok(request)
    }

    pub async fn request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
    ) -> Result<ClientRequest, CoreError> {
        let state = self.state.read().await;
        state
            .requests
            .get(&request_id)
            .filter(|r| r.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("request {request_id}")))
    }

    pub async fn requests_for_owners(
        &self,
        organization_id: Uuid,
        owners: &HashSet<Uuid>,
    ) -> Vec<ClientRequest> {
        let state = self.state.read().await;
        let mut requests: Vec<ClientRequest> = state
            .requests
            .values()
            .filter(|r| r.organization_id == organization_id && owners.contains(&r.owner_id))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// Requests awaiting a specific leader's decision.
    pub async fn requests_routed_to(
        &self,
        organization_id: Uuid,
        team_leader_id: Uuid,
    ) -> Vec<ClientRequest> {
        let state = self.state.read().await;
        let mut requests: Vec<ClientRequest> = state
            .requests
            .values()
            .filter(|r| {
                r.organization_id == organization_id
                    && r.team_leader_id == team_leader_id
                    && r.status == RequestStatus::Pending
            })
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        requests
    }

    /// Decides a pending request. Approval routing is to the one leader the
    /// request names, not the leader's team hierarchy; ceo and admin may
    /// override.
    pub async fn decide_request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        actor: &Profile,
        decision: RequestDecision,
    ) -> Result<ClientRequest, CoreError> {
        let updated = {
            let mut state = self.state.write().await;
            let request = state
                .requests
                .get_mut(&request_id)
                .filter(|r| r.organization_id == organization_id)
                .ok_or_else(|| CoreError::NotFound(format!("request {request_id}")))?;

            if request.status != RequestStatus::Pending {
                return Err(CoreError::InvalidTransition(format!(
                    "request is {}, only pending requests can be decided",
                    request.status.as_str()
                )));
            }
            if actor.role == Role::TeamLeader && request.team_leader_id != actor.id {
                return Err(CoreError::OutOfScope(format!(
                    "request {request_id} is routed to leader {}, not {}",
                    request.team_leader_id, actor.id
                )));
            }

            let now = Utc::now();
            match &decision {
                RequestDecision::Approve => {
                    request.status = RequestStatus::Approved;
                }
                RequestDecision::Reject { reason } => {
                    request.status = RequestStatus::Rejected;
                    request.rejection_reason = reason.clone();
                }
            }
            request.decided_at = Some(now);
            request.decided_by = Some(actor.id);
            request.updated_at = now;
            request.clone()
        };

        let action = match decision {
            RequestDecision::Approve => LedgerAction::RequestApproved,
            RequestDecision::Reject { .. } => LedgerAction::RequestRejected,
        };
        self.ledger
            .record(
                organization_id,
                Some(actor.id),
                action,
                "client_request",
                Some(request_id),
                serde_json::json!({ "status": updated.status.as_str() }),
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
    async fn test_request_routes_to_named_leader() {
        let fx = fixture().await;
        let request = fx
            .service
            .create_request(
                fx.org.id,
                fx.agent.id,
                NewClientRequest {
                    title: "Waterfront listing".to_string(),
                    description: None,
                    estimated_budget: Some(900_000.0),
                    team_leader_id: fx.leader.id,
                },
            )
            .await
            .expect("create");
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.team_leader_id, fx.leader.id);
    }

    #[tokio::test]
    async fn test_routing_to_non_leader_is_rejected() {
        let fx = fixture().await;
        let result = fx
            .service
            .create_request(
                fx.org.id,
                fx.agent.id,
                NewClientRequest {
                    title: "R".to_string(),
                    description: None,
                    estimated_budget: None,
                    team_leader_id: fx.agent.id,
                },
            )
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_other_leader_cannot_decide_even_with_sufficient_role() {
        let fx = fixture().await;
        let other_leader = fx
            .directory
            .create_profile(Profile::new(fx.org.id, "Other Leader".to_string(), Role::TeamLeader))
            .await
            .expect("create leader");
        let request = fx
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

        let result = fx
            .service
            .decide_request(fx.org.id, request.id, &other_leader, RequestDecision::Approve)
            .await;
        assert!(matches!(result, Err(CoreError::OutOfScope(_))));
    }

    #[tokio::test]
    async fn test_admin_may_decide_any_request() {
        let fx = fixture().await;
        let admin = fx
            .directory
            .create_profile(Profile::new(fx.org.id, "Admin".to_string(), Role::Admin))
            .await
            .expect("create admin");
        let request = fx
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

        let decided = fx
            .service
            .decide_request(fx.org.id, request.id, &admin, RequestDecision::Approve)
            .await
            .expect("decide");
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.decided_by, Some(admin.id));
    }

    #[tokio::test]
    async fn test_rejected_request_is_terminal() {
        let fx = fixture().await;
        let request = fx
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

        let rejected = fx
            .service
            .decide_request(
                fx.org.id,
                request.id,
                &fx.leader,
                RequestDecision::Reject { reason: Some("budget too low".to_string()) },
            )
            .await
            .expect("reject");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("budget too low"));

        let retry = fx
            .service
            .decide_request(fx.org.id, request.id, &fx.leader, RequestDecision::Approve)
            .await;
        assert!(matches!(retry, Err(CoreError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_pending_queue_for_leader() {
        let fx = fixture().await;
        for title in ["first", "second"] {
            fx.service
                .create_request(
                    fx.org.id,
                    fx.agent.id,
                    NewClientRequest {
                        title: title.to_string(),
                        description: None,
                        estimated_budget: None,
                        team_leader_id: fx.leader.id,
                    },
                )
                .await
                .expect("create");
        }

        let queue = fx.service.requests_routed_to(fx.org.id, fx.leader.id).await;
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].title, "first");
    }
}
