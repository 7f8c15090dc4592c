//! Role Authorizer
//!
//! Table-driven permission checks on top of the organization graph. Every
//! decision combines a static action -> allowed-roles lookup with a fresh
//! scope resolution for ownership-scoped actions; the two failures carry
//! distinct reason codes so callers can tell a rank problem from a reach
//! problem.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::org::{OrganizationDirectory, Profile, Role};
use crate::shared::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateLead,
    UpdateLead,
    ConvertLead,
    CreateRequest,
    DecideRequest,
    ConvertRequest,
    CreateDeal,
    UpdateDeal,
    DeleteDeal,
    UpdateCommissionConfig,
    ManageSalary,
    AddCostEntry,
    InviteUser,
    ManageOrganization,
    ViewReports,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateLead => "create_lead",
            Self::UpdateLead => "update_lead",
            Self::ConvertLead => "convert_lead",
            Self::CreateRequest => "create_request",
            Self::DecideRequest => "decide_request",
            Self::ConvertRequest => "convert_request",
            Self::CreateDeal => "create_deal",
            Self::UpdateDeal => "update_deal",
            Self::DeleteDeal => "delete_deal",
            Self::UpdateCommissionConfig => "update_commission_config",
            Self::ManageSalary => "manage_salary",
            Self::AddCostEntry => "add_cost_entry",
            Self::InviteUser => "invite_user",
            Self::ManageOrganization => "manage_organization",
            Self::ViewReports => "view_reports",
        }
    }

    /// Actions that target a record owner and therefore require the target
    /// to fall inside the actor's resolved scope. DecideRequest is absent:
    /// approval routes to one exact leader, not a scope, and the workflow
    /// engine enforces that match itself.
    pub fn is_owner_scoped(&self) -> bool {
        matches!(
            self,
            Self::UpdateLead
                | Self::ConvertLead
                | Self::ConvertRequest
                | Self::UpdateDeal
                | Self::DeleteDeal
                | Self::ManageSalary
        )
    }
}

const PIPELINE_ROLES: &[Role] = &[
    Role::SalesAgent,
    Role::TeamLeader,
    Role::SalesManager,
    Role::BusinessUnitHead,
    Role::Ceo,
    Role::Admin,
];

static ACTION_ROLES: Lazy<HashMap<Action, &'static [Role]>> = Lazy::new(|| {
    let mut table: HashMap<Action, &'static [Role]> = HashMap::new();
    table.insert(Action::CreateLead, PIPELINE_ROLES);
    table.insert(Action::UpdateLead, PIPELINE_ROLES);
    table.insert(Action::ConvertLead, PIPELINE_ROLES);
    table.insert(Action::CreateRequest, PIPELINE_ROLES);
    table.insert(
        Action::DecideRequest,
        &[Role::TeamLeader, Role::Ceo, Role::Admin],
    );
    table.insert(Action::ConvertRequest, PIPELINE_ROLES);
    table.insert(Action::CreateDeal, PIPELINE_ROLES);
    table.insert(Action::UpdateDeal, PIPELINE_ROLES);
    table.insert(
        Action::DeleteDeal,
        &[Role::SalesAgent, Role::Ceo, Role::Admin],
    );
    table.insert(
        Action::UpdateCommissionConfig,
        &[Role::Finance, Role::Ceo, Role::Admin],
    );
    table.insert(
        Action::ManageSalary,
        &[Role::Finance, Role::Ceo, Role::Admin],
    );
    table.insert(
        Action::AddCostEntry,
        &[Role::Finance, Role::BusinessUnitHead, Role::Ceo, Role::Admin],
    );
    table.insert(
        Action::InviteUser,
        &[Role::SalesManager, Role::BusinessUnitHead, Role::Ceo, Role::Admin],
    );
    table.insert(Action::ManageOrganization, &[Role::Ceo, Role::Admin]);
    table.insert(
        Action::ViewReports,
        &[
            Role::TeamLeader,
            Role::SalesManager,
            Role::BusinessUnitHead,
            Role::Finance,
            Role::Ceo,
            Role::Admin,
        ],
    );
    table
});

pub fn allowed_roles(action: Action) -> &'static [Role] {
    ACTION_ROLES.get(&action).copied().unwrap_or(&[])
}

/// A granted authorization: the resolved actor plus the scope the decision
/// was made against, so handlers can filter listings with the same snapshot.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub actor: Profile,
    pub scope: HashSet<Uuid>,
}

impl AccessGrant {
    pub fn covers(&self, owner_id: Uuid) -> bool {
        self.scope.contains(&owner_id)
    }
}

#[derive(Clone)]
pub struct Authorizer {
    directory: Arc<OrganizationDirectory>,
}

impl Authorizer {
    pub fn new(directory: Arc<OrganizationDirectory>) -> Self {
        Self { directory }
    }

    /// Decides whether `actor_id` may perform `action`, optionally against a
    /// record owned by `target_owner`. Role and scope are checked
    /// independently and deny with distinct reasons. Deterministic, no side
    /// effects, denies on any ambiguous or missing profile.
    pub async fn authorize(
        &self,
        organization_id: Uuid,
        actor_id: Uuid,
        action: Action,
        target_owner: Option<Uuid>,
    ) -> Result<AccessGrant, CoreError> {
        let actor = self.directory.require_actor(organization_id, actor_id).await?;

        if !allowed_roles(action).contains(&actor.role) {
            debug!(
                actor = %actor_id,
                action = action.as_str(),
                role = actor.role.as_str(),
                "denied: role insufficient"
            );
            return Err(CoreError::RoleInsufficient(format!(
                "role {} may not {}",
                actor.role.as_str(),
                action.as_str()
            )));
        }

        let scope = self.directory.resolve_scope(organization_id, actor_id).await;

        if action.is_owner_scoped() {
            let target = target_owner.ok_or_else(|| {
                CoreError::Validation(format!(
                    "action {} requires a target owner",
                    action.as_str()
                ))
            })?;
            if !scope.contains(&target) {
                debug!(
                    actor = %actor_id,
                    action = action.as_str(),
                    target = %target,
                    "denied: target outside resolved scope"
                );
                return Err(CoreError::OutOfScope(format!(
                    "target {target} is outside the scope of {actor_id}"
                )));
            }
        }

        Ok(AccessGrant { actor, scope })
    }
}
