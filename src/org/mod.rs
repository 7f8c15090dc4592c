//! Organization Graph
//!
//! Registry of organizations, profiles, business units, teams and
//! supervision edges, and the scope resolution that every authorization
//! decision is derived from. All lookups are organization-scoped and
//! computed fresh per call; hierarchy changes take effect on the next
//! request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::shared::error::CoreError;

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SalesAgent,
    TeamLeader,
    SalesManager,
    BusinessUnitHead,
    Finance,
    Ceo,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesAgent => "sales_agent",
            Self::TeamLeader => "team_leader",
            Self::SalesManager => "sales_manager",
            Self::BusinessUnitHead => "business_unit_head",
            Self::Finance => "finance",
            Self::Ceo => "ceo",
            Self::Admin => "admin",
        }
    }

    /// Roles whose scope spans the whole organization.
    pub fn is_organization_wide(&self) -> bool {
        matches!(self, Self::Finance | Self::Ceo | Self::Admin)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Root tenant boundary. Every other entity carries an `organization_id`
/// and no entity may reference another organization's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessUnit {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub leader_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub business_unit_id: Option<Uuid>,
    pub name: String,
    pub leader_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A user of the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub business_unit_id: Option<Uuid>,
    pub under_supervision: bool,
    pub supervised_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(organization_id: Uuid, full_name: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            full_name,
            email: None,
            role,
            business_unit_id: None,
            under_supervision: false,
            supervised_by: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_business_unit(mut self, business_unit_id: Uuid) -> Self {
        self.business_unit_id = Some(business_unit_id);
        self
    }
}

// ============================================================================
// Directory service
// ============================================================================

#[derive(Default)]
struct DirectoryState {
    organizations: HashMap<Uuid, Organization>,
    profiles: HashMap<Uuid, Profile>,
    business_units: HashMap<Uuid, BusinessUnit>,
    teams: HashMap<Uuid, Team>,
    // profile -> team; a profile has at most one active membership
    team_members: HashMap<Uuid, Uuid>,
}

/// Static-per-request view of organization membership. One `RwLock` over the
/// whole graph so scope resolution reads a consistent snapshot.
#[derive(Clone)]
pub struct OrganizationDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl Default for OrganizationDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl OrganizationDirectory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::default())),
        }
    }

    pub async fn create_organization(&self, name: String) -> Organization {
        let org = Organization::new(name);
        let mut state = self.state.write().await;
        state.organizations.insert(org.id, org.clone());
        org
    }

    pub async fn organization(&self, organization_id: Uuid) -> Option<Organization> {
        let state = self.state.read().await;
        state.organizations.get(&organization_id).cloned()
    }

    pub async fn create_profile(&self, profile: Profile) -> Result<Profile, CoreError> {
        let mut state = self.state.write().await;
        if !state.organizations.contains_key(&profile.organization_id) {
            return Err(CoreError::NotFound(format!(
                "organization {} does not exist",
                profile.organization_id
            )));
        }
        if let Some(unit_id) = profile.business_unit_id {
            ensure_unit_in_org(&state, profile.organization_id, unit_id)?;
        }
        state.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    pub async fn profile(&self, organization_id: Uuid, profile_id: Uuid) -> Option<Profile> {
        let state = self.state.read().await;
        state
            .profiles
            .get(&profile_id)
            .filter(|p| p.organization_id == organization_id)
            .cloned()
    }

    /// Resolves the acting profile, failing closed on anything ambiguous:
    /// unknown id, organization mismatch, or a deactivated account.
    pub async fn require_actor(
        &self,
        organization_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Profile, CoreError> {
        let state = self.state.read().await;
        let profile = state
            .profiles
            .get(&actor_id)
            .filter(|p| p.organization_id == organization_id)
            .ok_or_else(|| {
                CoreError::Unauthenticated(format!("no profile {actor_id} in organization"))
            })?;
        if !profile.is_active {
            return Err(CoreError::Unauthenticated(format!(
                "profile {actor_id} is deactivated"
            )));
        }
        Ok(profile.clone())
    }

    pub async fn deactivate_profile(
        &self,
        organization_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Profile, CoreError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(&profile_id)
            .filter(|p| p.organization_id == organization_id)
            .ok_or_else(|| CoreError::NotFound(format!("profile {profile_id}")))?;
        profile.is_active = false;
        Ok(profile.clone())
    }

    pub async fn create_business_unit(
        &self,
        organization_id: Uuid,
        name: String,
        leader_id: Option<Uuid>,
    ) -> Result<BusinessUnit, CoreError> {
        let mut state = self.state.write().await;
        if !state.organizations.contains_key(&organization_id) {
            return Err(CoreError::NotFound(format!(
                "organization {organization_id} does not exist"
            )));
        }
        if let Some(leader) = leader_id {
            ensure_profile_in_org(&state, organization_id, leader)?;
        }
        let unit = BusinessUnit {
            id: Uuid::new_v4(),
            organization_id,
            name,
            leader_id,
            created_at: Utc::now(),
        };
        state.business_units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    pub async fn create_team(
        &self,
        organization_id: Uuid,
        name: String,
        business_unit_id: Option<Uuid>,
        leader_id: Option<Uuid>,
    ) -> Result<Team, CoreError> {
        let mut state = self.state.write().await;
        if !state.organizations.contains_key(&organization_id) {
            return Err(CoreError::NotFound(format!(
                "organization {organization_id} does not exist"
            )));
        }
        if let Some(unit_id) = business_unit_id {
            ensure_unit_in_org(&state, organization_id, unit_id)?;
        }
        if let Some(leader) = leader_id {
            ensure_profile_in_org(&state, organization_id, leader)?;
        }
        let team = Team {
            id: Uuid::new_v4(),
            organization_id,
            business_unit_id,
            name,
            leader_id,
            created_at: Utc::now(),
        };
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    pub async fn set_team_leader(
        &self,
        organization_id: Uuid,
        team_id: Uuid,
        leader_id: Uuid,
    ) -> Result<Team, CoreError> {
        let mut state = self.state.write().await;
        ensure_profile_in_org(&state, organization_id, leader_id)?;
        let team = state
            .teams
            .get_mut(&team_id)
            .filter(|t| t.organization_id == organization_id)
            .ok_or_else(|| CoreError::NotFound(format!("team {team_id}")))?;
        team.leader_id = Some(leader_id);
        Ok(team.clone())
    }

    /// Joining a team replaces any previous membership, keeping the
    /// one-active-membership invariant by construction.
    pub async fn join_team(
        &self,
        organization_id: Uuid,
        profile_id: Uuid,
        team_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        ensure_profile_in_org(&state, organization_id, profile_id)?;
        if !state
            .teams
            .get(&team_id)
            .map(|t| t.organization_id == organization_id)
            .unwrap_or(false)
        {
            return Err(CoreError::NotFound(format!("team {team_id}")));
        }
        state.team_members.insert(profile_id, team_id);
        Ok(())
    }

    pub async fn leave_team(&self, organization_id: Uuid, profile_id: Uuid) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        ensure_profile_in_org(&state, organization_id, profile_id)?;
        state.team_members.remove(&profile_id);
        Ok(())
    }

    pub async fn assign_business_unit(
        &self,
        organization_id: Uuid,
        profile_id: Uuid,
        business_unit_id: Uuid,
    ) -> Result<Profile, CoreError> {
        let mut state = self.state.write().await;
        ensure_unit_in_org(&state, organization_id, business_unit_id)?;
        let profile = state
            .profiles
            .get_mut(&profile_id)
            .filter(|p| p.organization_id == organization_id)
            .ok_or_else(|| CoreError::NotFound(format!("profile {profile_id}")))?;
        profile.business_unit_id = Some(business_unit_id);
        Ok(profile.clone())
    }

    /// Grants a team leader temporary visibility over one agent's records.
    /// This is a visibility edge, not membership, and must never form a
    /// cycle through `supervised_by`.
    pub async fn set_supervision(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        supervisor_id: Uuid,
    ) -> Result<Profile, CoreError> {
        let mut state = self.state.write().await;
        if agent_id == supervisor_id {
            return Err(CoreError::ConfigConflict(
                "a profile cannot supervise itself".to_string(),
            ));
        }
        let supervisor = state
            .profiles
            .get(&supervisor_id)
            .filter(|p| p.organization_id == organization_id)
            .ok_or_else(|| CoreError::NotFound(format!("profile {supervisor_id}")))?;
        if supervisor.role != Role::TeamLeader {
            return Err(CoreError::ConfigConflict(format!(
                "supervisor {supervisor_id} is not a team leader"
            )));
        }
        // Walk the supervisor's own chain; reaching the agent would close a loop.
        let mut cursor = supervisor.supervised_by;
        let mut hops = 0usize;
        while let Some(next) = cursor {
            if next == agent_id {
                return Err(CoreError::ConfigConflict(
                    "supervision edge would form a cycle".to_string(),
                ));
            }
            hops += 1;
            if hops > state.profiles.len() {
                break;
            }
            cursor = state.profiles.get(&next).and_then(|p| p.supervised_by);
        }
        let profile = state
            .profiles
            .get_mut(&agent_id)
            .filter(|p| p.organization_id == organization_id)
            .ok_or_else(|| CoreError::NotFound(format!("profile {agent_id}")))?;
        profile.under_supervision = true;
        profile.supervised_by = Some(supervisor_id);
        debug!(agent = %agent_id, supervisor = %supervisor_id, "supervision edge set");
        Ok(profile.clone())
    }

    pub async fn clear_supervision(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
    ) -> Result<Profile, CoreError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(&agent_id)
            .filter(|p| p.organization_id == organization_id)
            .ok_or_else(|| CoreError::NotFound(format!("profile {agent_id}")))?;
        profile.under_supervision = false;
        profile.supervised_by = None;
        Ok(profile.clone())
    }

    pub async fn team_members(&self, organization_id: Uuid, team_id: Uuid) -> Vec<Profile> {
        let state = self.state.read().await;
        state
            .team_members
            .iter()
            .filter(|(_, tid)| **tid == team_id)
            .filter_map(|(pid, _)| state.profiles.get(pid))
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .collect()
    }

    pub async fn profiles_in_organization(&self, organization_id: Uuid) -> Vec<Profile> {
        let state = self.state.read().await;
        state
            .profiles
            .values()
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .collect()
    }

    /// Computes the set of profile ids whose records the actor may see or
    /// act upon. Unknown or deactivated actors resolve to an empty set.
    pub async fn resolve_scope(&self, organization_id: Uuid, actor_id: Uuid) -> HashSet<Uuid> {
        let state = self.state.read().await;
        let actor = match state
            .profiles
            .get(&actor_id)
            .filter(|p| p.organization_id == organization_id && p.is_active)
        {
            Some(p) => p,
            None => return HashSet::new(),
        };

        match actor.role {
            Role::SalesAgent => {
                let mut scope = HashSet::new();
                scope.insert(actor_id);
                scope
            }
            Role::TeamLeader => {
                let mut scope = HashSet::new();
                scope.insert(actor_id);
                let led_teams: HashSet<Uuid> = state
                    .teams
                    .values()
                    .filter(|t| {
                        t.organization_id == organization_id && t.leader_id == Some(actor_id)
                    })
                    .map(|t| t.id)
                    .collect();
                for (pid, tid) in &state.team_members {
                    if led_teams.contains(tid) {
                        scope.insert(*pid);
                    }
                }
                for profile in state.profiles.values() {
                    if profile.organization_id == organization_id
                        && profile.under_supervision
                        && profile.supervised_by == Some(actor_id)
                    {
                        scope.insert(profile.id);
                    }
                }
                scope
            }
            Role::SalesManager | Role::BusinessUnitHead => {
                // Scope is the assigned business unit(s): the unit(s) this
                // profile leads plus the one it belongs to. No assignment
                // means an empty scope, never the whole organization.
                let mut units: HashSet<Uuid> = state
                    .business_units
                    .values()
                    .filter(|u| {
                        u.organization_id == organization_id && u.leader_id == Some(actor_id)
                    })
                    .map(|u| u.id)
                    .collect();
                if let Some(unit_id) = actor.business_unit_id {
                    units.insert(unit_id);
                }
                if units.is_empty() {
                    return HashSet::new();
                }
                let unit_teams: HashSet<Uuid> = state
                    .teams
                    .values()
                    .filter(|t| {
                        t.business_unit_id
                            .map(|u| units.contains(&u))
                            .unwrap_or(false)
                    })
                    .map(|t| t.id)
                    .collect();
                let mut scope: HashSet<Uuid> = state
                    .profiles
                    .values()
                    .filter(|p| {
                        p.organization_id == organization_id
                            && p.business_unit_id
                                .map(|u| units.contains(&u))
                                .unwrap_or(false)
                    })
                    .map(|p| p.id)
                    .collect();
                for (pid, tid) in &state.team_members {
                    if unit_teams.contains(tid) {
                        scope.insert(*pid);
                    }
                }
                scope
            }
            Role::Finance | Role::Ceo | Role::Admin => state
                .profiles
                .values()
                .filter(|p| p.organization_id == organization_id)
                .map(|p| p.id)
                .collect(),
        }
    }
}

fn ensure_profile_in_org(
    state: &DirectoryState,
    organization_id: Uuid,
    profile_id: Uuid,
) -> Result<(), CoreError> {
    state
        .profiles
        .get(&profile_id)
        .filter(|p| p.organization_id == organization_id)
        .map(|_| ())
        .ok_or_else(|| CoreError::NotFound(format!("profile {profile_id}")))
}

fn ensure_unit_in_org(
    state: &DirectoryState,
    organization_id: Uuid,
    unit_id: Uuid,
) -> Result<(), CoreError> {
    state
        .business_units
        .get(&unit_id)
        .filter(|u| u.organization_id == organization_id)
        .map(|_| ())
        .ok_or_else(|| CoreError::NotFound(format!("business unit {unit_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_org(directory: &OrganizationDirectory) -> Organization {
        directory.create_organization("Coastline Brokerage".to_string()).await
    }

    async fn seed_profile(
        directory: &OrganizationDirectory,
        org: &Organization,
        name: &str,
        role: Role,
    ) -> Profile {
        directory
            .create_profile(Profile::new(org.id, name.to_string(), role))
            .await
            .expect("create profile")
    }

    #[tokio::test]
    async fn test_agent_scope_is_self_only() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let agent = seed_profile(&directory, &org, "Agent A", Role::SalesAgent).await;
        let other = seed_profile(&directory, &org, "Agent B", Role::SalesAgent).await;

        let scope = directory.resolve_scope(org.id, agent.id).await;
        assert_eq!(scope.len(), 1);
        assert!(scope.contains(&agent.id));
        assert!(!scope.contains(&other.id));
    }

    #[tokio::test]
    async fn test_unknown_actor_has_empty_scope() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let scope = directory.resolve_scope(org.id, Uuid::new_v4()).await;
        assert!(scope.is_empty());
    }

    #[tokio::test]
    async fn test_deactivated_actor_has_empty_scope() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let agent = seed_profile(&directory, &org, "Agent", Role::SalesAgent).await;
        directory
            .deactivate_profile(org.id, agent.id)
            .await
            .expect("deactivate");
        assert!(directory.resolve_scope(org.id, agent.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_team_leader_scope_covers_members_and_supervised() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let leader = seed_profile(&directory, &org, "Leader", Role::TeamLeader).await;
        let member = seed_profile(&directory, &org, "Member", Role::SalesAgent).await;
        let supervised = seed_profile(&directory, &org, "Floater", Role::SalesAgent).await;
        let outsider = seed_profile(&directory, &org, "Outsider", Role::SalesAgent).await;

        let team = directory
            .create_team(org.id, "North".to_string(), None, Some(leader.id))
            .await
            .expect("create team");
        directory.join_team(org.id, member.id, team.id).await.expect("join");
        directory
            .set_supervision(org.id, supervised.id, leader.id)
            .await
            .expect("supervise");

        let scope = directory.resolve_scope(org.id, leader.id).await;
        assert!(scope.contains(&leader.id));
        assert!(scope.contains(&member.id));
        assert!(scope.contains(&supervised.id));
        assert!(!scope.contains(&outsider.id));
    }

    #[tokio::test]
    async fn test_manager_without_unit_has_empty_scope() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let manager = seed_profile(&directory, &org, "Manager", Role::SalesManager).await;
        assert!(directory.resolve_scope(org.id, manager.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unit_head_scope_covers_unit_profiles_and_teams() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let head = seed_profile(&directory, &org, "Head", Role::BusinessUnitHead).await;
        let unit = directory
            .create_business_unit(org.id, "Residential".to_string(), Some(head.id))
            .await
            .expect("create unit");

        let direct = seed_profile(&directory, &org, "Direct", Role::SalesAgent).await;
        directory
            .assign_business_unit(org.id, direct.id, unit.id)
            .await
            .expect("assign");

        let via_team = seed_profile(&directory, &org, "ViaTeam", Role::SalesAgent).await;
        let team = directory
            .create_team(org.id, "Unit Team".to_string(), Some(unit.id), None)
            .await
            .expect("create team");
        directory.join_team(org.id, via_team.id, team.id).await.expect("join");

        let elsewhere = seed_profile(&directory, &org, "Elsewhere", Role::SalesAgent).await;

        let scope = directory.resolve_scope(org.id, head.id).await;
        assert!(scope.contains(&direct.id));
        assert!(scope.contains(&via_team.id));
        assert!(!scope.contains(&elsewhere.id));
    }

    #[tokio::test]
    async fn test_ceo_scope_is_whole_organization() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let ceo = seed_profile(&directory, &org, "Ceo", Role::Ceo).await;
        for i in 0..4 {
            seed_profile(&directory, &org, &format!("Agent {i}"), Role::SalesAgent).await;
        }
        let other_org = seed_org(&directory).await;
        let foreign = seed_profile(&directory, &other_org, "Foreign", Role::SalesAgent).await;

        let scope = directory.resolve_scope(org.id, ceo.id).await;
        assert_eq!(scope.len(), 5);
        assert!(!scope.contains(&foreign.id));
    }

    #[tokio::test]
    async fn test_join_team_replaces_previous_membership() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let agent = seed_profile(&directory, &org, "Agent", Role::SalesAgent).await;
        let first = directory
            .create_team(org.id, "First".to_string(), None, None)
            .await
            .expect("team");
        let second = directory
            .create_team(org.id, "Second".to_string(), None, None)
            .await
            .expect("team");

        directory.join_team(org.id, agent.id, first.id).await.expect("join");
        directory.join_team(org.id, agent.id, second.id).await.expect("join");

        assert!(directory.team_members(org.id, first.id).await.is_empty());
        let members = directory.team_members(org.id, second.id).await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, agent.id);

        directory.leave_team(org.id, agent.id).await.expect("leave");
        assert!(directory.team_members(org.id, second.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_organization_lookup_and_wide_roles() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        assert!(directory.organization(org.id).await.is_some());
        assert!(directory.organization(Uuid::new_v4()).await.is_none());

        assert!(Role::Finance.is_organization_wide());
        assert!(Role::Ceo.is_organization_wide());
        assert!(!Role::TeamLeader.is_organization_wide());
    }

    #[tokio::test]
    async fn test_supervision_cycle_is_refused() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let leader_a = seed_profile(&directory, &org, "Leader A", Role::TeamLeader).await;
        let leader_b = seed_profile(&directory, &org, "Leader B", Role::TeamLeader).await;

        directory
            .set_supervision(org.id, leader_b.id, leader_a.id)
            .await
            .expect("first edge");
        let result = directory.set_supervision(org.id, leader_a.id, leader_b.id).await;
        assert!(matches!(result, Err(CoreError::ConfigConflict(_))));

        let self_edge = directory.set_supervision(org.id, leader_a.id, leader_a.id).await;
        assert!(matches!(self_edge, Err(CoreError::ConfigConflict(_))));
    }

    #[tokio::test]
    async fn test_supervisor_must_be_team_leader() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let agent = seed_profile(&directory, &org, "Agent", Role::SalesAgent).await;
        let peer = seed_profile(&directory, &org, "Peer", Role::SalesAgent).await;

        let result = directory.set_supervision(org.id, agent.id, peer.id).await;
        assert!(matches!(result, Err(CoreError::ConfigConflict(_))));
    }

    #[tokio::test]
    async fn test_require_actor_fails_closed() {
        let directory = OrganizationDirectory::new();
        let org = seed_org(&directory).await;
        let other_org = seed_org(&directory).await;
        let agent = seed_profile(&directory, &org, "Agent", Role::SalesAgent).await;

        assert!(directory.require_actor(org.id, agent.id).await.is_ok());
        assert!(matches!(
            directory.require_actor(other_org.id, agent.id).await,
            Err(CoreError::Unauthenticated(_))
        ));
        assert!(matches!(
            directory.require_actor(org.id, Uuid::new_v4()).await,
            Err(CoreError::Unauthenticated(_))
        ));

        directory.deactivate_profile(org.id, agent.id).await.expect("deactivate");
        assert!(matches!(
            directory.require_actor(org.id, agent.id).await,
            Err(CoreError::Unauthenticated(_))
        ));
    }
}
