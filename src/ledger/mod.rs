//! Activity Ledger
//!
//! Append-only record of every mutating action, keyed by organization,
//! actor, action kind and entity. Entries are immutable once written; no
//! update or delete contract exists. Writes are best-effort relative to the
//! primary mutation: a failed append is logged and counted, never
//! propagated.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    LeadCreated,
    LeadUpdated,
    LeadStatusChanged,
    LeadConverted,
    RequestCreated,
    RequestApproved,
    RequestRejected,
    RequestConverted,
    DealCreated,
    DealUpdated,
    DealWon,
    DealDeleted,
    CommissionRateChanged,
    SalaryChanged,
    CostEntryAdded,
    UserInvited,
    ProfileDeactivated,
    SupervisionGranted,
    SupervisionCleared,
    TeamLeaderChanged,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadCreated => "lead_created",
            Self::LeadUpdated => "lead_updated",
            Self::LeadStatusChanged => "lead_status_changed",
            Self::LeadConverted => "lead_converted",
            Self::RequestCreated => "request_created",
            Self::RequestApproved => "request_approved",
            Self::RequestRejected => "request_rejected",
            Self::RequestConverted => "request_converted",
            Self::DealCreated => "deal_created",
            Self::DealUpdated => "deal_updated",
            Self::DealWon => "deal_won",
            Self::DealDeleted => "deal_deleted",
            Self::CommissionRateChanged => "commission_rate_changed",
            Self::SalaryChanged => "salary_changed",
            Self::CostEntryAdded => "cost_entry_added",
            Self::UserInvited => "user_invited",
            Self::ProfileDeactivated => "profile_deactivated",
            Self::SupervisionGranted => "supervision_granted",
            Self::SupervisionCleared => "supervision_cleared",
            Self::TeamLeaderChanged => "team_leader_changed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: LedgerAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub organization_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<LedgerAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

impl LedgerQuery {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn for_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_action(mut self, action: LedgerAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_entity(mut self, entity_type: &str, entity_id: Uuid) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn matches(&self, entry: &ActivityLogEntry) -> bool {
        if let Some(org) = self.organization_id {
            if entry.organization_id != org {
                return false;
            }
        }
        if let Some(actor) = self.actor_id {
            if entry.actor_id != Some(actor) {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(entity_type) = &self.entity_type {
            if entry.entity_type != *entity_type {
                return false;
            }
        }
        if let Some(entity_id) = self.entity_id {
            if entry.entity_id != Some(entity_id) {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerQueryResult {
    pub entries: Vec<ActivityLogEntry>,
    pub total_count: usize,
    pub has_more: bool,
}

pub trait LedgerStore: Send + Sync {
    fn append(&self, entry: ActivityLogEntry) -> impl std::future::Future<Output = Result<()>> + Send;
    fn query(&self, query: LedgerQuery) -> impl std::future::Future<Output = Result<LedgerQueryResult>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl std::future::Future<Output = Result<Option<ActivityLogEntry>>> + Send;
}

#[derive(Debug, Clone)]
pub struct InMemoryLedgerStore {
    entries: Arc<RwLock<Vec<ActivityLogEntry>>>,
    max_entries: usize,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl InMemoryLedgerStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            max_entries,
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: ActivityLogEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(0..excess);
        }
        Ok(())
    }

    async fn query(&self, query: LedgerQuery) -> Result<LedgerQueryResult> {
        let entries = self.entries.read().await;
        let matching: Vec<&ActivityLogEntry> =
            entries.iter().filter(|e| query.matches(e)).collect();
        let total_count = matching.len();
        let page: Vec<ActivityLogEntry> = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        let has_more = query.offset + page.len() < total_count;
        Ok(LedgerQueryResult {
            entries: page,
            total_count,
            has_more,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ActivityLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }
}

/// Front door for recording mutations. Auditing is best-effort relative to
/// the primary action: failures here must not roll it back, but they are an
/// integrity gap worth alerting on, so they are logged and counted.
pub struct ActivityLedger<S: LedgerStore = InMemoryLedgerStore> {
    store: S,
    dropped_entries: AtomicU64,
}

impl ActivityLedger<InMemoryLedgerStore> {
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(InMemoryLedgerStore::new(max_entries))
    }
}

impl Default for ActivityLedger<InMemoryLedgerStore> {
    fn default() -> Self {
        Self::new(InMemoryLedgerStore::default())
    }
}

impl<S: LedgerStore> ActivityLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            dropped_entries: AtomicU64::new(0),
        }
    }

    pub async fn record(
        &self,
        organization_id: Uuid,
        actor_id: Option<Uuid>,
        action: LedgerAction,
        entity_type: &str,
        entity_id: Option<Uuid>,
        metadata: serde_json::Value,
    ) {
        let entry = ActivityLogEntry {
            id: Uuid::new_v4(),
            organization_id,
            actor_id,
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            metadata,
            timestamp: Utc::now(),
        };
        if let Err(err) = self.store.append(entry).await {
            self.dropped_entries.fetch_add(1, Ordering::Relaxed);
            error!(
                organization = %organization_id,
                action = action.as_str(),
                entity_type,
                "activity ledger write failed: {err}"
            );
        }
    }

    pub async fn query(&self, query: LedgerQuery) -> Result<LedgerQueryResult> {
        self.store.query(query).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ActivityLogEntry>> {
        self.store.get_by_id(id).await
    }

    /// Entries that failed to persist since startup. Non-zero values are a
    /// detectable integrity gap for operators.
    pub fn dropped_entries(&self) -> u64 {
        self.dropped_entries.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_query_by_organization() {
        let ledger = ActivityLedger::default();
        let org = Uuid::new_v4();
        let other_org = Uuid::new_v4();
        let actor = Uuid::new_v4();

        ledger
            .record(org, Some(actor), LedgerAction::LeadCreated, "lead", Some(Uuid::new_v4()), serde_json::json!({}))
            .await;
        ledger
            .record(org, Some(actor), LedgerAction::DealCreated, "deal", Some(Uuid::new_v4()), serde_json::json!({}))
            .await;
        ledger
            .record(other_org, None, LedgerAction::LeadCreated, "lead", None, serde_json::json!({}))
            .await;

        let result = ledger
            .query(LedgerQuery::new().for_organization(org))
            .await
            .expect("query");
        assert_eq!(result.total_count, 2);
        assert!(result.entries.iter().all(|e| e.organization_id == org));

        let first = &result.entries[0];
        let fetched = ledger.get_by_id(first.id).await.expect("get");
        assert_eq!(fetched.map(|e| e.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_query_filters_by_action_and_entity() {
        let ledger = ActivityLedger::default();
        let org = Uuid::new_v4();
        let lead_id = Uuid::new_v4();

        ledger
            .record(org, None, LedgerAction::LeadCreated, "lead", Some(lead_id), serde_json::json!({}))
            .await;
        ledger
            .record(org, None, LedgerAction::LeadConverted, "lead", Some(lead_id), serde_json::json!({}))
            .await;
        ledger
            .record(org, None, LedgerAction::LeadCreated, "lead", Some(Uuid::new_v4()), serde_json::json!({}))
            .await;

        let by_action = ledger
            .query(LedgerQuery::new().for_organization(org).with_action(LedgerAction::LeadConverted))
            .await
            .expect("query");
        assert_eq!(by_action.total_count, 1);

        let by_entity = ledger
            .query(LedgerQuery::new().for_organization(org).with_entity("lead", lead_id))
            .await
            .expect("query");
        assert_eq!(by_entity.total_count, 2);
    }

    #[tokio::test]
    async fn test_pagination_reports_has_more() {
        let ledger = ActivityLedger::default();
        let org = Uuid::new_v4();
        for _ in 0..5 {
            ledger
                .record(org, None, LedgerAction::DealUpdated, "deal", None, serde_json::json!({}))
                .await;
        }

        let first_page = ledger
            .query(LedgerQuery::new().for_organization(org).with_limit(2))
            .await
            .expect("query");
        assert_eq!(first_page.entries.len(), 2);
        assert_eq!(first_page.total_count, 5);
        assert!(first_page.has_more);

        let last_page = ledger
            .query(LedgerQuery::new().for_organization(org).with_limit(2).with_offset(4))
            .await
            .expect("query");
        assert_eq!(last_page.entries.len(), 1);
        assert!(!last_page.has_more);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest_entries() {
        let ledger = ActivityLedger::in_memory(3);
        let org = Uuid::new_v4();
        for i in 0..5 {
            ledger
                .record(org, None, LedgerAction::DealUpdated, "deal", None, serde_json::json!({ "seq": i }))
                .await;
        }

        let result = ledger
            .query(LedgerQuery::new().for_organization(org))
            .await
            .expect("query");
        assert_eq!(result.total_count, 3);
        assert_eq!(result.entries[0].metadata["seq"], 2);
    }

    #[tokio::test]
    async fn test_no_drops_on_healthy_store() {
        let ledger = ActivityLedger::default();
        ledger
            .record(Uuid::new_v4(), None, LedgerAction::LeadCreated, "lead", None, serde_json::json!({}))
            .await;
        assert_eq!(ledger.dropped_entries(), 0);
    }
}
