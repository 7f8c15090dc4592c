//! Temporal Configuration Store
//!
//! One generic effective-dated versioning component backing both commission
//! rates and employee salaries. A key has at most one open version
//! (`effective_to = None`) at any time; enacting a new version closes the
//! old one and inserts the new one under a single write guard, so a reader
//! never observes zero or two open versions for the same key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::shared::error::CoreError;

pub mod commission;
pub mod salary;

pub use commission::CommissionService;
pub use salary::SalaryService;

/// An effective-dated fact: valid over the half-open interval
/// `[effective_from, effective_to)`, with `None` meaning currently in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalRecord<K> {
    pub id: Uuid,
    pub key: K,
    pub amount: f64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl<K> TemporalRecord<K> {
    pub fn is_open(&self) -> bool {
        self.effective_to.is_none()
    }

    fn covers(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map(|to| to >= date).unwrap_or(true)
    }
}

pub struct TemporalStore<K> {
    records: Arc<RwLock<HashMap<K, Vec<TemporalRecord<K>>>>>,
}

impl<K> Default for TemporalStore<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TemporalStore<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Enacts a new version for `key`: closes the open version at
    /// `effective_from` and inserts the new open one. Versions are never
    /// edited in place or deleted. The whole close-and-open runs under one
    /// write guard.
    pub async fn set_current(
        &self,
        key: K,
        amount: f64,
        effective_from: NaiveDate,
        created_by: Option<Uuid>,
    ) -> Result<Uuid, CoreError> {
        let mut records = self.records.write().await;
        let versions = records.entry(key.clone()).or_default();

        if let Some(open) = versions.iter_mut().find(|r| r.is_open()) {
            if effective_from < open.effective_from {
                return Err(CoreError::ConfigConflict(format!(
                    "new version for {key:?} starts {effective_from}, before the open version's {}",
                    open.effective_from
                )));
            }
            open.effective_to = Some(effective_from);
        }

        let record = TemporalRecord {
            id: Uuid::new_v4(),
            key: key.clone(),
            amount,
            effective_from,
            effective_to: None,
            created_by,
            created_at: Utc::now(),
        };
        let version_id = record.id;
        versions.push(record);
        info!(key = ?key, %effective_from, amount, "temporal version enacted");
        Ok(version_id)
    }

    /// The version in force at `date`. When a past anomaly left more than
    /// one covering record, the most recently started wins; that tie-break
    /// is defensive, not a normal path. A missing record is `NotFound`,
    /// never a zero amount.
    pub async fn value_at(&self, key: &K, date: NaiveDate) -> Result<TemporalRecord<K>, CoreError> {
        let records = self.records.read().await;
        records
            .get(key)
            .and_then(|versions| {
                versions
                    .iter()
                    .filter(|r| r.covers(date))
                    .max_by_key(|r| (r.effective_from, r.created_at))
            })
            .cloned()
            .ok_or_else(|| {
                CoreError::NotFound(format!("no version of {key:?} covers {date}"))
            })
    }

    /// The currently open version, independent of date arithmetic.
    pub async fn current(&self, key: &K) -> Result<TemporalRecord<K>, CoreError> {
        let records = self.records.read().await;
        records
            .get(key)
            .and_then(|versions| versions.iter().find(|r| r.is_open()))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("no open version of {key:?}")))
    }

    pub async fn history(&self, key: &K) -> Vec<TemporalRecord<K>> {
        let records = self.records.read().await;
        let mut versions = records.get(key).cloned().unwrap_or_default();
        versions.sort_by_key(|r| (r.effective_from, r.created_at));
        versions
    }

    /// Number of open versions for `key`. Invariant: never more than one.
    #[cfg(test)]
    async fn open_count(&self, key: &K) -> usize {
        let records = self.records.read().await;
        records
            .get(key)
            .map(|versions| versions.iter().filter(|r| r.is_open()).count())
            .unwrap_or(0)
    }
}

// Cloning shares the underlying map, matching the service sharing model.
impl<K> Clone for TemporalStore<K> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}
