//! Commission rates per organization and role, versioned by effective date.
//! Rates are expressed per million of deal value.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::{TemporalRecord, TemporalStore};
use crate::org::Role;
use crate::shared::error::CoreError;

pub const COMMISSION_BASIS: f64 = 1_000_000.0;

pub type CommissionKey = (Uuid, Role);

#[derive(Clone, Default)]
pub struct CommissionService {
    store: TemporalStore<CommissionKey>,
}

impl CommissionService {
    pub fn new() -> Self {
        Self {
            store: TemporalStore::new(),
        }
    }

    pub async fn set_rate(
        &self,
        organization_id: Uuid,
        role: Role,
        rate_per_million: f64,
        effective_from: NaiveDate,
        changed_by: Option<Uuid>,
    ) -> Result<Uuid, CoreError> {
        if rate_per_million < 0.0 {
            return Err(CoreError::Validation(format!(
                "commission rate must not be negative, got {rate_per_million}"
            )));
        }
        self.store
            .set_current((organization_id, role), rate_per_million, effective_from, changed_by)
            .await
    }

    pub async fn rate_at(
        &self,
        organization_id: Uuid,
        role: Role,
        date: NaiveDate,
    ) -> Result<TemporalRecord<CommissionKey>, CoreError> {
        self.store.value_at(&(organization_id, role), date).await
    }

    /// Commission owed on a deal, using the rate in force at `date` (the
    /// deal's close date for historical figures, today otherwise).
    pub async fn commission_for(
        &self,
        organization_id: Uuid,
        role: Role,
        deal_value: f64,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        let record = self.rate_at(organization_id, role, date).await?;
        Ok(deal_value / COMMISSION_BASIS * record.amount)
    }

    pub async fn commission_now(
        &self,
        organization_id: Uuid,
        role: Role,
        deal_value: f64,
    ) -> Result<f64, CoreError> {
        self.commission_for(organization_id, role, deal_value, Utc::now().date_naive())
            .await
    }

    pub async fn history(
        &self,
        organization_id: Uuid,
        role: Role,
    ) -> Vec<TemporalRecord<CommissionKey>> {
        self.store.history(&(organization_id, role)).await
    }
}
