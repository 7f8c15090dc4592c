//! Employee salaries per organization, versioned by effective date. A raise
//! closes the current salary record and opens a new one; history is never
//! rewritten.

use chrono::NaiveDate;
use uuid::Uuid;

use super::{TemporalRecord, TemporalStore};
use crate::shared::error::CoreError;

pub type SalaryKey = (Uuid, Uuid);

#[derive(Clone, Default)]
pub struct SalaryService {
    store: TemporalStore<SalaryKey>,
}

impl SalaryService {
    pub fn new() -> Self {
        Self {
            store: TemporalStore::new(),
        }
    }

    pub async fn set_salary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        monthly_salary: f64,
        effective_from: NaiveDate,
        changed_by: Option<Uuid>,
    ) -> Result<Uuid, CoreError> {
        if monthly_salary < 0.0 {
            return Err(CoreError::Validation(format!(
                "salary must not be negative, got {monthly_salary}"
            )));
        }
        self.store
            .set_current(
                (organization_id, employee_id),
                monthly_salary,
                effective_from,
                changed_by,
            )
            .await
    }

    pub async fn salary_at(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<TemporalRecord<SalaryKey>, CoreError> {
        self.store.value_at(&(organization_id, employee_id), date).await
    }

    pub async fn current_salary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> Result<TemporalRecord<SalaryKey>, CoreError> {
        self.store.current(&(organization_id, employee_id)).await
    }

    pub async fn history(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> Vec<TemporalRecord<SalaryKey>> {
        self.store.history(&(organization_id, employee_id)).await
    }
}
