//! Operating cost entries, scoped to an organization and optionally a
//! business unit and month. Append-mostly: entries are recorded and listed,
//! never versioned.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::{ActivityLedger, LedgerAction};
use crate::shared::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub business_unit_id: Option<Uuid>,
    pub month: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub amount: f64,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCostEntry {
    pub business_unit_id: Option<Uuid>,
    pub month: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub amount: f64,
}

#[derive(Clone)]
pub struct CostService {
    entries: Arc<RwLock<HashMap<Uuid, CostEntry>>>,
    ledger: Arc<ActivityLedger>,
}

impl CostService {
    pub fn new(ledger: Arc<ActivityLedger>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ledger,
        }
    }

    pub async fn add_cost_entry(
        &self,
        organization_id: Uuid,
        recorded_by: Uuid,
        new_entry: NewCostEntry,
    ) -> Result<CostEntry, CoreError> {
        if new_entry.amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "cost amount must not be negative, got {}",
                new_entry.amount
            )));
        }
        // Normalize to the first of the month so month equality is exact.
        let month = new_entry.month.with_day(1).unwrap_or(new_entry.month);

        let entry = CostEntry {
            id: Uuid::new_v4(),
            organization_id,
            business_unit_id: new_entry.business_unit_id,
            month,
            category: new_entry.category,
            description: new_entry.description,
            amount: new_entry.amount,
            recorded_by,
            created_at: Utc::now(),
        };
        {
            let mut entries = self.entries.write().await;
            entries.insert(entry.id, entry.clone());
        }
        self.ledger
            .record(
                organization_id,
                Some(recorded_by),
                LedgerAction::CostEntryAdded,
                "cost_entry",
                Some(entry.id),
                serde_json::json!({
                    "category": entry.category,
                    "amount": entry.amount,
                }),
            )
            .await;
        Ok(entry)
    }

    pub async fn costs_for_month(
        &self,
        organization_id: Uuid,
        month: NaiveDate,
        business_unit_id: Option<Uuid>,
    ) -> Vec<CostEntry> {
        let month = month.with_day(1).unwrap_or(month);
        let entries = self.entries.read().await;
        let mut costs: Vec<CostEntry> = entries
            .values()
            .filter(|e| e.organization_id == organization_id && e.month == month)
            .filter(|e| {
                business_unit_id
                    .map(|unit| e.business_unit_id == Some(unit))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        costs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        costs
    }

    pub async fn monthly_total(
        &self,
        organization_id: Uuid,
        month: NaiveDate,
        business_unit_id: Option<Uuid>,
    ) -> f64 {
        self.costs_for_month(organization_id, month, business_unit_id)
            .await
            .iter()
            .map(|e| e.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).expect("valid date")
    }

    fn service() -> CostService {
        CostService::new(Arc::new(ActivityLedger::default()))
    }

    #[tokio::test]
    async fn test_costs_are_grouped_by_month() {
        let costs = service();
        let org = Uuid::new_v4();
        let actor = Uuid::new_v4();

        costs
            .add_cost_entry(
                org,
                actor,
                NewCostEntry {
                    business_unit_id: None,
                    month: NaiveDate::from_ymd_opt(2024, 5, 17).expect("date"),
                    category: "marketing".to_string(),
                    description: None,
                    amount: 3000.0,
                },
            )
            .await
            .expect("add");
        costs
            .add_cost_entry(
                org,
                actor,
                NewCostEntry {
                    business_unit_id: None,
                    month: month(2024, 6),
                    category: "rent".to_string(),
                    description: None,
                    amount: 8000.0,
                },
            )
            .await
            .expect("add");

        // Mid-month dates normalize to the month bucket.
        let may = costs.costs_for_month(org, month(2024, 5), None).await;
        assert_eq!(may.len(), 1);
        assert_eq!(may[0].category, "marketing");
        assert_eq!(costs.monthly_total(org, month(2024, 6), None).await, 8000.0);
    }

    #[tokio::test]
    async fn test_costs_filter_by_business_unit() {
        let costs = service();
        let org = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let unit = Uuid::new_v4();

        costs
            .add_cost_entry(
                org,
                actor,
                NewCostEntry {
                    business_unit_id: Some(unit),
                    month: month(2024, 5),
                    category: "salaries".to_string(),
                    description: None,
                    amount: 40_000.0,
                },
            )
            .await
            .expect("add");
        costs
            .add_cost_entry(
                org,
                actor,
                NewCostEntry {
                    business_unit_id: None,
                    month: month(2024, 5),
                    category: "overhead".to_string(),
                    description: None,
                    amount: 5000.0,
                },
            )
            .await
            .expect("add");

        let unit_costs = costs.costs_for_month(org, month(2024, 5), Some(unit)).await;
        assert_eq!(unit_costs.len(), 1);
        assert_eq!(unit_costs[0].amount, 40_000.0);
        assert_eq!(costs.monthly_total(org, month(2024, 5), None).await, 45_000.0);
    }

    #[tokio::test]
    async fn test_negative_amount_is_rejected() {
        let costs = service();
        let result = costs
            .add_cost_entry(
                Uuid::new_v4(),
                Uuid::new_v4(),
                NewCostEntry {
                    business_unit_id: None,
                    month: month(2024, 1),
                    category: "x".to_string(),
                    description: None,
                    amount: -1.0,
                },
            )
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }
}
