//! The production ledger: calculator and record store wired together.
//!
//! Every write goes through here so derived costs are always recomputed from
//! the submitted inputs with the configured [`DivisorPolicy`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::calculator::{calculate, DivisorPolicy};
use crate::error::Result;
use crate::record::{CalculatedRecord, ProductionInputs, ProductionRecord};
use crate::storage::RecordStore;

/// Owns the store handle and the divisor policy.
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct Ledger {
    store: Arc<dyn RecordStore>,
    policy: DivisorPolicy,
}

impl Ledger {
    /// Create a ledger over an opened store.
    #[must_use]
    pub fn new(store: Box<dyn RecordStore>, policy: DivisorPolicy) -> Self {
        Self {
            store: Arc::from(store),
            policy,
        }
    }

    /// The store behind this ledger.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// The divisor policy applied on every write.
    #[must_use]
    pub fn policy(&self) -> &DivisorPolicy {
        &self.policy
    }

    /// Derive costs without storing anything.
    #[must_use]
    pub fn preview(&self, inputs: &ProductionInputs) -> CalculatedRecord {
        calculate(inputs, &self.policy)
    }

    /// All records, newest day first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<ProductionRecord>> {
        self.store.list().await
    }

    /// One record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get(&self, id: i64) -> Result<Option<ProductionRecord>> {
        self.store.get(id).await
    }

    /// Calculate and store a new day's record.
    ///
    /// Returns the assigned id together with the calculated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub async fn create(&self, inputs: &ProductionInputs) -> Result<(i64, CalculatedRecord)> {
        let record = calculate(inputs, &self.policy);
        let id = self.store.create(&record).await?;
        info!(
            id,
            date = %record.inputs.date,
            grand_total = record.costs.grand_total_cost_per_tube,
            "Created production record"
        );
        Ok((id, record))
    }

    /// Recalculate and overwrite an existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub async fn update(&self, id: i64, inputs: &ProductionInputs) -> Result<CalculatedRecord> {
        let record = calculate(inputs, &self.policy);
        self.store.update(id, &record).await?;
        info!(
            id,
            date = %record.inputs.date,
            grand_total = record.costs.grand_total_cost_per_tube,
            "Updated production record"
        );
        Ok(record)
    }

    /// Delete a record; deleting a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete(id).await?;
        debug!(id, "Deleted production record");
        Ok(())
    }

    /// Close the underlying store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to shut down cleanly.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EmbeddedStore;
    use chrono::NaiveDate;

    fn ledger(policy: DivisorPolicy) -> Ledger {
        let store = EmbeddedStore::open_in_memory().expect("in-memory store");
        Ledger::new(Box::new(store), policy)
    }

    fn inputs(date: &str) -> ProductionInputs {
        let mut inputs =
            ProductionInputs::new(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap());
        inputs.production = 10000.0;
        inputs.outdone = 9500.0;
        inputs.paper_quantity_kg = 250.0;
        inputs.paper_rate = 45.5;
        inputs
    }

    #[tokio::test]
    async fn test_create_stores_calculated_record() {
        let ledger = ledger(DivisorPolicy::production());
        let (id, record) = ledger.create(&inputs("2024-03-15")).await.unwrap();

        assert_eq!(record.costs.paper_cost_per_tube, 1.14);
        let stored = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(stored.record, record);
    }

    #[tokio::test]
    async fn test_policy_applies_to_writes() {
        let ledger = ledger(DivisorPolicy::form());
        let (_, record) = ledger.create(&inputs("2024-03-15")).await.unwrap();
        assert_eq!(record.costs.paper_cost_per_tube, 1.2);
        assert_eq!(ledger.policy(), &DivisorPolicy::form());
    }

    #[tokio::test]
    async fn test_update_recomputes_from_scratch() {
        let ledger = ledger(DivisorPolicy::production());
        let (id, _) = ledger.create(&inputs("2024-03-15")).await.unwrap();

        let mut changed = inputs("2024-03-15");
        changed.paper_quantity_kg = 0.0;
        changed.food_amount = 800.0;
        let record = ledger.update(id, &changed).await.unwrap();

        assert_eq!(record.costs.paper_cost, 0.0);
        assert_eq!(record.costs.food_cost_per_tube, 0.08);
        assert_eq!(record.costs.grand_total_cost_per_tube, 0.08);
        assert_eq!(ledger.get(id).await.unwrap().unwrap().record, record);
    }

    #[tokio::test]
    async fn test_preview_does_not_store() {
        let ledger = ledger(DivisorPolicy::production());
        let record = ledger.preview(&inputs("2024-03-15"));

        assert_eq!(record.costs.paper_cost, 11375.0);
        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let ledger = ledger(DivisorPolicy::production());
        ledger.delete(7).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_closes_store() {
        let ledger = ledger(DivisorPolicy::production());
        ledger.close().await.unwrap();
        assert!(ledger.list().await.unwrap_err().is_store_closed());
    }
}
