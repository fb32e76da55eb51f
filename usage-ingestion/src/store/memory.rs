//! In-process store backing the test suite.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use usage_ledger::{
    DetailType, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType,
    UsageTransaction, UsageTransactionDetail,
};
use uuid::Uuid;

use super::{MeterDirectory, ReferenceStore, StoreError, StoreResult, UsageLedger};

#[derive(Default)]
struct MemoryState {
    power_regions: Vec<PowerRegion>,
    tdsps: Vec<Tdsp>,
    premises: Vec<Premise>,
    purposes: HashMap<(Uuid, String), Purpose>,
    transaction_types: HashMap<(Uuid, String), TransactionType>,
    transaction_sub_types: HashMap<(Uuid, String), TransactionSubType>,
    detail_types: Vec<DetailType>,
    meters: HashMap<String, Uuid>,
    transactions: Vec<UsageTransaction>,
    details: Vec<UsageTransactionDetail>,
    fail_detail_insert_at: Option<usize>,
}

/// Reference data and ledger held behind a single lock.
///
/// A ledger write stages its rows and only publishes them once every row has
/// been accepted, so readers never observe a partial transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_power_region(&self, region: PowerRegion) {
        self.state().power_regions.push(region);
    }

    pub fn insert_tdsp(&self, tdsp: Tdsp) {
        self.state().tdsps.push(tdsp);
    }

    pub fn insert_premise(&self, premise: Premise) {
        self.state().premises.push(premise);
    }

    pub fn insert_purpose(&self, power_region_id: Uuid, code: &str, purpose: Purpose) {
        self.state()
            .purposes
            .insert((power_region_id, code.to_string()), purpose);
    }

    pub fn insert_transaction_type(&self, power_region_id: Uuid, code: &str, t: TransactionType) {
        self.state()
            .transaction_types
            .insert((power_region_id, code.to_string()), t);
    }

    pub fn insert_transaction_sub_type(&self, power_region_id: Uuid, code: &str, t: TransactionSubType) {
        self.state()
            .transaction_sub_types
            .insert((power_region_id, code.to_string()), t);
    }

    pub fn insert_detail_type(&self, detail_type: DetailType) {
        self.state().detail_types.push(detail_type);
    }

    pub fn insert_meter(&self, name: &str, id: Uuid) {
        self.state().meters.insert(name.to_string(), id);
    }

    /// Make the ledger write fail when it reaches the detail row at `index`.
    pub fn fail_detail_insert_at(&self, index: usize) {
        self.state().fail_detail_insert_at = Some(index);
    }

    pub fn transaction_count(&self) -> usize {
        self.state().transactions.len()
    }

    pub fn detail_count(&self) -> usize {
        self.state().details.len()
    }

    pub fn details(&self) -> Vec<UsageTransactionDetail> {
        self.state().details.clone()
    }
}

#[async_trait::async_trait]
impl ReferenceStore for MemoryStore {
    async fn power_region(&self, name: &str) -> StoreResult<Option<PowerRegion>> {
        Ok(self.state().power_regions.iter().find(|r| r.name == name).cloned())
    }

    async fn tdsp(&self, name: &str) -> StoreResult<Option<Tdsp>> {
        Ok(self.state().tdsps.iter().find(|t| t.name == name).cloned())
    }

    async fn premise(&self, code: &str) -> StoreResult<Option<Premise>> {
        Ok(self.state().premises.iter().find(|p| p.code == code).cloned())
    }

    async fn purpose(&self, power_region_id: Uuid, code: &str) -> StoreResult<Option<Purpose>> {
        Ok(self
            .state()
            .purposes
            .get(&(power_region_id, code.to_string()))
            .cloned())
    }

    async fn transaction_type(
        &self,
        power_region_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<TransactionType>> {
        Ok(self
            .state()
            .transaction_types
            .get(&(power_region_id, code.to_string()))
            .cloned())
    }

    async fn transaction_sub_type(
        &self,
        power_region_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<TransactionSubType>> {
        Ok(self
            .state()
            .transaction_sub_types
            .get(&(power_region_id, code.to_string()))
            .cloned())
    }

    async fn detail_types(&self, power_region_id: Uuid) -> StoreResult<HashMap<String, DetailType>> {
        Ok(self
            .state()
            .detail_types
            .iter()
            .filter(|t| t.power_region_id == power_region_id)
            .map(|t| (t.code.clone(), t.clone()))
            .collect())
    }
}

#[async_trait::async_trait]
impl MeterDirectory for MemoryStore {
    async fn meter_ids(&self, names: &[String]) -> StoreResult<HashMap<String, Uuid>> {
        let state = self.state();
        Ok(names
            .iter()
            .filter_map(|name| state.meters.get(name).map(|id| (name.clone(), *id)))
            .collect())
    }
}

#[async_trait::async_trait]
impl UsageLedger for MemoryStore {
    async fn save_with_details(
        &self,
        header: &UsageTransaction,
        details: &[UsageTransactionDetail],
    ) -> StoreResult<()> {
        let mut state = self.state();

        let mut staged = Vec::with_capacity(details.len());
        for (idx, detail) in details.iter().enumerate() {
            if state.fail_detail_insert_at == Some(idx) {
                return Err(StoreError(format!("detail insert {idx} failed")));
            }
            staged.push(detail.clone());
        }

        state.transactions.push(header.clone());
        state.details.extend(staged);
        Ok(())
    }

    async fn list_transactions(&self) -> StoreResult<Vec<UsageTransaction>> {
        Ok(self.state().transactions.clone())
    }

    async fn transaction_with_details(
        &self,
        id: Uuid,
    ) -> StoreResult<Option<(UsageTransaction, Vec<UsageTransactionDetail>)>> {
        let state = self.state();
        let Some(header) = state.transactions.iter().find(|t| t.id == id).cloned() else {
            return Ok(None);
        };
        let details = state
            .details
            .iter()
            .filter(|d| d.usage_transaction_id == id)
            .cloned()
            .collect();

        Ok(Some((header, details)))
    }
}
