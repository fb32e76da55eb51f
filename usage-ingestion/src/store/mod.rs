//! Collaborators the ingestion engine reads from and writes to.

use std::collections::HashMap;

use usage_ledger::{
    DetailType, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType,
    UsageTransaction, UsageTransactionDetail,
};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        Self(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reference data, looked up by business code.
///
/// Purpose, transaction type and sub-type codes are only meaningful within a power region.
#[async_trait::async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn power_region(&self, name: &str) -> StoreResult<Option<PowerRegion>>;

    async fn tdsp(&self, name: &str) -> StoreResult<Option<Tdsp>>;

    async fn premise(&self, code: &str) -> StoreResult<Option<Premise>>;

    async fn purpose(&self, power_region_id: Uuid, code: &str) -> StoreResult<Option<Purpose>>;

    async fn transaction_type(
        &self,
        power_region_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<TransactionType>>;

    async fn transaction_sub_type(
        &self,
        power_region_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<TransactionSubType>>;

    async fn detail_types(&self, power_region_id: Uuid) -> StoreResult<HashMap<String, DetailType>>;
}

#[async_trait::async_trait]
pub trait MeterDirectory: Send + Sync {
    /// Names without a meter record are simply absent from the result.
    async fn meter_ids(&self, names: &[String]) -> StoreResult<HashMap<String, Uuid>>;
}

#[async_trait::async_trait]
pub trait UsageLedger: Send + Sync {
    /// Persist the header and every detail row, or nothing at all.
    async fn save_with_details(
        &self,
        header: &UsageTransaction,
        details: &[UsageTransactionDetail],
    ) -> StoreResult<()>;

    async fn list_transactions(&self) -> StoreResult<Vec<UsageTransaction>>;

    async fn transaction_with_details(
        &self,
        id: Uuid,
    ) -> StoreResult<Option<(UsageTransaction, Vec<UsageTransactionDetail>)>>;
}
