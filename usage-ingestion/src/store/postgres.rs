use std::collections::HashMap;

use sqlx::postgres::PgPool;
use usage_ledger::{
    db::{reference_queries, usage_transaction_queries},
    DetailType, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType,
    UsageTransaction, UsageTransactionDetail,
};
use uuid::Uuid;

use super::{MeterDirectory, ReferenceStore, StoreResult, UsageLedger};

/// Postgres-backed reference data, meter directory and usage ledger.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReferenceStore for PostgresStore {
    async fn power_region(&self, name: &str) -> StoreResult<Option<PowerRegion>> {
        Ok(reference_queries::power_region_by_name(&self.pool, name).await?)
    }

    async fn tdsp(&self, name: &str) -> StoreResult<Option<Tdsp>> {
        Ok(reference_queries::tdsp_by_name(&self.pool, name).await?)
    }

    async fn premise(&self, code: &str) -> StoreResult<Option<Premise>> {
        Ok(reference_queries::premise_by_code(&self.pool, code).await?)
    }

    async fn purpose(&self, power_region_id: Uuid, code: &str) -> StoreResult<Option<Purpose>> {
        Ok(reference_queries::purpose_by_region_and_code(&self.pool, power_region_id, code).await?)
    }

    async fn transaction_type(
        &self,
        power_region_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<TransactionType>> {
        Ok(
            reference_queries::transaction_type_by_region_and_code(&self.pool, power_region_id, code)
                .await?,
        )
    }

    async fn transaction_sub_type(
        &self,
        power_region_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<TransactionSubType>> {
        Ok(reference_queries::transaction_sub_type_by_region_and_code(
            &self.pool,
            power_region_id,
            code,
        )
        .await?)
    }

    async fn detail_types(&self, power_region_id: Uuid) -> StoreResult<HashMap<String, DetailType>> {
        Ok(reference_queries::detail_types_by_region(&self.pool, power_region_id).await?)
    }
}

#[async_trait::async_trait]
impl MeterDirectory for PostgresStore {
    async fn meter_ids(&self, names: &[String]) -> StoreResult<HashMap<String, Uuid>> {
        Ok(reference_queries::meter_ids_by_name(&self.pool, names).await?)
    }
}

#[async_trait::async_trait]
impl UsageLedger for PostgresStore {
    async fn save_with_details(
        &self,
        header: &UsageTransaction,
        details: &[UsageTransactionDetail],
    ) -> StoreResult<()> {
        match usage_transaction_queries::save_with_details(&self.pool, header, details).await {
            Ok(()) => {
                metrics::counter!("usage_transactions_written_total").increment(1);
                metrics::counter!("usage_detail_rows_written_total").increment(details.len() as u64);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    usage_transaction_id = %header.id,
                    detail_rows = details.len(),
                    "usage ledger write rolled back"
                );
                metrics::counter!("usage_ledger_errors_total").increment(1);
                Err(e.into())
            }
        }
    }

    async fn list_transactions(&self) -> StoreResult<Vec<UsageTransaction>> {
        Ok(usage_transaction_queries::list_transactions(&self.pool).await?)
    }

    async fn transaction_with_details(
        &self,
        id: Uuid,
    ) -> StoreResult<Option<(UsageTransaction, Vec<UsageTransactionDetail>)>> {
        let Some(header) = usage_transaction_queries::transaction_by_id(&self.pool, id).await? else {
            return Ok(None);
        };
        let details = usage_transaction_queries::details_for_transaction(&self.pool, id).await?;

        Ok(Some((header, details)))
    }
}
