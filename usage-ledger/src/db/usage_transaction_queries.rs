use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{UsageTransaction, UsageTransactionDetail};

const TRANSACTION_COLUMNS: &str = "id, transaction_id, transaction_date, power_region_id, tdsp_id, \
     premise_id, purpose, is_final, is_canceled, transaction_type, transaction_sub_type, created";

/// Write a transaction header and all of its detail rows in one database transaction.
///
/// Details are inserted one by one after the header; any failure drops `tx`
/// before commit, which rolls the whole write back.
pub async fn save_with_details(
    pool: &PgPool,
    header: &UsageTransaction,
    details: &[UsageTransactionDetail],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO usage_transaction (
            id, transaction_id, transaction_date, power_region_id, tdsp_id, premise_id,
            purpose, is_final, is_canceled, transaction_type, transaction_sub_type, created
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(header.id)
    .bind(&header.transaction_id)
    .bind(header.transaction_date)
    .bind(header.power_region_id)
    .bind(header.tdsp_id)
    .bind(header.premise_id)
    .bind(&header.purpose)
    .bind(header.is_final)
    .bind(header.is_canceled)
    .bind(&header.transaction_type)
    .bind(&header.transaction_sub_type)
    .bind(header.created)
    .execute(&mut *tx)
    .await?;

    for d in details {
        sqlx::query(
            r#"
            INSERT INTO usage_transaction_detail (
                usage_transaction_id, meter_id, meter_name, power_region_id, premise_id,
                is_canceled, service_period_start, service_period_end, interval_start,
                interval_end, consumption, production
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(d.usage_transaction_id)
        .bind(d.meter.id())
        .bind(&d.meter_name)
        .bind(d.power_region_id)
        .bind(d.premise_id)
        .bind(d.is_canceled)
        .bind(d.service_period_start)
        .bind(d.service_period_end)
        .bind(d.interval_start)
        .bind(d.interval_end)
        .bind(d.consumption)
        .bind(d.production)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// All transaction headers, newest first.
pub async fn list_transactions(pool: &PgPool) -> Result<Vec<UsageTransaction>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM usage_transaction ORDER BY created DESC");
    let rows = sqlx::query_as::<_, UsageTransaction>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

pub async fn transaction_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UsageTransaction>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM usage_transaction WHERE id = $1");
    let row = sqlx::query_as::<_, UsageTransaction>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn details_for_transaction(
    pool: &PgPool,
    usage_transaction_id: Uuid,
) -> Result<Vec<UsageTransactionDetail>> {
    let rows = sqlx::query_as::<_, UsageTransactionDetail>(
        r#"
        SELECT
            usage_transaction_id,
            meter_id,
            meter_name,
            power_region_id,
            premise_id,
            is_canceled,
            service_period_start,
            service_period_end,
            interval_start,
            interval_end,
            consumption,
            production
        FROM usage_transaction_detail
        WHERE usage_transaction_id = $1
        ORDER BY meter_name, interval_end
        "#,
    )
    .bind(usage_transaction_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
