use std::collections::HashMap;

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DetailType, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType};

pub async fn power_region_by_name(pool: &PgPool, name: &str) -> Result<Option<PowerRegion>> {
    let row = sqlx::query_as::<_, PowerRegion>("SELECT id, name FROM power_region WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn tdsp_by_name(pool: &PgPool, name: &str) -> Result<Option<Tdsp>> {
    let row = sqlx::query_as::<_, Tdsp>("SELECT id, name, code, legal_id FROM tdsp WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn premise_by_code(pool: &PgPool, code: &str) -> Result<Option<Premise>> {
    let row = sqlx::query_as::<_, Premise>(
        "SELECT id, code, name, power_region_id FROM premise WHERE code = $1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Resolve a purpose through the power region's own code for it.
pub async fn purpose_by_region_and_code(
    pool: &PgPool,
    power_region_id: Uuid,
    code: &str,
) -> Result<Option<Purpose>> {
    let row = sqlx::query_as::<_, Purpose>(
        r#"
        SELECT utp.code, utp.name, utp.is_cancel
        FROM usage_transaction_purpose utp
        JOIN power_region_usage_transaction_purpose prutp
          ON utp.code = prutp.usage_transaction_purpose_code
        WHERE prutp.power_region_id = $1
          AND prutp.code = $2
        "#,
    )
    .bind(power_region_id)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn transaction_type_by_region_and_code(
    pool: &PgPool,
    power_region_id: Uuid,
    code: &str,
) -> Result<Option<TransactionType>> {
    let row = sqlx::query_as::<_, TransactionType>(
        r#"
        SELECT tt.code, tt.name
        FROM power_region_transaction_type prtt
        JOIN transaction_type tt
          ON prtt.transaction_type_code = tt.code
        WHERE prtt.power_region_id = $1
          AND prtt.code = $2
        "#,
    )
    .bind(power_region_id)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn transaction_sub_type_by_region_and_code(
    pool: &PgPool,
    power_region_id: Uuid,
    code: &str,
) -> Result<Option<TransactionSubType>> {
    let row = sqlx::query_as::<_, TransactionSubType>(
        r#"
        SELECT tst.code, tst.transaction_type_code, tst.name
        FROM power_region_transaction_sub_type prtst
        JOIN transaction_sub_type tst
          ON prtst.transaction_sub_type_code = tst.code
        WHERE prtst.power_region_id = $1
          AND prtst.code = $2
        "#,
    )
    .bind(power_region_id)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All product-transfer-detail types of one power region, keyed by code.
pub async fn detail_types_by_region(
    pool: &PgPool,
    power_region_id: Uuid,
) -> Result<HashMap<String, DetailType>> {
    let rows = sqlx::query_as::<_, DetailType>(
        r#"
        SELECT code, power_region_id, interval, meter, summary, name
        FROM power_region_usage_transaction_product_transfer_detail_type
        WHERE power_region_id = $1
        "#,
    )
    .bind(power_region_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|t| (t.code.clone(), t)).collect())
}

/// Batched meter lookup. Names without a meter record are absent from the result.
pub async fn meter_ids_by_name(pool: &PgPool, names: &[String]) -> Result<HashMap<String, Uuid>> {
    if names.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (String, Uuid)>(
        "SELECT DISTINCT ON (name) name, id FROM meter WHERE name = ANY($1) ORDER BY name, id",
    )
    .bind(names)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
