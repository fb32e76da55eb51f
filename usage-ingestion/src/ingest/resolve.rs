use usage_ledger::{PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType};

use super::IngestError;
use crate::edi::EdiUsageTransaction;
use crate::store::ReferenceStore;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReferences {
    pub power_region: PowerRegion,
    pub tdsp: Tdsp,
    pub premise: Premise,
    pub purpose: Purpose,
    pub transaction_type: TransactionType,
    pub transaction_sub_type: TransactionSubType,
}

/// Resolve every business code of the transaction, stopping at the first unknown one.
///
/// The power region goes first because purpose and report-type codes are scoped to it.
/// Both the transaction type and sub-type are keyed by the report-type code.
pub async fn resolve_references(
    store: &dyn ReferenceStore,
    tx: &EdiUsageTransaction,
) -> Result<ResolvedReferences, IngestError> {
    let power_region = found(
        store.power_region(&tx.power_region).await?,
        "power region",
        &tx.power_region,
    )?;
    let region_id = power_region.id;

    let tdsp = found(store.tdsp(&tx.tdsp_name).await?, "tdsp", &tx.tdsp_name)?;
    let premise = found(store.premise(&tx.premise_code).await?, "premise", &tx.premise_code)?;
    let purpose = found(
        store.purpose(region_id, &tx.purpose).await?,
        "transaction purpose",
        &tx.purpose,
    )?;
    let transaction_type = found(
        store.transaction_type(region_id, &tx.report_type).await?,
        "transaction type",
        &tx.report_type,
    )?;
    let transaction_sub_type = found(
        store.transaction_sub_type(region_id, &tx.report_type).await?,
        "transaction sub-type",
        &tx.report_type,
    )?;

    Ok(ResolvedReferences {
        power_region,
        tdsp,
        premise,
        purpose,
        transaction_type,
        transaction_sub_type,
    })
}

fn found<T>(value: Option<T>, entity: &'static str, code: &str) -> Result<T, IngestError> {
    value.ok_or_else(|| IngestError::Resolution {
        entity,
        code: code.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::tests::{ercot_store, interval_transaction, ERCOT};
    use uuid::Uuid;

    #[tokio::test]
    async fn resolves_all_references() {
        let store = ercot_store();
        let resolved = resolve_references(&store, &interval_transaction()).await.unwrap();

        assert_eq!(resolved.power_region.id, ERCOT);
        assert_eq!(resolved.tdsp.name, "ONCOR");
        assert_eq!(resolved.purpose.code, "00");
        assert!(!resolved.purpose.is_cancel);
        assert_eq!(resolved.transaction_type.code, "867_03");
        assert_eq!(resolved.transaction_sub_type.code, "IDR");
    }

    #[tokio::test]
    async fn unknown_power_region_fails_first() {
        let store = ercot_store();
        let tx = EdiUsageTransaction {
            power_region: "PJM".to_string(),
            tdsp_name: "NOPE".to_string(),
            ..interval_transaction()
        };

        let err = resolve_references(&store, &tx).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Resolution { entity: "power region", ref code } if code == "PJM"
        ));
    }

    #[tokio::test]
    async fn purpose_codes_are_scoped_to_the_power_region() {
        let store = ercot_store();
        let other_region = Uuid::new_v4();
        store.insert_power_region(PowerRegion {
            id: other_region,
            name: "OTHER".to_string(),
        });

        let tx = EdiUsageTransaction {
            power_region: "OTHER".to_string(),
            ..interval_transaction()
        };

        let err = resolve_references(&store, &tx).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Resolution { entity: "transaction purpose", .. }
        ));
    }

    #[tokio::test]
    async fn report_type_without_sub_type_fails_on_sub_type() {
        let store = ercot_store();
        store.insert_transaction_type(
            ERCOT,
            "C2",
            TransactionType {
                code: "867_03".to_string(),
                name: "Monthly Usage".to_string(),
            },
        );
        let tx = EdiUsageTransaction {
            report_type: "C2".to_string(),
            ..interval_transaction()
        };

        let err = resolve_references(&store, &tx).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Resolution { entity: "transaction sub-type", ref code } if code == "C2"
        ));
    }

    #[tokio::test]
    async fn each_unknown_code_names_its_entity() {
        let cases = [
            (
                EdiUsageTransaction { tdsp_name: "X".to_string(), ..interval_transaction() },
                "tdsp",
            ),
            (
                EdiUsageTransaction { premise_code: "X".to_string(), ..interval_transaction() },
                "premise",
            ),
            (
                EdiUsageTransaction { report_type: "X".to_string(), ..interval_transaction() },
                "transaction type",
            ),
        ];

        let store = ercot_store();
        for (tx, expected) in cases {
            match resolve_references(&store, &tx).await {
                Err(IngestError::Resolution { entity, code }) => {
                    assert_eq!(entity, expected);
                    assert_eq!(code, "X");
                }
                other => panic!("expected resolution error for {expected}, got {other:?}"),
            }
        }
    }
}
