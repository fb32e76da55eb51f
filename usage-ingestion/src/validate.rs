use crate::edi::EdiUsageTransaction;
use crate::ingest::IngestError;

/// Structural validation of an inbound usage transaction.
///
/// Rules:
/// - every header field except `action_code` must be present and non-empty.
/// - `product_transfer_details` must be present (it may be empty).
/// - every detail must carry a product-transfer-detail type code.
///
/// Quantities are not range-checked.
pub fn validate_transaction(tx: &EdiUsageTransaction) -> Result<(), IngestError> {
    let mut errors = Vec::new();

    let required = [
        ("transaction_id", &tx.transaction_id),
        ("transaction_set_purpose_code", &tx.purpose),
        ("premise_code", &tx.premise_code),
        ("power_region", &tx.power_region),
        ("report_type_code", &tx.report_type),
        ("tdsp_name", &tx.tdsp_name),
        ("tdsp_legal_id", &tx.tdsp_legal_id),
        ("cr_name", &tx.cr_name),
        ("cr_legal_id", &tx.cr_legal_id),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(format!("{field} is required"));
        }
    }

    if tx.date.is_none() {
        errors.push("date is required".to_string());
    }

    match &tx.product_transfer_details {
        None => errors.push("product_transfer_details is required".to_string()),
        Some(details) => {
            for (idx, detail) in details.iter().enumerate() {
                if detail.transfer_type.trim().is_empty() {
                    errors.push(format!(
                        "product_transfer_details[{idx}].product_transfer_detail_type_code is required"
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(IngestError::Validation(errors))
    }
}
