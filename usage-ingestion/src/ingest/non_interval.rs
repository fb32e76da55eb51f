use usage_ledger::UsageTransactionDetail;

use super::RowTemplate;
use crate::edi::EdiProductTransferDetail;

/// One consumption row per reading, covering the record's service period.
pub fn emit_non_interval_rows(
    template: &RowTemplate,
    details: &[&EdiProductTransferDetail],
) -> Vec<UsageTransactionDetail> {
    details
        .iter()
        .flat_map(|record| {
            record.quantities.iter().map(move |q| UsageTransactionDetail {
                service_period_start: record.service_period_start,
                service_period_end: record.service_period_end,
                interval_start: record.service_period_start,
                interval_end: record.service_period_end,
                consumption: Some(q.quantity),
                production: None,
                ..template.row()
            })
        })
        .collect()
}
