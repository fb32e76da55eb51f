use std::collections::BTreeMap;

use time::OffsetDateTime;
use usage_ledger::UsageTransactionDetail;

use super::RowTemplate;
use crate::edi::{EdiProductTransferDetail, ServicePeriod, CONSUMPTION_CHANNEL, GENERATION_CHANNEL};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalTotals {
    pub consumption: f64,
    pub production: f64,
}

/// Readings of one interval-meter group, summed per interval-end timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalAggregation {
    pub service_period: ServicePeriod,
    pub totals: BTreeMap<OffsetDateTime, IntervalTotals>,
    /// Records that were neither the consumption nor the generation record.
    pub ignored_records: usize,
}

/// Sum the group's consumption (channel 1) and generation (channel 4) readings.
///
/// If several records share a channel the last one is used. The service period
/// comes from the generation record when there is one.
///
/// Sums are accumulated in `f64` in reading order, so permuting readings that share
/// a timestamp can change a total in its last bits.
pub fn aggregate_interval_group(details: &[&EdiProductTransferDetail]) -> IntervalAggregation {
    let consumption = last_on_channel(details, CONSUMPTION_CHANNEL);
    let generation = last_on_channel(details, GENERATION_CHANNEL);

    let mut totals: BTreeMap<OffsetDateTime, IntervalTotals> = BTreeMap::new();
    if let Some(record) = consumption {
        for q in &record.quantities {
            totals.entry(q.interval_end).or_default().consumption += q.quantity;
        }
    }
    if let Some(record) = generation {
        for q in &record.quantities {
            totals.entry(q.interval_end).or_default().production += q.quantity;
        }
    }

    let used = usize::from(consumption.is_some()) + usize::from(generation.is_some());
    let service_period = generation
        .or(consumption)
        .map(|record| record.service_period())
        .unwrap_or_default();

    IntervalAggregation {
        service_period,
        totals,
        ignored_records: details.len() - used,
    }
}

fn last_on_channel<'a>(
    details: &[&'a EdiProductTransferDetail],
    channel: &str,
) -> Option<&'a EdiProductTransferDetail> {
    details.iter().rev().find(|d| d.has_channel(channel)).copied()
}

impl IntervalAggregation {
    /// One row per interval-end timestamp; both quantities are always set.
    pub fn into_rows(self, template: &RowTemplate) -> Vec<UsageTransactionDetail> {
        let period = self.service_period;
        self.totals
            .into_iter()
            .map(|(interval_end, totals)| UsageTransactionDetail {
                service_period_start: period.start,
                service_period_end: period.end,
                interval_end: Some(interval_end),
                consumption: Some(totals.consumption),
                production: Some(totals.production),
                ..template.row()
            })
            .collect()
    }
}
