//! Normalization of EDI usage transactions into ledger rows.
//!
//! One request walks `Received -> Resolving -> Grouping -> Aggregating ->
//! Persisting -> Committed`, dropping to `Failed` from any stage. Only the
//! final ledger write has side effects, and it is atomic.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::SystemTime,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::Instrument;
use usage_ledger::{DetailKind, MeterRef, UsageTransaction, UsageTransactionDetail};
use uuid::Uuid;

use crate::edi::EdiUsageTransaction;
use crate::store::{MeterDirectory, ReferenceStore, StoreError, UsageLedger};
use crate::validate::validate_transaction;

pub mod group;
pub mod interval;
pub mod non_interval;
pub mod resolve;

pub use group::{group_details, unique_meter_names, DetailGroup, GroupKey};
pub use interval::{aggregate_interval_group, IntervalAggregation};
pub use non_interval::emit_non_interval_rows;
pub use resolve::{resolve_references, ResolvedReferences};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("invalid transaction: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("unknown {entity} '{code}'")]
    Resolution { entity: &'static str, code: String },
    #[error("unresolved meters: {}", .0.join(", "))]
    UnresolvedMeter(Vec<String>),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Resolving,
    Grouping,
    Aggregating,
    Persisting,
    Committed,
    Failed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolving => "resolving",
            Self::Grouping => "grouping",
            Self::Aggregating => "aggregating",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }
}

fn advance(stage: &mut IngestStage, next: IngestStage) {
    tracing::debug!(from = stage.as_str(), to = next.as_str(), "ingest stage");
    *stage = next;
}

/// What to do with meter-level rows whose meter name has no meter record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedMeterPolicy {
    /// Write the rows with a NULL meter id.
    #[default]
    PersistUnknown,
    /// Drop the rows and report the group.
    SkipRows,
    /// Fail the whole transaction.
    Reject,
}

/// Fields shared by every detail row emitted for one group.
#[derive(Debug, Clone)]
pub struct RowTemplate {
    pub usage_transaction_id: Uuid,
    pub meter: MeterRef,
    pub meter_name: Option<String>,
    pub power_region_id: Uuid,
    pub premise_id: Uuid,
    pub is_canceled: bool,
}

impl RowTemplate {
    pub fn row(&self) -> UsageTransactionDetail {
        UsageTransactionDetail {
            usage_transaction_id: self.usage_transaction_id,
            meter: self.meter,
            meter_name: self.meter_name.clone(),
            power_region_id: self.power_region_id,
            premise_id: self.premise_id,
            is_canceled: self.is_canceled,
            service_period_start: None,
            service_period_end: None,
            interval_start: None,
            interval_end: None,
            consumption: None,
            production: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum GroupDisposition {
    Emitted { rows: usize },
    UnknownDetailType,
    Summary,
    Unmetered,
    UnresolvedMeterSkipped { rows: usize },
}

impl GroupDisposition {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Emitted { .. } => "emitted",
            Self::UnknownDetailType => "unknown_detail_type",
            Self::Summary => "summary",
            Self::Unmetered => "unmetered",
            Self::UnresolvedMeterSkipped { .. } => "unresolved_meter_skipped",
        }
    }
}

/// How one (meter, transfer type) group was accounted for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub meter_name: Option<String>,
    pub transfer_type: String,
    #[serde(flatten)]
    pub disposition: GroupDisposition,
    /// Records inside the group that did not contribute to its rows.
    pub ignored_records: usize,
}

impl GroupReport {
    pub fn is_unhandled(&self) -> bool {
        !matches!(self.disposition, GroupDisposition::Emitted { .. }) || self.ignored_records > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub details: Vec<UsageTransactionDetail>,
    pub groups: Vec<GroupReport>,
}

/// Turn grouped details into ledger rows for `header`.
pub fn normalize_groups(
    header: &UsageTransaction,
    groups: BTreeMap<GroupKey, DetailGroup<'_>>,
    meter_ids: &HashMap<String, Uuid>,
    policy: UnresolvedMeterPolicy,
) -> Result<Normalized, IngestError> {
    let mut normalized = Normalized::default();
    let mut unresolved = Vec::new();

    for (key, group) in groups {
        let meter = MeterRef::from(
            key.meter_name
                .as_ref()
                .and_then(|name| meter_ids.get(name))
                .copied(),
        );
        let template = RowTemplate {
            usage_transaction_id: header.id,
            meter,
            meter_name: key.meter_name.clone(),
            power_region_id: header.power_region_id,
            premise_id: header.premise_id,
            is_canceled: header.is_canceled,
        };

        let mut ignored_records = 0;
        let disposition = match group.kind() {
            None => GroupDisposition::UnknownDetailType,
            Some(DetailKind::Summary) => GroupDisposition::Summary,
            Some(DetailKind::Unmetered) => GroupDisposition::Unmetered,
            Some(kind) => {
                let rows = if kind == DetailKind::IntervalMeter {
                    let aggregation = aggregate_interval_group(&group.details);
                    ignored_records = aggregation.ignored_records;
                    aggregation.into_rows(&template)
                } else {
                    emit_non_interval_rows(&template, &group.details)
                };

                let count = rows.len();
                match (meter, policy) {
                    (MeterRef::Unknown, UnresolvedMeterPolicy::SkipRows) if count > 0 => {
                        GroupDisposition::UnresolvedMeterSkipped { rows: count }
                    }
                    (MeterRef::Unknown, UnresolvedMeterPolicy::Reject) if count > 0 => {
                        unresolved.push(
                            key.meter_name
                                .clone()
                                .unwrap_or_else(|| "<unnamed>".to_string()),
                        );
                        GroupDisposition::Emitted { rows: count }
                    }
                    _ => {
                        normalized.details.extend(rows);
                        GroupDisposition::Emitted { rows: count }
                    }
                }
            }
        };

        let report = GroupReport {
            meter_name: key.meter_name,
            transfer_type: key.transfer_type,
            disposition,
            ignored_records,
        };
        if report.is_unhandled() {
            tracing::warn!(
                meter_name = report.meter_name.as_deref().unwrap_or_default(),
                transfer_type = %report.transfer_type,
                reason = report.disposition.reason(),
                ignored_records = report.ignored_records,
                "detail group not fully normalized"
            );
            metrics::counter!("usage_unhandled_groups_total", "reason" => report.disposition.reason())
                .increment(1);
        }
        normalized.groups.push(report);
    }

    if !unresolved.is_empty() {
        unresolved.sort();
        unresolved.dedup();
        return Err(IngestError::UnresolvedMeter(unresolved));
    }

    Ok(normalized)
}

fn build_header(
    tx: &EdiUsageTransaction,
    refs: &ResolvedReferences,
) -> Result<UsageTransaction, IngestError> {
    let transaction_date = tx
        .date
        .ok_or_else(|| IngestError::Validation(vec!["date is required".to_string()]))?;

    Ok(UsageTransaction {
        id: Uuid::new_v4(),
        transaction_id: tx.transaction_id.clone(),
        transaction_date,
        power_region_id: refs.power_region.id,
        tdsp_id: refs.tdsp.id,
        premise_id: refs.premise.id,
        purpose: refs.purpose.code.clone(),
        is_final: tx.is_final(),
        is_canceled: refs.purpose.is_cancel,
        transaction_type: refs.transaction_type.code.clone(),
        transaction_sub_type: refs.transaction_sub_type.code.clone(),
        created: OffsetDateTime::now_utc(),
    })
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub header: UsageTransaction,
    pub detail_rows: usize,
    pub groups: Vec<GroupReport>,
}

impl IngestOutcome {
    pub fn unhandled_groups(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| g.is_unhandled())
    }
}

pub struct Ingestor {
    references: Arc<dyn ReferenceStore>,
    meters: Arc<dyn MeterDirectory>,
    ledger: Arc<dyn UsageLedger>,
    unresolved_meter_policy: UnresolvedMeterPolicy,
}

impl Ingestor {
    pub fn new(
        references: Arc<dyn ReferenceStore>,
        meters: Arc<dyn MeterDirectory>,
        ledger: Arc<dyn UsageLedger>,
        unresolved_meter_policy: UnresolvedMeterPolicy,
    ) -> Self {
        Self {
            references,
            meters,
            ledger,
            unresolved_meter_policy,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn UsageLedger> {
        &self.ledger
    }

    pub async fn ingest(
        &self,
        env: Envelope<EdiUsageTransaction>,
    ) -> Result<IngestOutcome, IngestError> {
        metrics::counter!("edi_usage_requests_total").increment(1);

        let transaction_id = env.payload.transaction_id.as_str();
        let span = tracing::info_span!("ingest", transaction_id);
        let mut stage = IngestStage::Received;
        let result = self.process(&env.payload, &mut stage).instrument(span).await;

        match &result {
            Ok(outcome) => {
                if let Ok(dur) = SystemTime::now().duration_since(env.received_at) {
                    metrics::histogram!("edi_usage_ingest_latency_seconds").record(dur.as_secs_f64());
                }
                tracing::info!(
                    transaction_id,
                    usage_transaction_id = %outcome.header.id,
                    detail_rows = outcome.detail_rows,
                    unhandled_groups = outcome.unhandled_groups().count(),
                    "usage transaction committed"
                );
            }
            Err(e) => {
                let failed_at = stage.as_str();
                advance(&mut stage, IngestStage::Failed);
                metrics::counter!("edi_usage_rejected_total", "stage" => failed_at).increment(1);
                if matches!(e, IngestError::Storage(_)) {
                    tracing::error!(transaction_id, error = %e, stage = failed_at, "usage transaction failed");
                } else {
                    tracing::warn!(transaction_id, error = %e, stage = failed_at, "usage transaction rejected");
                }
            }
        }

        result
    }

    async fn process(
        &self,
        tx: &EdiUsageTransaction,
        stage: &mut IngestStage,
    ) -> Result<IngestOutcome, IngestError> {
        validate_transaction(tx)?;

        advance(stage, IngestStage::Resolving);
        let refs = resolve_references(self.references.as_ref(), tx).await?;

        advance(stage, IngestStage::Grouping);
        let detail_types = self.references.detail_types(refs.power_region.id).await?;
        let meter_ids = self.meters.meter_ids(&unique_meter_names(tx.details())).await?;
        let groups = group_details(tx.details(), &detail_types);

        advance(stage, IngestStage::Aggregating);
        let header = build_header(tx, &refs)?;
        let normalized = normalize_groups(&header, groups, &meter_ids, self.unresolved_meter_policy)?;

        advance(stage, IngestStage::Persisting);
        self.ledger
            .save_with_details(&header, &normalized.details)
            .await?;

        advance(stage, IngestStage::Committed);
        Ok(IngestOutcome {
            header,
            detail_rows: normalized.details.len(),
            groups: normalized.groups,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::edi::{EdiProductTransferDetail, EdiQuantity};
    use crate::store::MemoryStore;
    use time::macros::datetime;
    use usage_ledger::{
        DetailType, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType,
    };

    pub(crate) const ERCOT: Uuid = Uuid::from_u128(0xE4C07);
    pub(crate) const ONCOR: Uuid = Uuid::from_u128(0x0C04);
    pub(crate) const PREMISE: Uuid = Uuid::from_u128(0x9E);
    pub(crate) const METER_1: Uuid = Uuid::from_u128(0x1);

    const T1: OffsetDateTime = datetime!(2024-01-01 00:15:00 UTC);
    const T2: OffsetDateTime = datetime!(2024-01-01 00:30:00 UTC);
    const T3: OffsetDateTime = datetime!(2024-01-01 00:45:00 UTC);

    fn detail_type(code: &str, interval: bool, meter: bool, summary: bool) -> DetailType {
        DetailType {
            code: code.to_string(),
            power_region_id: ERCOT,
            interval,
            meter,
            summary,
            name: code.to_string(),
        }
    }

    pub(crate) fn ercot_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_power_region(PowerRegion {
            id: ERCOT,
            name: "ERCOT".to_string(),
        });
        store.insert_tdsp(Tdsp {
            id: ONCOR,
            name: "ONCOR".to_string(),
            code: "ONCOR".to_string(),
            legal_id: "1039940674000".to_string(),
        });
        store.insert_premise(Premise {
            id: PREMISE,
            code: "10443720000000001".to_string(),
            name: "Main St".to_string(),
            power_region_id: ERCOT,
        });
        store.insert_purpose(
            ERCOT,
            "00",
            Purpose {
                code: "00".to_string(),
                name: "Original".to_string(),
                is_cancel: false,
            },
        );
        store.insert_purpose(
            ERCOT,
            "01",
            Purpose {
                code: "01".to_string(),
                name: "Cancellation".to_string(),
                is_cancel: true,
            },
        );
        store.insert_transaction_type(
            ERCOT,
            "C1",
            TransactionType {
                code: "867_03".to_string(),
                name: "Monthly Usage".to_string(),
            },
        );
        store.insert_transaction_sub_type(
            ERCOT,
            "C1",
            TransactionSubType {
                code: "IDR".to_string(),
                transaction_type_code: "867_03".to_string(),
                name: "Interval Data".to_string(),
            },
        );
        store.insert_detail_type(detail_type("PM", true, true, false));
        store.insert_detail_type(detail_type("PL", false, true, false));
        store.insert_detail_type(detail_type("BO", true, false, true));
        store.insert_detail_type(detail_type("BD", false, false, false));
        store.insert_meter("M1", METER_1);
        store
    }

    fn record(
        transfer_type: &str,
        meter: &str,
        channel: Option<&str>,
        readings: &[(f64, OffsetDateTime)],
    ) -> EdiProductTransferDetail {
        EdiProductTransferDetail {
            transfer_type: transfer_type.to_string(),
            service_period_start: Some(datetime!(2024-01-01 00:00:00 UTC)),
            service_period_end: Some(datetime!(2024-02-01 00:00:00 UTC)),
            channel: channel.map(str::to_string),
            meter_name: Some(meter.to_string()),
            quantities: readings
                .iter()
                .map(|&(quantity, interval_end)| EdiQuantity { quantity, interval_end })
                .collect(),
            ..Default::default()
        }
    }

    fn transaction(details: Vec<EdiProductTransferDetail>) -> EdiUsageTransaction {
        EdiUsageTransaction {
            transaction_id: "TX-1".to_string(),
            purpose: "00".to_string(),
            date: Some(datetime!(2024-02-03 00:00:00 UTC)),
            premise_code: "10443720000000001".to_string(),
            power_region: "ERCOT".to_string(),
            report_type: "C1".to_string(),
            final_marker: None,
            tdsp_name: "ONCOR".to_string(),
            tdsp_legal_id: "1039940674000".to_string(),
            cr_name: "Retail Co".to_string(),
            cr_legal_id: "123456789".to_string(),
            product_transfer_details: Some(details),
        }
    }

    pub(crate) fn interval_transaction() -> EdiUsageTransaction {
        transaction(vec![
            record("PM", "M1", Some("1"), &[(10.0, T1), (5.0, T2)]),
            record("PM", "M1", Some("4"), &[(0.0, T1), (3.0, T3)]),
        ])
    }

    fn ingestor(store: &Arc<MemoryStore>, policy: UnresolvedMeterPolicy) -> Ingestor {
        Ingestor::new(store.clone(), store.clone(), store.clone(), policy)
    }

    async fn ingest(
        store: &Arc<MemoryStore>,
        tx: EdiUsageTransaction,
    ) -> Result<IngestOutcome, IngestError> {
        ingestor(store, UnresolvedMeterPolicy::default())
            .ingest(Envelope::new(tx))
            .await
    }

    #[tokio::test]
    async fn interval_group_persists_one_row_per_timestamp() {
        let store = Arc::new(ercot_store());

        let outcome = ingest(&store, interval_transaction()).await.unwrap();

        assert_eq!(outcome.detail_rows, 3);
        assert_eq!(outcome.unhandled_groups().count(), 0);
        assert_eq!(outcome.header.transaction_type, "867_03");
        assert_eq!(outcome.header.transaction_sub_type, "IDR");
        assert_eq!(store.transaction_count(), 1);

        let mut rows: Vec<_> = store
            .details()
            .into_iter()
            .map(|d| (d.interval_end.unwrap(), d.consumption, d.production, d.meter))
            .collect();
        rows.sort_by_key(|r| r.0);
        let resolved = MeterRef::Resolved(METER_1);
        assert_eq!(
            rows,
            vec![
                (T1, Some(10.0), Some(0.0), resolved),
                (T2, Some(5.0), Some(0.0), resolved),
                (T3, Some(0.0), Some(3.0), resolved),
            ]
        );
    }

    #[tokio::test]
    async fn header_and_rows_link_resolved_references() {
        let store = Arc::new(ercot_store());
        let tx = EdiUsageTransaction {
            final_marker: Some("F".to_string()),
            ..interval_transaction()
        };

        let outcome = ingest(&store, tx).await.unwrap();
        let header = &outcome.header;

        assert_eq!(header.transaction_id, "TX-1");
        assert_eq!(header.power_region_id, ERCOT);
        assert_eq!(header.tdsp_id, ONCOR);
        assert_eq!(header.premise_id, PREMISE);
        assert!(header.is_final);
        assert!(!header.is_canceled);

        let (stored, details) = store
            .transaction_with_details(header.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&stored, header);
        assert!(details
            .iter()
            .all(|d| d.usage_transaction_id == header.id && d.premise_id == PREMISE));
    }

    #[tokio::test]
    async fn cancel_purpose_marks_every_row_canceled() {
        let store = Arc::new(ercot_store());
        let mut tx = interval_transaction();
        tx.purpose = "01".to_string();
        tx.product_transfer_details
            .as_mut()
            .unwrap()
            .push(record("PL", "M1", None, &[(42.0, T1)]));

        let outcome = ingest(&store, tx).await.unwrap();

        assert!(outcome.header.is_canceled);
        assert_eq!(store.detail_count(), 4);
        assert!(store.details().iter().all(|d| d.is_canceled));
    }

    #[tokio::test]
    async fn non_interval_group_emits_one_row_per_reading() {
        let store = Arc::new(ercot_store());
        let tx = transaction(vec![
            record("PL", "M1", None, &[(7.0, T1), (8.0, T2)]),
            record("PL", "M1", None, &[(2.0, T3)]),
        ]);

        let outcome = ingest(&store, tx).await.unwrap();

        assert_eq!(outcome.detail_rows, 3);
        let details = store.details();
        let consumption: Vec<_> = details.iter().map(|d| d.consumption).collect();
        assert_eq!(consumption, vec![Some(7.0), Some(8.0), Some(2.0)]);
        assert!(details.iter().all(|d| d.production.is_none()));
    }

    #[tokio::test]
    async fn unknown_reference_code_leaves_no_trace() {
        let store = Arc::new(ercot_store());
        let tx = EdiUsageTransaction {
            premise_code: "missing".to_string(),
            ..interval_transaction()
        };

        let err = ingest(&store, tx).await.unwrap_err();

        assert!(matches!(err, IngestError::Resolution { entity: "premise", .. }));
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.detail_count(), 0);
    }

    #[tokio::test]
    async fn missing_sub_type_stores_nothing() {
        let store = Arc::new(ercot_store());
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

        let err = ingest(&store, tx).await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::Resolution { entity: "transaction sub-type", ref code } if code == "C2"
        ));
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.detail_count(), 0);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_before_resolution() {
        let store = Arc::new(ercot_store());
        let tx = EdiUsageTransaction {
            power_region: String::new(),
            ..interval_transaction()
        };

        let err = ingest(&store, tx).await.unwrap_err();

        assert!(matches!(err, IngestError::Validation(_)));
        assert_eq!(store.transaction_count(), 0);
    }

    #[tokio::test]
    async fn failed_detail_insert_rolls_back_everything() {
        let store = Arc::new(ercot_store());
        store.fail_detail_insert_at(1);

        let err = ingest(&store, interval_transaction()).await.unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.detail_count(), 0);
        assert!(store.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_transfer_type_is_dropped_and_reported() {
        let store = Arc::new(ercot_store());
        let mut tx = interval_transaction();
        tx.product_transfer_details
            .as_mut()
            .unwrap()
            .push(record("ZZ", "M1", None, &[(99.0, T1)]));

        let outcome = ingest(&store, tx).await.unwrap();

        assert_eq!(outcome.detail_rows, 3);
        let unhandled: Vec<_> = outcome.unhandled_groups().collect();
        assert_eq!(unhandled.len(), 1);
        assert_eq!(unhandled[0].transfer_type, "ZZ");
        assert_eq!(unhandled[0].disposition, GroupDisposition::UnknownDetailType);
    }

    #[tokio::test]
    async fn summary_and_unmetered_groups_produce_no_rows() {
        let store = Arc::new(ercot_store());
        let tx = transaction(vec![
            record("BO", "M1", Some("1"), &[(15.0, T1)]),
            record("BD", "LIGHTS", None, &[(3.0, T1)]),
        ]);

        let outcome = ingest(&store, tx).await.unwrap();

        assert_eq!(outcome.detail_rows, 0);
        assert_eq!(store.transaction_count(), 1);
        let reasons: Vec<_> = outcome
            .unhandled_groups()
            .map(|g| g.disposition.reason())
            .collect();
        assert_eq!(reasons, vec!["unmetered", "summary"]);
    }

    #[tokio::test]
    async fn unresolved_meter_is_persisted_as_unknown_by_default() {
        let store = Arc::new(ercot_store());
        let tx = transaction(vec![record("PL", "GHOST", None, &[(1.0, T1)])]);

        ingest(&store, tx).await.unwrap();

        let details = store.details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].meter, MeterRef::Unknown);
        assert_eq!(details[0].meter_name.as_deref(), Some("GHOST"));
    }

    #[tokio::test]
    async fn skip_policy_drops_rows_for_unresolved_meters() {
        let store = Arc::new(ercot_store());
        let tx = transaction(vec![
            record("PL", "GHOST", None, &[(1.0, T1), (2.0, T2)]),
            record("PL", "M1", None, &[(3.0, T1)]),
        ]);

        let outcome = ingestor(&store, UnresolvedMeterPolicy::SkipRows)
            .ingest(Envelope::new(tx))
            .await
            .unwrap();

        assert_eq!(outcome.detail_rows, 1);
        assert_eq!(store.details()[0].meter, MeterRef::Resolved(METER_1));
        let skipped: Vec<_> = outcome.unhandled_groups().collect();
        assert_eq!(
            skipped[0].disposition,
            GroupDisposition::UnresolvedMeterSkipped { rows: 2 }
        );
    }

    #[tokio::test]
    async fn reject_policy_fails_the_transaction() {
        let store = Arc::new(ercot_store());
        let tx = transaction(vec![
            record("PL", "GHOST", None, &[(1.0, T1)]),
            record("PM", "GHOST", Some("1"), &[(1.0, T1)]),
            record("PL", "M1", None, &[(3.0, T1)]),
        ]);

        let err = ingestor(&store, UnresolvedMeterPolicy::Reject)
            .ingest(Envelope::new(tx))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::UnresolvedMeter(ref names) if names == &["GHOST".to_string()]));
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.detail_count(), 0);
    }

    #[test]
    fn group_report_serializes_flat() {
        let report = GroupReport {
            meter_name: Some("M1".to_string()),
            transfer_type: "PL".to_string(),
            disposition: GroupDisposition::UnresolvedMeterSkipped { rows: 2 },
            ignored_records: 0,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "meter_name": "M1",
                "transfer_type": "PL",
                "disposition": "unresolved_meter_skipped",
                "rows": 2,
                "ignored_records": 0
            })
        );
    }
}
