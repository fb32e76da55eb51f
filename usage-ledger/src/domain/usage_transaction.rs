use time::OffsetDateTime;
use uuid::Uuid;

/// Normalized header of one ingested usage transaction.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UsageTransaction {
    pub id: Uuid,
    pub transaction_id: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub transaction_date: OffsetDateTime,
    pub power_region_id: Uuid,
    pub tdsp_id: Uuid,
    pub premise_id: Uuid,
    pub purpose: String,
    pub is_final: bool,
    pub is_canceled: bool,
    pub transaction_type: String,
    pub transaction_sub_type: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created: OffsetDateTime,
}

/// Meter a detail row was reported against.
///
/// `Unknown` rows carry only the reported meter name; the `meter_id` column is NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterRef {
    Resolved(Uuid),
    Unknown,
}

impl MeterRef {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Resolved(id) => Some(*id),
            Self::Unknown => None,
        }
    }
}

impl From<Option<Uuid>> for MeterRef {
    fn from(id: Option<Uuid>) -> Self {
        id.map_or(Self::Unknown, Self::Resolved)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MeterRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(id) => serializer.serialize_some(id),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}

/// One normalized, time-bucketed usage row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UsageTransactionDetail {
    pub usage_transaction_id: Uuid,
    #[sqlx(rename = "meter_id", try_from = "Option<Uuid>")]
    #[cfg_attr(feature = "serde", serde(rename = "meter_id"))]
    pub meter: MeterRef,
    pub meter_name: Option<String>,
    pub power_region_id: Uuid,
    pub premise_id: Uuid,
    pub is_canceled: bool,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub service_period_start: Option<OffsetDateTime>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub service_period_end: Option<OffsetDateTime>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub interval_start: Option<OffsetDateTime>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub interval_end: Option<OffsetDateTime>,
    pub consumption: Option<f64>,
    pub production: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_ref_maps_null_to_unknown() {
        let id = Uuid::new_v4();
        assert_eq!(MeterRef::from(Some(id)), MeterRef::Resolved(id));
        assert_eq!(MeterRef::from(None), MeterRef::Unknown);
        assert_eq!(MeterRef::Resolved(id).id(), Some(id));
        assert_eq!(MeterRef::Unknown.id(), None);
    }
}
