use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PowerRegion {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Tdsp {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub legal_id: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Premise {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub power_region_id: Uuid,
}

/// Transaction-set purpose. `is_cancel` marks every row of the transaction canceled.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Purpose {
    pub code: String,
    pub name: String,
    pub is_cancel: bool,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransactionType {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransactionSubType {
    pub code: String,
    pub transaction_type_code: String,
    pub name: String,
}

/// Product-transfer-detail type as configured for one power region.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DetailType {
    pub code: String,
    pub power_region_id: Uuid,
    pub interval: bool,
    pub meter: bool,
    pub summary: bool,
    pub name: String,
}

impl DetailType {
    pub fn kind(&self) -> DetailKind {
        DetailKind::from_flags(self.interval, self.meter, self.summary)
    }
}

/// How the detail records of a product-transfer-detail type are reported.
///
/// Derived once from the `{interval, meter, summary}` flags stored with the
/// reference data; every flag combination maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DetailKind {
    /// Per-meter readings tagged with interval-end timestamps.
    IntervalMeter,
    /// Per-meter readings covering the whole service period.
    NonIntervalMeter,
    /// Totals across intervals or meters.
    Summary,
    /// Unmetered services.
    Unmetered,
}

impl DetailKind {
    pub fn from_flags(interval: bool, meter: bool, summary: bool) -> Self {
        match (interval, meter, summary) {
            (_, _, true) => Self::Summary,
            (true, true, false) => Self::IntervalMeter,
            (false, true, false) => Self::NonIntervalMeter,
            (_, false, false) => Self::Unmetered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_flag_wins_over_everything_else() {
        assert_eq!(DetailKind::from_flags(true, true, true), DetailKind::Summary);
        assert_eq!(DetailKind::from_flags(false, false, true), DetailKind::Summary);
    }

    #[test]
    fn meter_level_flags_split_on_interval() {
        assert_eq!(DetailKind::from_flags(true, true, false), DetailKind::IntervalMeter);
        assert_eq!(DetailKind::from_flags(false, true, false), DetailKind::NonIntervalMeter);
    }

    #[test]
    fn non_meter_non_summary_is_unmetered() {
        assert_eq!(DetailKind::from_flags(false, false, false), DetailKind::Unmetered);
        assert_eq!(DetailKind::from_flags(true, false, false), DetailKind::Unmetered);
    }

    #[test]
    fn detail_type_kind_reads_its_flags() {
        let pm = DetailType {
            code: "PM".to_string(),
            power_region_id: Uuid::nil(),
            interval: true,
            meter: true,
            summary: false,
            name: "Interval Detail".to_string(),
        };
        assert_eq!(pm.kind(), DetailKind::IntervalMeter);
    }
}
