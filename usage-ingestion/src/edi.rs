//! Inbound ERCOT monthly/historic usage transaction, as posted by market participants.
//!
//! Required fields are deserialized leniently (missing strings become empty,
//! missing collections become `None`) so that [`crate::validate`] can report
//! every missing field at once instead of failing on the first one.

use serde::Deserialize;
use time::OffsetDateTime;

/// Channel carrying consumption readings on an interval meter.
pub const CONSUMPTION_CHANNEL: &str = "1";
/// Channel carrying generation readings on an interval meter.
pub const GENERATION_CHANNEL: &str = "4";
/// `action_code` value marking a final transaction.
pub const FINAL_ACTION_CODE: &str = "F";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdiUsageTransaction {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default, rename = "transaction_set_purpose_code")]
    pub purpose: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    #[serde(default)]
    pub premise_code: String,
    #[serde(default)]
    pub power_region: String,
    #[serde(default, rename = "report_type_code")]
    pub report_type: String,
    #[serde(default, rename = "action_code")]
    pub final_marker: Option<String>,
    #[serde(default)]
    pub tdsp_name: String,
    #[serde(default)]
    pub tdsp_legal_id: String,
    #[serde(default)]
    pub cr_name: String,
    #[serde(default)]
    pub cr_legal_id: String,
    #[serde(default)]
    pub product_transfer_details: Option<Vec<EdiProductTransferDetail>>,
}

impl EdiUsageTransaction {
    pub fn is_final(&self) -> bool {
        self.final_marker.as_deref() == Some(FINAL_ACTION_CODE)
    }

    pub fn details(&self) -> &[EdiProductTransferDetail] {
        self.product_transfer_details.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdiProductTransferDetail {
    #[serde(default, rename = "product_transfer_detail_type_code")]
    pub transfer_type: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub service_period_start: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub service_period_end: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub exchange_date: Option<OffsetDateTime>,
    pub meter_role: Option<String>,
    pub meter_type: Option<String>,
    pub channel: Option<String>,
    pub meter_name: Option<String>,
    #[serde(default, rename = "quantity_delivered")]
    pub quantities: Vec<EdiQuantity>,
}

impl EdiProductTransferDetail {
    pub fn service_period(&self) -> ServicePeriod {
        ServicePeriod {
            start: self.service_period_start,
            end: self.service_period_end,
        }
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channel.as_deref() == Some(channel)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdiQuantity {
    pub quantity: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub interval_end: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServicePeriod {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}
