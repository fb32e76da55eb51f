use std::collections::{BTreeMap, HashMap, HashSet};

use usage_ledger::{DetailKind, DetailType};

use crate::edi::EdiProductTransferDetail;

/// Details reported for the same meter under the same transfer type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub meter_name: Option<String>,
    pub transfer_type: String,
}

#[derive(Debug, Clone)]
pub struct DetailGroup<'a> {
    /// Raw details in payload order.
    pub details: Vec<&'a EdiProductTransferDetail>,
    /// `None` when the transfer type is not configured for the power region.
    pub detail_type: Option<DetailType>,
}

impl DetailGroup<'_> {
    pub fn kind(&self) -> Option<DetailKind> {
        self.detail_type.as_ref().map(DetailType::kind)
    }
}

/// Partition details by (meter name, transfer type) and attach each group's detail type.
pub fn group_details<'a>(
    details: &'a [EdiProductTransferDetail],
    detail_types: &HashMap<String, DetailType>,
) -> BTreeMap<GroupKey, DetailGroup<'a>> {
    let mut groups: BTreeMap<GroupKey, DetailGroup<'a>> = BTreeMap::new();

    for detail in details {
        let key = GroupKey {
            meter_name: detail.meter_name.clone(),
            transfer_type: detail.transfer_type.clone(),
        };
        groups
            .entry(key)
            .or_insert_with(|| DetailGroup {
                details: Vec::new(),
                detail_type: detail_types.get(&detail.transfer_type).cloned(),
            })
            .details
            .push(detail);
    }

    groups
}

/// Distinct meter names in first-seen order.
pub fn unique_meter_names(details: &[EdiProductTransferDetail]) -> Vec<String> {
    let mut seen = HashSet::new();
    details
        .iter()
        .filter_map(|d| d.meter_name.as_deref())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn detail(meter: Option<&str>, transfer_type: &str, channel: Option<&str>) -> EdiProductTransferDetail {
        EdiProductTransferDetail {
            transfer_type: transfer_type.to_string(),
            meter_name: meter.map(str::to_string),
            channel: channel.map(str::to_string),
            ..Default::default()
        }
    }

    fn detail_type(code: &str, interval: bool, meter: bool, summary: bool) -> DetailType {
        DetailType {
            code: code.to_string(),
            power_region_id: Uuid::nil(),
            interval,
            meter,
            summary,
            name: code.to_string(),
        }
    }

    fn key(meter: Option<&str>, transfer_type: &str) -> GroupKey {
        GroupKey {
            meter_name: meter.map(str::to_string),
            transfer_type: transfer_type.to_string(),
        }
    }

    #[test]
    fn groups_by_meter_and_transfer_type() {
        let details = vec![
            detail(Some("M1"), "PM", Some("1")),
            detail(Some("M1"), "PL", None),
            detail(Some("M1"), "PM", Some("4")),
            detail(Some("M2"), "PM", Some("1")),
        ];
        let types = HashMap::from([
            ("PM".to_string(), detail_type("PM", true, true, false)),
            ("PL".to_string(), detail_type("PL", false, true, false)),
        ]);

        let groups = group_details(&details, &types);

        assert_eq!(groups.len(), 3);
        let m1_pm = &groups[&key(Some("M1"), "PM")];
        assert_eq!(m1_pm.details.len(), 2);
        assert_eq!(m1_pm.details[0].channel.as_deref(), Some("1"));
        assert_eq!(m1_pm.details[1].channel.as_deref(), Some("4"));
        assert_eq!(m1_pm.kind(), Some(DetailKind::IntervalMeter));
        assert_eq!(groups[&key(Some("M1"), "PL")].kind(), Some(DetailKind::NonIntervalMeter));
        assert_eq!(groups[&key(Some("M2"), "PM")].details.len(), 1);
    }

    #[test]
    fn unknown_transfer_type_leaves_group_unclassified() {
        let details = vec![detail(Some("M1"), "ZZ", None)];
        let groups = group_details(&details, &HashMap::new());

        assert!(groups[&key(Some("M1"), "ZZ")].kind().is_none());
    }

    #[test]
    fn details_without_meter_name_share_a_group() {
        let details = vec![detail(None, "BD", None), detail(None, "BD", None)];
        let types = HashMap::from([("BD".to_string(), detail_type("BD", false, false, false))]);

        let groups = group_details(&details, &types);

        assert_eq!(groups.len(), 1);
        let unmetered = &groups[&key(None, "BD")];
        assert_eq!(unmetered.details.len(), 2);
        assert_eq!(unmetered.kind(), Some(DetailKind::Unmetered));
    }

    #[test]
    fn meter_names_are_deduplicated_in_order() {
        let details = vec![
            detail(Some("M2"), "PM", None),
            detail(None, "BD", None),
            detail(Some("M1"), "PM", None),
            detail(Some("M2"), "PL", None),
        ];

        assert_eq!(unique_meter_names(&details), vec!["M2".to_string(), "M1".to_string()]);
    }
}
