// src/pipeline/filter.rs

//! Eligibility rules for submitting a shipment.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::models::{RunPolicy, Shipment, ShipmentStatus, UnmappedCarrierPolicy};

/// Why a shipment was not submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Delivered,
    Stale,
    Duplicate,
    UnmappedCarrier,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Delivered => "delivered",
            SkipReason::Stale => "stale",
            SkipReason::Duplicate => "duplicate",
            SkipReason::UnmappedCarrier => "unmapped_carrier",
        })
    }
}

/// Filter verdict for one shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Submit,
    Skip(SkipReason),
}

/// Classify a shipment. The first matching rule wins:
/// delivered, then stale, then duplicate, then unmapped carrier.
pub fn classify(
    shipment: &Shipment,
    policy: &RunPolicy,
    now: DateTime<Utc>,
    already_seen: bool,
) -> Decision {
    if shipment.status == ShipmentStatus::Delivered {
        return Decision::Skip(SkipReason::Delivered);
    }
    if is_stale(shipment.event_date, policy.max_shipment_age_days, now) {
        return Decision::Skip(SkipReason::Stale);
    }
    if already_seen {
        return Decision::Skip(SkipReason::Duplicate);
    }
    if !shipment.carrier.is_mapped() && policy.unmapped_carrier == UnmappedCarrierPolicy::Skip {
        return Decision::Skip(SkipReason::UnmappedCarrier);
    }
    Decision::Submit
}

/// Strictly older than the cutoff. Undated shipments are never stale, and
/// neither is anything when the cutoff falls outside the representable range.
pub fn is_stale(event_date: Option<DateTime<Utc>>, max_age_days: u32, now: DateTime<Utc>) -> bool {
    let cutoff = Duration::try_days(i64::from(max_age_days))
        .and_then(|age| now.checked_sub_signed(age));
    match (event_date, cutoff) {
        (Some(date), Some(cutoff)) => date < cutoff,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarrierId, NormalizedCarrier};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn shipment(status: ShipmentStatus, age_days: Option<i64>) -> Shipment {
        Shipment {
            tracking_number: "9400111".to_string(),
            carrier_raw: "USPS".to_string(),
            carrier: NormalizedCarrier::Mapped(CarrierId::Usps),
            status,
            event_date: age_days.map(|d| now() - Duration::days(d)),
            order_id: "01".to_string(),
            description: "eBay Item".to_string(),
        }
    }

    #[test]
    fn test_eligible() {
        let s = shipment(ShipmentStatus::InTransit, Some(3));
        assert_eq!(
            classify(&s, &RunPolicy::default(), now(), false),
            Decision::Submit
        );
    }

    #[test]
    fn test_precedence() {
        let policy = RunPolicy::default();

        let delivered_old = shipment(ShipmentStatus::Delivered, Some(400));
        assert_eq!(
            classify(&delivered_old, &policy, now(), true),
            Decision::Skip(SkipReason::Delivered)
        );

        let stale_known = shipment(ShipmentStatus::InTransit, Some(400));
        assert_eq!(
            classify(&stale_known, &policy, now(), true),
            Decision::Skip(SkipReason::Stale)
        );

        let mut unmapped_known = shipment(ShipmentStatus::Unknown, Some(1));
        unmapped_known.carrier = NormalizedCarrier::Unmapped;
        let skip_policy = RunPolicy {
            unmapped_carrier: UnmappedCarrierPolicy::Skip,
            ..RunPolicy::default()
        };
        assert_eq!(
            classify(&unmapped_known, &skip_policy, now(), true),
            Decision::Skip(SkipReason::Duplicate)
        );
        assert_eq!(
            classify(&unmapped_known, &skip_policy, now(), false),
            Decision::Skip(SkipReason::UnmappedCarrier)
        );
        assert_eq!(
            classify(&unmapped_known, &policy, now(), false),
            Decision::Submit
        );
    }

    #[test]
    fn test_stale_boundary() {
        let policy = RunPolicy::default();
        let exactly = shipment(ShipmentStatus::InTransit, Some(45));
        assert_eq!(classify(&exactly, &policy, now(), false), Decision::Submit);

        let mut just_over = exactly.clone();
        just_over.event_date = just_over.event_date.map(|d| d - Duration::seconds(1));
        assert_eq!(
            classify(&just_over, &policy, now(), false),
            Decision::Skip(SkipReason::Stale)
        );
    }

    #[test]
    fn test_huge_age_does_not_overflow() {
        let ancient = Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap();
        assert!(!is_stale(Some(now()), 1_000_000_000, now()));
        assert!(!is_stale(Some(ancient), u32::MAX, now()));
    }

    #[test]
    fn test_undated_is_never_stale() {
        assert!(!is_stale(None, 0, now()));
        let s = shipment(ShipmentStatus::Unknown, None);
        assert_eq!(
            classify(&s, &RunPolicy::default(), now(), false),
            Decision::Submit
        );
    }
}
