//! RTO utilization and compliance reporting over a run's results.
//!
//! Pass scenario-modified attendance (with any RTO mandate applied) for
//! accurate expectations. Both reports are read-only views computed from a
//! run's recommendations; they belong to the engine because their numbers
//! feed the same planning decisions, even though rendering lives elsewhere.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sp_core::rounding::round_seats;
use sp_core::rules::{PlanRules, FALLBACK_RTO_DAYS, WORKING_DAYS_PER_WEEK};
use sp_core::{AllocationRecommendation, AttendanceProfile, Unit};

/// How a unit's allocation compares to its attendance-implied need.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RtoAlertStatus {
    /// Allocated more than 10% below expectation.
    UnderAllocated,
    /// Allocated above expectation by more than the configured threshold.
    UnderUtilized,
    Aligned,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RtoAlert {
    pub unit_name: String,
    pub expected_seats: u32,
    pub allocated_seats: u32,
    /// (allocated − expected) / expected.
    pub gap_pct: f64,
    pub status: RtoAlertStatus,
}

/// Per-unit utilization alerts, in recommendation order.
///
/// Expected seats come from attendance (median plus peak buffer, scaled by
/// RTO ratio) or, without a profile, the fallback RTO applied to headcount.
/// Zero-headcount and zero-expectation units are skipped.
pub fn rto_alerts(
    recs: &[AllocationRecommendation],
    units: &[Unit],
    attendance: &BTreeMap<String, AttendanceProfile>,
    rules: &PlanRules,
) -> Vec<RtoAlert> {
    let unit_map: BTreeMap<&str, &Unit> =
        units.iter().map(|u| (u.unit_name.as_str(), u)).collect();

    let mut alerts = Vec::new();
    for rec in recs {
        let Some(unit) = unit_map.get(rec.unit_name.as_str()) else { continue };
        if unit.current_total_hc == 0 {
            continue;
        }

        let expected_seats = match attendance.get(&rec.unit_name) {
            Some(att) => {
                let peak_buffer =
                    (att.monthly_max_hc - att.monthly_median_hc) * rules.peak_buffer_multiplier;
                let rto_factor = att.avg_rto_days_per_week / WORKING_DAYS_PER_WEEK;
                round_seats((att.monthly_median_hc + peak_buffer) * rto_factor)
            }
            None => round_seats(
                FALLBACK_RTO_DAYS / WORKING_DAYS_PER_WEEK * unit.current_total_hc as f64,
            ),
        };
        if expected_seats == 0 {
            continue;
        }

        let allocated = rec.allocated_seats;
        let gap_pct = (allocated as f64 - expected_seats as f64) / expected_seats as f64;
        let status = if gap_pct < -0.10 {
            RtoAlertStatus::UnderAllocated
        } else if gap_pct > rules.rto_utilization_threshold {
            RtoAlertStatus::UnderUtilized
        } else {
            RtoAlertStatus::Aligned
        };

        alerts.push(RtoAlert {
            unit_name: rec.unit_name.clone(),
            expected_seats,
            allocated_seats: allocated,
            gap_pct,
            status,
        });
    }
    alerts
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RtoCompliance {
    pub unit_name: String,
    pub actual_rto: f64,
    pub target_rto: f64,
    pub gap_days: f64,
    pub compliant: bool,
}

/// Flag units whose average RTO days fall below a global target, sorted by
/// unit name.
pub fn rto_compliance(
    attendance: &BTreeMap<String, AttendanceProfile>,
    global_rto_target: f64,
) -> Vec<RtoCompliance> {
    attendance
        .iter()
        .map(|(unit_name, att)| {
            let gap = att.avg_rto_days_per_week - global_rto_target;
            RtoCompliance {
                unit_name: unit_name.clone(),
                actual_rto: att.avg_rto_days_per_week,
                target_rto: global_rto_target,
                gap_days: gap,
                compliant: gap >= 0.0,
            }
        })
        .collect()
}

/* ---------------------------------- Tests --------------------------------- */
