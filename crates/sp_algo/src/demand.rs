//! Demand model: recommended allocation fraction and seat demand per unit.
//!
//! Two interchangeable modes, selected by `PlanRules::mode`:
//! - Flat: per-unit override or global default, projected over the horizon.
//! - Attendance-derived: median/peak/RTO formula with a stability discount
//!   on the peak buffer.
//!
//! Every derivation emits an ordered explanation trail, one entry per
//! algebraic step; the numbers it reports must match the computation exactly.
//! Zero-headcount units short-circuit: fraction 0, demand 0, a single note.

use sp_core::rounding::{clamp_fraction, round_seats};
use sp_core::rules::{AllocationMode, PlanRules, FALLBACK_RTO_DAYS, WORKING_DAYS_PER_WEEK};
use sp_core::{AllocationRecommendation, AttendanceProfile, Unit};

use std::collections::BTreeMap;

// ----------------------------- Formatting helpers -----------------------------

fn pct0(x: f64) -> String {
    format!("{:.0}%", x * 100.0)
}

fn pct1(x: f64) -> String {
    format!("{:.1}%", x * 100.0)
}

fn pct1_signed(x: f64) -> String {
    format!("{:+.1}%", x * 100.0)
}

fn zero_headcount(unit: &Unit) -> AllocationRecommendation {
    AllocationRecommendation::pending(
        unit.unit_name.clone(),
        0.0,
        0,
        vec!["Unit has 0 headcount - no allocation needed.".to_string()],
    )
}

/// Default profile for a unit without attendance data: everyone counted as
/// present at median and peak, attending the fallback RTO days.
pub fn default_profile(unit: &Unit) -> AttendanceProfile {
    AttendanceProfile {
        unit_name: unit.unit_name.clone(),
        monthly_median_hc: unit.current_total_hc as f64,
        monthly_max_hc: unit.current_total_hc as f64,
        avg_rto_days_per_week: FALLBACK_RTO_DAYS,
        attendance_stability: None,
    }
}

// ----------------------------- Flat mode -----------------------------

/// Flat mode: `base × (1 + net_change × horizon/12)`, clamped, times headcount.
pub fn flat_demand(
    unit: &Unit,
    horizon_months: u32,
    rules: &PlanRules,
) -> AllocationRecommendation {
    let hc = unit.current_total_hc;
    if hc == 0 {
        return zero_headcount(unit);
    }

    let base_alloc = unit.seat_alloc_pct.unwrap_or(rules.global_alloc_pct);
    let is_override = unit.seat_alloc_pct.is_some();

    let net_change = unit.net_hc_change_pct();
    let horizon_factor = 1.0 + net_change * (horizon_months as f64 / 12.0);
    let adjusted_alloc = base_alloc * horizon_factor;

    let was_clamped = adjusted_alloc < rules.min_alloc_pct || adjusted_alloc > rules.max_alloc_pct;
    let recommended = clamp_fraction(adjusted_alloc, rules.min_alloc_pct, rules.max_alloc_pct);
    let effective_demand = round_seats(recommended * hc as f64);

    let mut steps = Vec::with_capacity(5);
    if is_override {
        steps.push(format!(
            "Step 1 - Allocation %: Unit override = {} (global default is {})",
            pct0(base_alloc),
            pct0(rules.global_alloc_pct),
        ));
    } else {
        steps.push(format!("Step 1 - Allocation %: Global default = {}", pct0(base_alloc)));
    }
    steps.push(format!(
        "Step 2 - Growth/Attrition: Growth {}, Attrition {} => net {} over {}mo => factor {:.3}",
        pct1_signed(unit.hc_growth_pct),
        pct1_signed(unit.attrition_pct),
        pct1_signed(net_change),
        horizon_months,
        horizon_factor,
    ));
    steps.push(format!(
        "Step 3 - Adjusted allocation: {} x {:.3} = {}",
        pct0(base_alloc),
        horizon_factor,
        pct1(adjusted_alloc),
    ));
    if was_clamped {
        steps.push(format!("Note: Allocation clamped to policy bounds => {}", pct1(recommended)));
    }
    steps.push(format!(
        "Step 4 - Effective demand: {} x {} HC = {} seats needed",
        pct1(recommended),
        hc,
        effective_demand,
    ));

    AllocationRecommendation::pending(unit.unit_name.clone(), recommended, effective_demand, steps)
}

// ----------------------------- Attendance-derived mode -----------------------------

/// Attendance mode: base ratio from median attendance, peak buffer (with
/// stability discount), RTO scaling, growth projection, then clamp.
pub fn attendance_demand(
    unit: &Unit,
    attendance: &AttendanceProfile,
    horizon_months: u32,
    rules: &PlanRules,
) -> AllocationRecommendation {
    let hc = unit.current_total_hc;
    if hc == 0 {
        return zero_headcount(unit);
    }
    let hc_f = hc as f64;

    // Base demand ratio from the median in-office strength.
    let base_ratio = attendance.monthly_median_hc / hc_f;

    // Peak buffer, discounted for units with predictable attendance.
    let mut peak_buffer = (attendance.monthly_max_hc - attendance.monthly_median_hc) / hc_f
        * rules.peak_buffer_multiplier;
    let stability_discounted = matches!(
        attendance.attendance_stability,
        Some(s) if s > rules.stability_discount_threshold
    );
    if stability_discounted {
        peak_buffer *= 1.0 - rules.stability_discount_factor;
    }

    // RTO scaling applies to the base, not the peak buffer.
    let rto_factor = attendance.avg_rto_days_per_week / WORKING_DAYS_PER_WEEK;
    let scaled_ratio = base_ratio * rto_factor;

    let net_change = unit.net_hc_change_pct();
    let horizon_factor = 1.0 + net_change * (horizon_months as f64 / 12.0);
    let growth_adjusted = scaled_ratio * horizon_factor;

    let raw_alloc = growth_adjusted + peak_buffer;
    let was_clamped = raw_alloc < rules.min_alloc_pct || raw_alloc > rules.max_alloc_pct;
    let recommended = clamp_fraction(raw_alloc, rules.min_alloc_pct, rules.max_alloc_pct);
    let effective_demand = round_seats(recommended * hc_f);

    let mut steps = Vec::with_capacity(7);
    steps.push(format!(
        "Step 1 - Base demand: Median in-office strength is {:.0} out of {} HC => base ratio {}",
        attendance.monthly_median_hc,
        hc,
        pct1(base_ratio),
    ));
    if stability_discounted {
        steps.push(format!(
            "Step 2 - Peak buffer: Peak HC ({:.0}) adds {} buffer (stability discount applied)",
            attendance.monthly_max_hc,
            pct1(peak_buffer),
        ));
    } else {
        steps.push(format!(
            "Step 2 - Peak buffer: Peak HC ({:.0}) adds {} buffer",
            attendance.monthly_max_hc,
            pct1(peak_buffer),
        ));
    }
    steps.push(format!(
        "Step 3 - RTO scaling: {} days/week => scaling factor {:.2}, scaled ratio {}",
        attendance.avg_rto_days_per_week,
        rto_factor,
        pct1(scaled_ratio),
    ));
    steps.push(format!(
        "Step 4 - Growth/Attrition: Growth {}, Attrition {} => net {} over {}mo => factor {:.3}",
        pct1_signed(unit.hc_growth_pct),
        pct1_signed(unit.attrition_pct),
        pct1_signed(net_change),
        horizon_months,
        horizon_factor,
    ));
    steps.push(format!(
        "Step 5 - Final: {} (growth-adjusted) + {} (buffer) = {} recommended allocation",
        pct1(growth_adjusted),
        pct1(peak_buffer),
        pct1(recommended),
    ));
    if was_clamped {
        steps.push(format!("Note: Allocation was clamped to policy bounds => final {}", pct1(recommended)));
    }
    steps.push(format!(
        "Step 6 - Effective demand: {} x {} HC = {} seats needed",
        pct1(recommended),
        hc,
        effective_demand,
    ));

    AllocationRecommendation::pending(unit.unit_name.clone(), recommended, effective_demand, steps)
}

// ----------------------------- Mode routing -----------------------------

/// Compute recommendations for all units, in input order, routing by the
/// configured mode. Units without an attendance profile get a defaulted one
/// in attendance mode.
pub fn compute_all_demands(
    units: &[Unit],
    attendance_map: &BTreeMap<String, AttendanceProfile>,
    horizon_months: u32,
    rules: &PlanRules,
) -> Vec<AllocationRecommendation> {
    units
        .iter()
        .map(|unit| match rules.mode {
            AllocationMode::Simple => flat_demand(unit, horizon_months, rules),
            AllocationMode::Advanced => match attendance_map.get(&unit.unit_name) {
                Some(att) => attendance_demand(unit, att, horizon_months, rules),
                None => attendance_demand(unit, &default_profile(unit), horizon_months, rules),
            },
        })
        .collect()
}

/* ---------------------------------- Tests --------------------------------- */
