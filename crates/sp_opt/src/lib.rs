//! sp_opt — Constrained seat-placement optimizer.
//!
//! Formulates one weighted placement model per request (see `model`) and
//! returns a typed `OptimizationResult`. Lifecycle of a single call:
//!
//!   Formulated → Solved(optimal)
//!   Formulated → Solved(infeasible) → RelaxedGuarantee → Solved(optimal | infeasible, terminal)
//!
//! At most one relaxation pass is attempted, and only the minimum-guarantee
//! tier is ever dropped. An unsolvable model is reported as a status on the
//! result (with empty assignments and a diagnostic message), never as an
//! error; `OptError` covers malformed requests only.
//!
//! The demand basis per unit depends on the requested objective mode:
//! policy-derived demand (placement), attendance-derived demand at actual
//! RTO (RTO-based), or attendance-derived demand at an overridden target RTO
//! (what-if). RTO-mode results carry a savings summary against the
//! policy-derived baseline.

#![forbid(unsafe_code)]

mod model;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use sp_core::rounding::round_seats;
use sp_core::rules::{PlanRules, FALLBACK_RTO_DAYS, WORKING_DAYS_PER_WEEK};
use sp_core::{
    AdjacencyTier, AllocationRecommendation, AttendanceProfile, Floor, FloorAssignment, FloorId,
    Unit,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ----------------------------- Request surface -----------------------------

/// Which demand basis the solver places against.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectiveMode {
    /// Policy-derived demand from the allocation recommendations.
    OptimalPlacement,
    /// Attendance-derived demand at each unit's actual RTO days.
    RtoBased,
    /// Attendance-derived demand at an overridden target RTO.
    WhatIf { target_rto_days: f64 },
}

impl ObjectiveMode {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectiveMode::OptimalPlacement => "optimal_placement",
            ObjectiveMode::RtoBased => "rto_based",
            ObjectiveMode::WhatIf { .. } => "what_if",
        }
    }
}

/// One optimization request. Optional knobs default to "off".
#[derive(Clone, Debug)]
pub struct OptimizeRequest<'a> {
    pub recommendations: &'a [AllocationRecommendation],
    pub units: &'a [Unit],
    pub attendance: &'a BTreeMap<String, AttendanceProfile>,
    pub floors: &'a [Floor],
    /// Prior assignment used for adjacency weights and before/after deltas.
    pub baseline: &'a [FloorAssignment],
    pub objective: ObjectiveMode,
    pub excluded_floors: BTreeSet<FloorId>,
    pub max_floors_per_unit: Option<u32>,
    /// Unit name → towers it may occupy; absent units may occupy any tower.
    pub tower_pins: BTreeMap<String, BTreeSet<String>>,
    /// Soft floor: each unit receives at least this fraction of its demand.
    pub min_guarantee_fraction: Option<f64>,
    pub rules: &'a PlanRules,
}

impl<'a> OptimizeRequest<'a> {
    pub fn new(
        recommendations: &'a [AllocationRecommendation],
        units: &'a [Unit],
        attendance: &'a BTreeMap<String, AttendanceProfile>,
        floors: &'a [Floor],
        baseline: &'a [FloorAssignment],
        objective: ObjectiveMode,
        rules: &'a PlanRules,
    ) -> Self {
        Self {
            recommendations,
            units,
            attendance,
            floors,
            baseline,
            objective,
            excluded_floors: BTreeSet::new(),
            max_floors_per_unit: None,
            tower_pins: BTreeMap::new(),
            min_guarantee_fraction: None,
            rules,
        }
    }
}

/// Malformed-request errors. Solver outcomes are never errors.
#[derive(Debug, Error, PartialEq)]
pub enum OptError {
    #[error("target RTO days out of range (0–7): {0}")]
    TargetRtoOutOfRange(f64),
    #[error("minimum guarantee fraction out of range (0–1): {0}")]
    GuaranteeOutOfRange(f64),
    #[error("max floors per unit must be at least 1")]
    MaxFloorsZero,
}

// ----------------------------- Result surface -----------------------------

/// Terminal solver status for one optimization call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolveStatus {
    Optimal,
    /// Optimal after dropping the minimum-guarantee tier.
    OptimalRelaxed,
    Infeasible,
    /// The backend failed for a non-infeasibility reason.
    NotSolved,
}

impl SolveStatus {
    pub fn is_success(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::OptimalRelaxed)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => f.write_str("Optimal"),
            SolveStatus::OptimalRelaxed => f.write_str("Optimal (relaxed minimum guarantee)"),
            SolveStatus::Infeasible => f.write_str("Infeasible"),
            SolveStatus::NotSolved => f.write_str("Not Solved"),
        }
    }
}

/// Per-unit before/after comparison against the baseline assignment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitDelta {
    pub unit_name: String,
    pub before_seats: u32,
    pub after_seats: u32,
    pub seat_change: i64,
    pub before_floors: u32,
    pub after_floors: u32,
    pub floor_change: i64,
}

/// Seats and floors freed against the policy-derived baseline
/// (RTO-based and what-if objectives only).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SavingsSummary {
    pub policy_demand_seats: u64,
    pub optimized_seats: u64,
    pub seats_freed: i64,
    pub baseline_floors_used: u32,
    pub optimized_floors_used: u32,
    pub floors_freed: i64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationResult {
    pub status: SolveStatus,
    pub objective_value: f64,
    pub assignments: Vec<FloorAssignment>,
    /// Total seats per unit, in recommendation order for known units.
    pub unit_totals: BTreeMap<String, u32>,
    pub before_after: Vec<UnitDelta>,
    pub consolidation_notes: Vec<String>,
    pub message: String,
    pub savings: Option<SavingsSummary>,
}

impl OptimizationResult {
    fn failed(status: SolveStatus, message: String) -> Self {
        Self {
            status,
            objective_value: 0.0,
            assignments: Vec::new(),
            unit_totals: BTreeMap::new(),
            before_after: Vec::new(),
            consolidation_notes: Vec::new(),
            message,
            savings: None,
        }
    }
}

// ----------------------------- Demand bases -----------------------------

/// Attendance-derived expected seats:
/// `round((median + (max − median) × buffer) × rto / working_days)`,
/// falling back to `round(fallback_rto/working_days × hc)` without a profile.
fn rto_expected_seats(
    unit: Option<&Unit>,
    attendance: Option<&AttendanceProfile>,
    rto_override: Option<f64>,
    rules: &PlanRules,
) -> u32 {
    match attendance {
        Some(att) => {
            let rto = rto_override.unwrap_or(att.avg_rto_days_per_week);
            let peak_buffer =
                (att.monthly_max_hc - att.monthly_median_hc) * rules.peak_buffer_multiplier;
            round_seats((att.monthly_median_hc + peak_buffer) * rto / WORKING_DAYS_PER_WEEK)
        }
        None => {
            let rto = rto_override.unwrap_or(FALLBACK_RTO_DAYS);
            let hc = unit.map(|u| u.current_total_hc).unwrap_or(0);
            round_seats(rto / WORKING_DAYS_PER_WEEK * hc as f64)
        }
    }
}

fn demand_basis(
    objective: ObjectiveMode,
    rec: &AllocationRecommendation,
    unit: Option<&Unit>,
    attendance: Option<&AttendanceProfile>,
    rules: &PlanRules,
) -> u32 {
    match objective {
        ObjectiveMode::OptimalPlacement => rec.effective_demand_seats,
        ObjectiveMode::RtoBased => rto_expected_seats(unit, attendance, None, rules),
        ObjectiveMode::WhatIf { target_rto_days } => {
            rto_expected_seats(unit, attendance, Some(target_rto_days), rules)
        }
    }
}

// ----------------------------- Adjacency weights -----------------------------

/// Bonus per (unit, floor) pair, derived from where each unit already sits.
fn adjacency_weight(floor: &Floor, existing: &BTreeSet<(String, i32)>) -> f64 {
    if existing.contains(&(floor.tower_id.clone(), floor.floor_number)) {
        100.0
    } else if existing
        .iter()
        .any(|(t, n)| *t == floor.tower_id && (n - floor.floor_number).abs() == 1)
    {
        60.0
    } else if existing.iter().any(|(t, _)| *t == floor.tower_id) {
        30.0
    } else {
        0.0
    }
}

// ----------------------------- Entry point -----------------------------

/// Solve one placement request.
///
/// Request validation failures return `Err`; every solver outcome (optimal,
/// relaxed-optimal, infeasible) is an `Ok` result carrying its status.
pub fn optimize(req: &OptimizeRequest<'_>) -> Result<OptimizationResult, OptError> {
    if let ObjectiveMode::WhatIf { target_rto_days } = req.objective {
        if !(0.0..=7.0).contains(&target_rto_days) || !target_rto_days.is_finite() {
            return Err(OptError::TargetRtoOutOfRange(target_rto_days));
        }
    }
    if let Some(g) = req.min_guarantee_fraction {
        if !(0.0..=1.0).contains(&g) || !g.is_finite() {
            return Err(OptError::GuaranteeOutOfRange(g));
        }
    }
    if req.max_floors_per_unit == Some(0) {
        return Err(OptError::MaxFloorsZero);
    }

    // Available floors in canonical order.
    let mut floors: Vec<&Floor> = req
        .floors
        .iter()
        .filter(|f| !req.excluded_floors.contains(&f.floor_id()))
        .collect();
    floors.sort_by_key(|f| f.floor_id());

    let unit_map: BTreeMap<&str, &Unit> =
        req.units.iter().map(|u| (u.unit_name.as_str(), u)).collect();

    // Demand basis per recommendation, in recommendation order.
    let demands: Vec<u32> = req
        .recommendations
        .iter()
        .map(|rec| {
            demand_basis(
                req.objective,
                rec,
                unit_map.get(rec.unit_name.as_str()).copied(),
                req.attendance.get(&rec.unit_name),
                req.rules,
            )
        })
        .collect();

    // Where each unit already sits (for adjacency weights).
    let mut existing: BTreeMap<&str, BTreeSet<(String, i32)>> = BTreeMap::new();
    for a in req.baseline {
        existing
            .entry(a.unit_name.as_str())
            .or_default()
            .insert((a.floor.tower_id.clone(), a.floor.floor_number));
    }

    let allowed: Vec<Vec<bool>> = req
        .recommendations
        .iter()
        .map(|rec| {
            let pins = req.tower_pins.get(&rec.unit_name);
            floors
                .iter()
                .map(|f| pins.map_or(true, |towers| towers.contains(&f.tower_id)))
                .collect()
        })
        .collect();

    let adjacency: Vec<Vec<f64>> = req
        .recommendations
        .iter()
        .map(|rec| match existing.get(rec.unit_name.as_str()) {
            Some(set) => floors.iter().map(|f| adjacency_weight(f, set)).collect(),
            None => vec![0.0; floors.len()],
        })
        .collect();

    let guarantee_seats: Vec<u32> = match req.min_guarantee_fraction {
        Some(g) => demands.iter().map(|&d| round_seats(g * d as f64)).collect(),
        None => vec![0; demands.len()],
    };
    let has_guarantees = guarantee_seats.iter().any(|&g| g > 0);

    let problem = model::PlanProblem {
        demands: demands.clone(),
        caps: floors.iter().map(|f| f.total_seats).collect(),
        allowed,
        adjacency,
        max_floors_per_unit: req.max_floors_per_unit,
        guarantee_seats,
    };

    // Solve; one bounded relaxation pass dropping the guarantee tier.
    let mut status = SolveStatus::Optimal;
    let solved = match model::solve(&problem, true) {
        Ok(s) => s,
        Err(first_err) if has_guarantees => {
            warn!(error = %first_err, "solve failed; retrying without minimum guarantees");
            match model::solve(&problem, false) {
                Ok(s) => {
                    status = SolveStatus::OptimalRelaxed;
                    s
                }
                Err(err) => {
                    let status = terminal_status(&err);
                    info!(%status, "placement unsolvable after relaxation");
                    return Ok(OptimizationResult::failed(
                        status,
                        format!("Optimization could not find a solution. Status: {status}"),
                    ));
                }
            }
        }
        Err(err) => {
            let status = terminal_status(&err);
            info!(%status, "placement unsolvable");
            return Ok(OptimizationResult::failed(
                status,
                format!("Optimization could not find a solution. Status: {status}"),
            ));
        }
    };

    Ok(extract(req, &floors, &demands, solved, status))
}

fn terminal_status(err: &good_lp::ResolutionError) -> SolveStatus {
    match err {
        good_lp::ResolutionError::Infeasible => SolveStatus::Infeasible,
        _ => SolveStatus::NotSolved,
    }
}

// ----------------------------- Extraction -----------------------------

/// Round one unit's solved row onto the integer grid: integral parts first,
/// then the unit's remaining seats by largest fractional part (canonical
/// floor order on ties), never exceeding per-floor remaining capacity.
fn integerize_row(raw: &[f64], target: u32, floor_remaining: &mut [u32]) -> Vec<u32> {
    let mut seats: Vec<u32> = raw
        .iter()
        .enumerate()
        .map(|(f, &v)| (v.max(0.0).floor() as u32).min(floor_remaining[f]))
        .collect();
    let mut leftover = target.saturating_sub(seats.iter().sum());

    // Rank floors by fractional remainder descending, canonical index on ties.
    let mut ranking: Vec<(usize, f64)> = raw
        .iter()
        .enumerate()
        .map(|(f, &v)| (f, v.max(0.0) - v.max(0.0).floor()))
        .collect();
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    while leftover > 0 {
        let mut gave = false;
        for &(f, _) in &ranking {
            if leftover == 0 {
                break;
            }
            if seats[f] < floor_remaining[f] {
                seats[f] += 1;
                leftover -= 1;
                gave = true;
            }
        }
        if !gave {
            break; // no per-floor capacity left for this unit
        }
    }

    for (f, &s) in seats.iter().enumerate() {
        floor_remaining[f] -= s;
    }
    seats
}

/// Round solved seat values onto the integer grid, re-clamping against floor
/// capacity and unit demand so both caps hold exactly after rounding.
fn extract(
    req: &OptimizeRequest<'_>,
    floors: &[&Floor],
    demands: &[u32],
    solved: model::SolvedPlan,
    status: SolveStatus,
) -> OptimizationResult {
    let mut assignments: Vec<FloorAssignment> = Vec::new();
    let mut unit_totals: BTreeMap<String, u32> = BTreeMap::new();
    let mut floor_remaining: Vec<u32> = floors.iter().map(|f| f.total_seats).collect();

    for (u, rec) in req.recommendations.iter().enumerate() {
        let raw = &solved.seats[u];
        let target = round_seats(raw.iter().map(|v| v.max(0.0)).sum()).min(demands[u]);
        let seats = integerize_row(raw, target, &mut floor_remaining);

        let mut total = 0u32;
        for (f, floor) in floors.iter().enumerate() {
            if seats[f] == 0 {
                continue;
            }
            assignments.push(FloorAssignment {
                unit_name: rec.unit_name.clone(),
                building_id: floor.building_id.clone(),
                floor: floor.floor_id(),
                seats_assigned: seats[f],
                adjacency_tier: AdjacencyTier::Optimized,
            });
            total += seats[f];
        }
        unit_totals.insert(rec.unit_name.clone(), total);
    }

    // Before/after against the baseline.
    let mut before_seats: BTreeMap<&str, u32> = BTreeMap::new();
    let mut before_floors: BTreeMap<&str, BTreeSet<FloorId>> = BTreeMap::new();
    for a in req.baseline {
        *before_seats.entry(a.unit_name.as_str()).or_insert(0) += a.seats_assigned;
        before_floors.entry(a.unit_name.as_str()).or_default().insert(a.floor.clone());
    }
    let mut after_floors: BTreeMap<&str, BTreeSet<FloorId>> = BTreeMap::new();
    for a in &assignments {
        after_floors.entry(a.unit_name.as_str()).or_default().insert(a.floor.clone());
    }

    let mut before_after = Vec::with_capacity(req.recommendations.len());
    let mut consolidation_notes = Vec::new();
    for rec in req.recommendations {
        let name = rec.unit_name.as_str();
        let b_seats = before_seats.get(name).copied().unwrap_or(0);
        let a_seats = unit_totals.get(name).copied().unwrap_or(0);
        let b_floors = before_floors.get(name).map(|s| s.len() as u32).unwrap_or(0);
        let a_floors = after_floors.get(name).map(|s| s.len() as u32).unwrap_or(0);
        before_after.push(UnitDelta {
            unit_name: rec.unit_name.clone(),
            before_seats: b_seats,
            after_seats: a_seats,
            seat_change: a_seats as i64 - b_seats as i64,
            before_floors: b_floors,
            after_floors: a_floors,
            floor_change: a_floors as i64 - b_floors as i64,
        });
        if a_floors < b_floors {
            consolidation_notes.push(format!(
                "{name}: Consolidated from {b_floors} floors to {a_floors} floors"
            ));
        }
    }

    // Savings vs the policy-derived baseline, for the RTO-flavored modes.
    let savings = match req.objective {
        ObjectiveMode::OptimalPlacement => None,
        ObjectiveMode::RtoBased | ObjectiveMode::WhatIf { .. } => {
            let policy: u64 = req
                .recommendations
                .iter()
                .map(|r| r.effective_demand_seats as u64)
                .sum();
            let optimized: u64 = unit_totals.values().map(|&v| v as u64).sum();
            let baseline_floors: BTreeSet<FloorId> =
                req.baseline.iter().map(|a| a.floor.clone()).collect();
            let optimized_floors: BTreeSet<FloorId> =
                assignments.iter().map(|a| a.floor.clone()).collect();
            Some(SavingsSummary {
                policy_demand_seats: policy,
                optimized_seats: optimized,
                seats_freed: policy as i64 - optimized as i64,
                baseline_floors_used: baseline_floors.len() as u32,
                optimized_floors_used: optimized_floors.len() as u32,
                floors_freed: baseline_floors.len() as i64 - optimized_floors.len() as i64,
            })
        }
    };

    info!(
        objective = req.objective.label(),
        %status,
        assigned = assignments.len(),
        "placement solved"
    );

    OptimizationResult {
        status,
        objective_value: solved.objective_value,
        message: format!(
            "Optimization complete. Objective ({}): {:.2}",
            req.objective.label(),
            solved.objective_value,
        ),
        assignments,
        unit_totals,
        before_after,
        consolidation_notes,
        savings,
    }
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::PriorityTier;

    fn floor(tower: &str, num: i32, seats: u32) -> Floor {
        Floor {
            building_id: "B1".into(),
            building_name: "HQ".into(),
            tower_id: tower.into(),
            floor_number: num,
            total_seats: seats,
        }
    }

    fn unit(name: &str, hc: u32) -> Unit {
        Unit {
            unit_name: name.into(),
            current_total_hc: hc,
            hc_growth_pct: 0.05,
            attrition_pct: 0.05,
            business_priority: Some(PriorityTier::Medium),
            seat_alloc_pct: None,
        }
    }

    fn rec(name: &str, demand: u32) -> AllocationRecommendation {
        AllocationRecommendation::pending(name, 0.7, demand, Vec::new())
    }

    fn profile(name: &str, median: f64, max: f64, rto: f64) -> AttendanceProfile {
        AttendanceProfile {
            unit_name: name.into(),
            monthly_median_hc: median,
            monthly_max_hc: max,
            avg_rto_days_per_week: rto,
            attendance_stability: None,
        }
    }

    #[test]
    fn feasible_placement_respects_caps() {
        let recs = vec![rec("A", 100), rec("B", 80)];
        let units = vec![unit("A", 200), unit("B", 150)];
        let floors = vec![floor("T1", 1, 100), floor("T1", 2, 100), floor("T1", 3, 100)];
        let attendance = BTreeMap::new();
        let rules = PlanRules::default();
        let req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &[], ObjectiveMode::OptimalPlacement, &rules,
        );

        let result = optimize(&req).unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.unit_totals["A"], 100);
        assert_eq!(result.unit_totals["B"], 80);
        for a in &result.assignments {
            assert_eq!(a.adjacency_tier, AdjacencyTier::Optimized);
        }
        // Per-floor totals stay within capacity.
        let mut per_floor: BTreeMap<FloorId, u32> = BTreeMap::new();
        for a in &result.assignments {
            *per_floor.entry(a.floor.clone()).or_insert(0) += a.seats_assigned;
        }
        assert!(per_floor.values().all(|&v| v <= 100));
    }

    #[test]
    fn fair_split_under_scarcity() {
        let recs = vec![rec("A", 120), rec("B", 120)];
        let units = vec![unit("A", 200), unit("B", 200)];
        let floors = vec![floor("T1", 1, 100), floor("T1", 2, 100)];
        let attendance = BTreeMap::new();
        let rules = PlanRules::default();
        let req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &[], ObjectiveMode::OptimalPlacement, &rules,
        );

        let result = optimize(&req).unwrap();
        assert!(result.status.is_success());
        let a = result.unit_totals["A"] as i64;
        let b = result.unit_totals["B"] as i64;
        assert!(a + b <= 200);
        assert!((a - b).abs() <= 10, "expected a fair split, got {a} vs {b}");
    }

    #[test]
    fn demand_cap_never_exceeded_in_any_mode() {
        let recs = vec![rec("A", 160)];
        let units = vec![unit("A", 200)];
        let mut attendance = BTreeMap::new();
        attendance.insert("A".to_string(), profile("A", 140.0, 170.0, 3.5));
        let floors = vec![floor("T1", 1, 400)];
        let rules = PlanRules::default();

        for objective in [
            ObjectiveMode::OptimalPlacement,
            ObjectiveMode::RtoBased,
            ObjectiveMode::WhatIf { target_rto_days: 2.0 },
        ] {
            let req = OptimizeRequest::new(
                &recs, &units, &attendance, &floors, &[], objective, &rules,
            );
            let result = optimize(&req).unwrap();
            let basis = demand_basis(
                objective,
                &recs[0],
                Some(&units[0]),
                attendance.get("A"),
                &rules,
            );
            assert!(
                result.unit_totals["A"] <= basis,
                "{}: {} > {basis}",
                objective.label(),
                result.unit_totals["A"],
            );
        }
    }

    #[test]
    fn rto_mode_reports_savings_and_consolidation() {
        let recs = vec![rec("A", 160)];
        let units = vec![unit("A", 200)];
        let mut attendance = BTreeMap::new();
        // Expected seats at actual RTO: round((140 + 30) * 3.5/5) = 119.
        attendance.insert("A".to_string(), profile("A", 140.0, 170.0, 3.5));
        let floors = vec![floor("T1", 1, 200), floor("T1", 2, 200)];
        let baseline = vec![
            FloorAssignment {
                unit_name: "A".into(),
                building_id: "B1".into(),
                floor: FloorId::new("T1", 1),
                seats_assigned: 80,
                adjacency_tier: AdjacencyTier::SameFloor,
            },
            FloorAssignment {
                unit_name: "A".into(),
                building_id: "B1".into(),
                floor: FloorId::new("T1", 2),
                seats_assigned: 80,
                adjacency_tier: AdjacencyTier::Adjacent,
            },
        ];
        let rules = PlanRules::default();
        let req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &baseline, ObjectiveMode::RtoBased, &rules,
        );

        let result = optimize(&req).unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.unit_totals["A"], 119);

        let savings = result.savings.expect("rto mode must report savings");
        assert_eq!(savings.policy_demand_seats, 160);
        assert_eq!(savings.optimized_seats, 119);
        assert_eq!(savings.seats_freed, 41);
        assert_eq!(savings.baseline_floors_used, 2);
        // 119 seats fit on one 200-seat floor; floor-use weight consolidates.
        assert_eq!(savings.optimized_floors_used, 1);
        assert_eq!(result.consolidation_notes.len(), 1);
        let delta = &result.before_after[0];
        assert_eq!(delta.before_seats, 160);
        assert_eq!(delta.after_seats, 119);
        assert_eq!(delta.floor_change, -1);
    }

    #[test]
    fn infeasible_guarantee_relaxes_once() {
        let recs = vec![rec("A", 100), rec("B", 100)];
        let units = vec![unit("A", 200), unit("B", 200)];
        let floors = vec![floor("T1", 1, 150)];
        let attendance = BTreeMap::new();
        let rules = PlanRules::default();
        let mut req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &[], ObjectiveMode::OptimalPlacement, &rules,
        );
        req.min_guarantee_fraction = Some(1.0);

        let result = optimize(&req).unwrap();
        assert_eq!(result.status, SolveStatus::OptimalRelaxed);
        let total: u32 = result.unit_totals.values().sum();
        assert!(total <= 150);
    }

    #[test]
    fn tower_pins_zero_out_disallowed_floors() {
        let recs = vec![rec("A", 60)];
        let units = vec![unit("A", 100)];
        let floors = vec![floor("T1", 1, 100), floor("T2", 1, 100)];
        let attendance = BTreeMap::new();
        let rules = PlanRules::default();
        let mut req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &[], ObjectiveMode::OptimalPlacement, &rules,
        );
        req.tower_pins.insert("A".into(), ["T2".to_string()].into_iter().collect());

        let result = optimize(&req).unwrap();
        assert!(result.status.is_success());
        assert!(result.assignments.iter().all(|a| a.floor.tower_id == "T2"));
        assert_eq!(result.unit_totals["A"], 60);
    }

    #[test]
    fn excluded_floors_are_not_candidates() {
        let recs = vec![rec("A", 60)];
        let units = vec![unit("A", 100)];
        let floors = vec![floor("T1", 1, 100), floor("T1", 2, 100)];
        let attendance = BTreeMap::new();
        let rules = PlanRules::default();
        let mut req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &[], ObjectiveMode::OptimalPlacement, &rules,
        );
        req.excluded_floors.insert(FloorId::new("T1", 1));

        let result = optimize(&req).unwrap();
        assert!(result.assignments.iter().all(|a| a.floor != FloorId::new("T1", 1)));
    }

    #[test]
    fn invalid_requests_are_errors() {
        let recs = vec![rec("A", 10)];
        let units = vec![unit("A", 100)];
        let floors = vec![floor("T1", 1, 100)];
        let attendance = BTreeMap::new();
        let rules = PlanRules::default();

        let mut req = OptimizeRequest::new(
            &recs, &units, &attendance, &floors, &[],
            ObjectiveMode::WhatIf { target_rto_days: 9.0 }, &rules,
        );
        assert_eq!(optimize(&req).unwrap_err(), OptError::TargetRtoOutOfRange(9.0));

        req.objective = ObjectiveMode::OptimalPlacement;
        req.min_guarantee_fraction = Some(1.5);
        assert_eq!(optimize(&req).unwrap_err(), OptError::GuaranteeOutOfRange(1.5));

        req.min_guarantee_fraction = None;
        req.max_floors_per_unit = Some(0);
        assert_eq!(optimize(&req).unwrap_err(), OptError::MaxFloorsZero);
    }

    #[test]
    fn rto_fallback_without_profile() {
        // No attendance: expected = round(3/5 × 200) = 120.
        assert_eq!(
            rto_expected_seats(Some(&unit("A", 200)), None, None, &PlanRules::default()),
            120,
        );
        // What-if override still applies to the fallback path.
        assert_eq!(
            rto_expected_seats(Some(&unit("A", 200)), None, Some(2.0), &PlanRules::default()),
            80,
        );
    }
}
