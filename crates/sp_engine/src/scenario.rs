//! Scenario simulation: apply overlays to copies of base data, run the full
//! allocation pipeline, and store the results on the scenario.
//!
//! Overlay application never mutates base records: it returns new
//! collections with the sparse per-unit patches substituted. A run proceeds
//! overrides → demand → redistribute → direct fraction overrides →
//! redistribute again → spatial placement, then stamps `last_run_at` with
//! the caller-supplied timestamp (the engine holds no clock). Results are
//! stale once base data changes after that stamp; detecting and re-running
//! is the caller's job.

use std::collections::BTreeMap;
use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sp_algo::{assign_units_to_floors, compute_all_demands, distribute_seats};
use sp_core::rounding::round_seats;
use sp_core::{AttendanceProfile, Floor, Scenario, Unit};

use crate::{EngineError, PlanningContext};

/// Per-unit join row from `compare_scenarios`. A unit missing on one side
/// reports `None` for that side's fraction and zero seats/gap.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioDiff {
    pub unit_name: String,
    pub alloc_pct_a: Option<f64>,
    pub alloc_pct_b: Option<f64>,
    pub seats_a: u32,
    pub seats_b: u32,
    pub seat_change: i64,
    pub gap_a: i64,
    pub gap_b: i64,
}

/// Supply/demand totals and explicit placement shortfall for one run.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunOutcome {
    pub total_supply: u32,
    pub total_demand: u64,
    /// Allocated seats that found no floor, per unit (capacity exhaustion).
    pub unplaced_seats: BTreeMap<String, u32>,
}

/// Substitute per-unit override fields into copies of units and attendance,
/// then apply the global RTO mandate as a floor (it never lowers a unit's
/// already-higher RTO).
pub fn apply_overrides(
    units: &[Unit],
    attendance: &BTreeMap<String, AttendanceProfile>,
    scenario: &Scenario,
) -> (Vec<Unit>, BTreeMap<String, AttendanceProfile>) {
    let mut out_units = Vec::with_capacity(units.len());
    for unit in units {
        let mut u = unit.clone();
        if let Some(patch) = scenario.unit_overrides.get(&u.unit_name) {
            if let Some(g) = patch.hc_growth_pct {
                u.hc_growth_pct = g;
            }
            if let Some(a) = patch.attrition_pct {
                u.attrition_pct = a;
            }
        }
        out_units.push(u);
    }

    let mut out_attendance = attendance.clone();
    for (unit_name, patch) in &scenario.unit_overrides {
        if let Some(att) = out_attendance.get_mut(unit_name) {
            if let Some(m) = patch.median_hc {
                att.monthly_median_hc = m;
            }
            if let Some(m) = patch.max_hc {
                att.monthly_max_hc = m;
            }
            if let Some(r) = patch.avg_rto_days {
                att.avg_rto_days_per_week = r;
            }
        }
    }

    if let Some(mandate) = scenario.params.global_rto_mandate_days {
        for att in out_attendance.values_mut() {
            att.avg_rto_days_per_week = att.avg_rto_days_per_week.max(mandate);
        }
    }

    (out_units, out_attendance)
}

/// Remove excluded floors, then uniformly shrink remaining capacities by the
/// reduction fraction (rounded).
pub fn apply_floor_modifications(floors: &[Floor], scenario: &Scenario) -> Vec<Floor> {
    let reduction = scenario.params.capacity_reduction_pct;
    floors
        .iter()
        .filter(|f| !scenario.params.excluded_floors.contains(&f.floor_id()))
        .map(|f| {
            let mut floor = f.clone();
            if reduction > 0.0 {
                floor.total_seats = round_seats(floor.total_seats as f64 * (1.0 - reduction));
            }
            floor
        })
        .collect()
}

/// Run a full simulation for `scenario` against the context's base data,
/// storing recommendations, floor assignments, and the run timestamp on the
/// scenario. Returns the run's supply/demand totals and any placement
/// shortfall.
pub fn run_scenario(
    ctx: &PlanningContext,
    scenario: &mut Scenario,
    run_at: SystemTime,
) -> Result<RunOutcome, EngineError> {
    info!(scenario = %scenario.scenario_id, horizon = scenario.planning_horizon_months, "running scenario");

    let (units, attendance) = apply_overrides(&ctx.units, &ctx.attendance, scenario);
    let floors = apply_floor_modifications(&ctx.floors, scenario);
    let total_supply: u32 = floors.iter().map(|f| f.total_seats).sum();

    let mut recs = compute_all_demands(
        &units,
        &attendance,
        scenario.planning_horizon_months,
        &ctx.rules,
    );
    distribute_seats(&mut recs, &units, total_supply, &ctx.rules);

    // Direct allocation-fraction overrides re-derive that unit's demand and
    // flag it as manual; a second redistribution reconciles the totals.
    let mut any_override = false;
    for rec in recs.iter_mut() {
        let Some(patch) = scenario.unit_overrides.get(&rec.unit_name) else { continue };
        let Some(pct) = patch.alloc_pct_override else { continue };
        any_override = true;
        rec.is_overridden = true;
        rec.override_alloc_pct = Some(pct);
        rec.recommended_alloc_pct = pct;
        if let Some(unit) = units.iter().find(|u| u.unit_name == rec.unit_name) {
            rec.effective_demand_seats = round_seats(pct * unit.current_total_hc as f64);
        }
    }
    if any_override {
        debug!(scenario = %scenario.scenario_id, "re-distributing after manual overrides");
    }
    distribute_seats(&mut recs, &units, total_supply, &ctx.rules);

    let placement = assign_units_to_floors(&mut recs, &floors);
    let total_demand: u64 = recs.iter().map(|r| r.effective_demand_seats as u64).sum();

    scenario.allocation_results = recs;
    scenario.floor_assignments = placement.assignments;
    scenario.last_run_at = Some(run_at);

    info!(
        scenario = %scenario.scenario_id,
        total_supply,
        total_demand,
        unplaced = placement.unplaced.values().sum::<u32>(),
        "scenario run complete"
    );

    Ok(RunOutcome { total_supply, total_demand, unplaced_seats: placement.unplaced })
}

/// Per-unit join of two scenarios' stored results, sorted by unit name.
pub fn compare_scenarios(a: &Scenario, b: &Scenario) -> Vec<ScenarioDiff> {
    let a_map: BTreeMap<&str, _> =
        a.allocation_results.iter().map(|r| (r.unit_name.as_str(), r)).collect();
    let b_map: BTreeMap<&str, _> =
        b.allocation_results.iter().map(|r| (r.unit_name.as_str(), r)).collect();

    let mut names: Vec<&str> = a_map.keys().chain(b_map.keys()).copied().collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let ra = a_map.get(name);
            let rb = b_map.get(name);
            let seats_a = ra.map(|r| r.allocated_seats).unwrap_or(0);
            let seats_b = rb.map(|r| r.allocated_seats).unwrap_or(0);
            ScenarioDiff {
                unit_name: name.to_string(),
                alloc_pct_a: ra.map(|r| r.recommended_alloc_pct),
                alloc_pct_b: rb.map(|r| r.recommended_alloc_pct),
                seats_a,
                seats_b,
                seat_change: seats_b as i64 - seats_a as i64,
                gap_a: ra.map(|r| r.seat_gap).unwrap_or(0),
                gap_b: rb.map(|r| r.seat_gap).unwrap_or(0),
            }
        })
        .collect()
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::{PriorityTier, ScenarioKind, ScenarioOverride};

    fn unit(name: &str, hc: u32, growth: f64, attrition: f64) -> Unit {
        Unit {
            unit_name: name.into(),
            current_total_hc: hc,
            hc_growth_pct: growth,
            attrition_pct: attrition,
            business_priority: Some(PriorityTier::High),
            seat_alloc_pct: None,
        }
    }

    fn attendance(name: &str, median: f64, max: f64, rto: f64) -> AttendanceProfile {
        AttendanceProfile {
            unit_name: name.into(),
            monthly_median_hc: median,
            monthly_max_hc: max,
            avg_rto_days_per_week: rto,
            attendance_stability: Some(0.7),
        }
    }

    fn floor(tower: &str, num: i32, seats: u32) -> Floor {
        Floor {
            building_id: "B1".into(),
            building_name: "HQ".into(),
            tower_id: tower.into(),
            floor_number: num,
            total_seats: seats,
        }
    }

    fn att_map(profiles: Vec<AttendanceProfile>) -> BTreeMap<String, AttendanceProfile> {
        profiles.into_iter().map(|a| (a.unit_name.clone(), a)).collect()
    }

    #[test]
    fn growth_override_leaves_base_untouched() {
        let units = vec![unit("Eng", 200, 0.10, 0.05)];
        let att = att_map(vec![attendance("Eng", 140.0, 170.0, 3.5)]);
        let mut scenario = Scenario::new("s1", "Test", ScenarioKind::Custom, 6);
        scenario.unit_overrides.insert(
            "Eng".into(),
            ScenarioOverride { hc_growth_pct: Some(0.25), ..Default::default() },
        );

        let (mod_units, _) = apply_overrides(&units, &att, &scenario);
        assert_eq!(mod_units[0].hc_growth_pct, 0.25);
        assert_eq!(units[0].hc_growth_pct, 0.10);
    }

    #[test]
    fn rto_mandate_is_a_floor_not_a_setter() {
        let units = vec![unit("Low", 100, 0.0, 0.0), unit("High", 100, 0.0, 0.0)];
        let att = att_map(vec![
            attendance("Low", 60.0, 70.0, 2.0),
            attendance("High", 60.0, 70.0, 4.5),
        ]);
        let mut scenario = Scenario::new("s1", "Test", ScenarioKind::Custom, 6);
        scenario.params.global_rto_mandate_days = Some(4.0);

        let (_, mod_att) = apply_overrides(&units, &att, &scenario);
        assert_eq!(mod_att["Low"].avg_rto_days_per_week, 4.0);
        assert_eq!(mod_att["High"].avg_rto_days_per_week, 4.5);
    }

    #[test]
    fn floor_exclusion_and_reduction() {
        let floors = vec![floor("T1", 1, 100), floor("T1", 2, 100)];
        let mut scenario = Scenario::new("s1", "Test", ScenarioKind::Custom, 6);
        scenario.params.excluded_floors.insert(sp_core::FloorId::new("T1", 1));
        scenario.params.capacity_reduction_pct = 0.20;

        let got = apply_floor_modifications(&floors, &scenario);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].floor_number, 2);
        assert_eq!(got[0].total_seats, 80);
    }

    #[test]
    fn compare_reports_missing_side_as_none() {
        let mut a = Scenario::new("a", "A", ScenarioKind::Baseline, 6);
        let mut b = Scenario::new("b", "B", ScenarioKind::Growth, 6);
        a.allocation_results = vec![{
            let mut r = sp_core::AllocationRecommendation::pending("Eng", 0.8, 100, Vec::new());
            r.allocated_seats = 100;
            r
        }];
        b.allocation_results = vec![
            {
                let mut r = sp_core::AllocationRecommendation::pending("Eng", 0.9, 120, Vec::new());
                r.allocated_seats = 110;
                r.seat_gap = -10;
                r
            },
            {
                let mut r = sp_core::AllocationRecommendation::pending("Sales", 0.8, 40, Vec::new());
                r.allocated_seats = 40;
                r
            },
        ];

        let diffs = compare_scenarios(&a, &b);
        assert_eq!(diffs.len(), 2);
        let eng = diffs.iter().find(|d| d.unit_name == "Eng").unwrap();
        assert_eq!(eng.seat_change, 10);
        assert_eq!(eng.gap_b, -10);
        let sales = diffs.iter().find(|d| d.unit_name == "Sales").unwrap();
        assert_eq!(sales.alloc_pct_a, None);
        assert_eq!(sales.seats_a, 0);
        assert_eq!(sales.seats_b, 40);
    }
}
