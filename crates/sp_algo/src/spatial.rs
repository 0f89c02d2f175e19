//! Spatial assignment heuristic: greedy largest-unit-first bin packing with
//! adjacency scoring, plus per-unit fragmentation and floor reporting.
//!
//! Contract:
//! - Units are placed in descending order of allocated seats (stable on ties).
//! - Candidate floors are scanned in canonical `FloorId` order; only a
//!   strictly better score displaces the current best, so score ties resolve
//!   to the lowest floor id.
//! - Placement score: `remaining × 10 + adjacency_bonus − floors_used × 30`.
//! - Capacity exhaustion truncates a unit's placement; the shortfall is
//!   reported per unit in `PlacementOutcome::unplaced` (and stays visible as
//!   a seat gap downstream) rather than being raised as an error.

use std::collections::{BTreeMap, BTreeSet};

use sp_core::rules::{
    CAPACITY_SCORE_WEIGHT, FRAGMENTATION_PENALTY_PER_FLOOR, IDEAL_FLOOR_CAPACITY,
};
use sp_core::{AdjacencyTier, AllocationRecommendation, Floor, FloorAssignment, FloorId};

/// Result of one heuristic placement pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementOutcome {
    pub assignments: Vec<FloorAssignment>,
    /// Per-unit fragmentation score, keyed by unit name.
    pub fragmentation: BTreeMap<String, f64>,
    /// Seats that found no floor, per unit. Empty when capacity sufficed.
    pub unplaced: BTreeMap<String, u32>,
}

/// Adjacency tier of `floor` relative to a unit's existing assignments.
pub fn compute_adjacency_tier(
    floor: &Floor,
    existing: &[FloorAssignment],
    unit_name: &str,
) -> AdjacencyTier {
    let unit_floors: Vec<&FloorAssignment> =
        existing.iter().filter(|a| a.unit_name == unit_name).collect();

    if unit_floors.is_empty() {
        return AdjacencyTier::NewPlacement;
    }
    if unit_floors
        .iter()
        .any(|a| a.floor.tower_id == floor.tower_id && a.floor.floor_number == floor.floor_number)
    {
        return AdjacencyTier::SameFloor;
    }
    if unit_floors.iter().any(|a| {
        a.floor.tower_id == floor.tower_id
            && (a.floor.floor_number - floor.floor_number).abs() == 1
    }) {
        return AdjacencyTier::Adjacent;
    }
    if unit_floors.iter().any(|a| a.floor.tower_id == floor.tower_id) {
        return AdjacencyTier::SameTower;
    }
    AdjacencyTier::CrossTower
}

fn score_floor(
    floor: &Floor,
    remaining: u32,
    existing: &[FloorAssignment],
    unit_name: &str,
    floors_used: usize,
) -> i64 {
    let bonus = compute_adjacency_tier(floor, existing, unit_name).bonus();
    remaining as i64 * CAPACITY_SCORE_WEIGHT + bonus
        - floors_used as i64 * FRAGMENTATION_PENALTY_PER_FLOOR
}

/// Place every unit's allocated seats onto floors and score fragmentation.
///
/// Fragmentation per unit: 0 without seats, else
/// `min(1, (floors_used / max(1, allocated/IDEAL_FLOOR_CAPACITY) − 1) / 3)`.
/// A unit that needs fewer floors than the reference ideal can score slightly
/// below zero; the value is written back onto each recommendation.
pub fn assign_units_to_floors(
    recs: &mut [AllocationRecommendation],
    floors: &[Floor],
) -> PlacementOutcome {
    let floor_map: BTreeMap<FloorId, &Floor> =
        floors.iter().map(|f| (f.floor_id(), f)).collect();
    let mut floor_remaining: BTreeMap<FloorId, u32> =
        floors.iter().map(|f| (f.floor_id(), f.total_seats)).collect();

    // Largest units first; stable on equal allocations.
    let mut order: Vec<usize> = (0..recs.len()).collect();
    order.sort_by(|&i, &j| recs[j].allocated_seats.cmp(&recs[i].allocated_seats));

    let mut assignments: Vec<FloorAssignment> = Vec::new();
    let mut unplaced: BTreeMap<String, u32> = BTreeMap::new();

    for &ix in &order {
        let unit_name = recs[ix].unit_name.clone();
        let mut seats_to_place = recs[ix].allocated_seats;

        while seats_to_place > 0 {
            let floors_used = assignments
                .iter()
                .filter(|a| a.unit_name == unit_name)
                .map(|a| a.floor.clone())
                .collect::<BTreeSet<_>>()
                .len();

            // Canonical scan order makes the lowest floor id win score ties.
            let mut best: Option<(FloorId, i64)> = None;
            for (fid, &remaining) in &floor_remaining {
                if remaining == 0 {
                    continue;
                }
                let s = score_floor(floor_map[fid], remaining, &assignments, &unit_name, floors_used);
                if best.as_ref().map_or(true, |(_, bs)| s > *bs) {
                    best = Some((fid.clone(), s));
                }
            }

            let Some((best_id, _)) = best else {
                // No capacity left anywhere; the rest of this unit goes unplaced.
                unplaced.insert(unit_name.clone(), seats_to_place);
                break;
            };

            let floor = floor_map[&best_id];
            let remaining = floor_remaining[&best_id];
            let seats_on_floor = seats_to_place.min(remaining);
            let tier = compute_adjacency_tier(floor, &assignments, &unit_name);

            assignments.push(FloorAssignment {
                unit_name: unit_name.clone(),
                building_id: floor.building_id.clone(),
                floor: best_id.clone(),
                seats_assigned: seats_on_floor,
                adjacency_tier: tier,
            });
            *floor_remaining.get_mut(&best_id).expect("floor exists") -= seats_on_floor;
            seats_to_place -= seats_on_floor;
        }
    }

    // Fragmentation scores, written back onto the recommendations.
    let mut fragmentation: BTreeMap<String, f64> = BTreeMap::new();
    for rec in recs.iter_mut() {
        let floors_used = assignments
            .iter()
            .filter(|a| a.unit_name == rec.unit_name)
            .map(|a| a.floor.clone())
            .collect::<BTreeSet<_>>()
            .len();
        let score = if rec.allocated_seats == 0 {
            0.0
        } else {
            let ideal_floors = (rec.allocated_seats as f64 / IDEAL_FLOOR_CAPACITY).max(1.0);
            ((floors_used as f64 / ideal_floors - 1.0) / 3.0).min(1.0)
        };
        rec.fragmentation_score = score;
        fragmentation.insert(rec.unit_name.clone(), score);
    }

    PlacementOutcome { assignments, fragmentation, unplaced }
}

// ----------------------------- Floor reporting -----------------------------

/// Utilization stats for one floor after placement.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorUtilization {
    pub floor: FloorId,
    pub building_id: String,
    pub building_name: String,
    pub total_seats: u32,
    pub used_seats: u32,
    pub available_seats: u32,
    pub utilization_pct: f64,
    /// Seats per hosted unit on this floor.
    pub units: BTreeMap<String, u32>,
}

/// Per-floor usage across all assignments, in canonical floor order.
pub fn floor_utilization(floors: &[Floor], assignments: &[FloorAssignment]) -> Vec<FloorUtilization> {
    let mut usage: BTreeMap<FloorId, BTreeMap<String, u32>> = BTreeMap::new();
    for a in assignments {
        *usage
            .entry(a.floor.clone())
            .or_default()
            .entry(a.unit_name.clone())
            .or_insert(0) += a.seats_assigned;
    }

    let mut sorted: Vec<&Floor> = floors.iter().collect();
    sorted.sort_by_key(|f| f.floor_id());

    sorted
        .into_iter()
        .map(|f| {
            let fid = f.floor_id();
            let units = usage.get(&fid).cloned().unwrap_or_default();
            let used: u32 = units.values().sum();
            FloorUtilization {
                floor: fid,
                building_id: f.building_id.clone(),
                building_name: f.building_name.clone(),
                total_seats: f.total_seats,
                used_seats: used,
                available_seats: f.total_seats.saturating_sub(used),
                utilization_pct: if f.total_seats > 0 {
                    used as f64 / f.total_seats as f64
                } else {
                    0.0
                },
                units,
            }
        })
        .collect()
}

/// Suggest moving the smallest placement onto the largest for units whose
/// fragmentation exceeds 0.5.
pub fn consolidation_suggestions(
    recs: &[AllocationRecommendation],
    assignments: &[FloorAssignment],
) -> Vec<String> {
    let mut suggestions = Vec::new();
    for rec in recs {
        if rec.fragmentation_score <= 0.5 {
            continue;
        }
        let mut unit_floors: Vec<(&FloorId, u32)> = assignments
            .iter()
            .filter(|a| a.unit_name == rec.unit_name)
            .map(|a| (&a.floor, a.seats_assigned))
            .collect();
        unit_floors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        if unit_floors.len() >= 2 {
            let smallest = unit_floors[0];
            let largest = unit_floors[unit_floors.len() - 1];
            suggestions.push(format!(
                "{}: Consider moving {} seats from {} to {} to reduce fragmentation (score: {:.2})",
                rec.unit_name, smallest.1, smallest.0, largest.0, rec.fragmentation_score,
            ));
        }
    }
    suggestions
}

/* ---------------------------------- Tests --------------------------------- */
