//! Scarcity redistributor: grant full demand when supply covers it,
//! otherwise ration priority-first with a shrinkage release.
//!
//! Contract:
//! - No scarcity (total demand ≤ supply): every unit gets its demand, gap 0.
//! - Scarcity: stable sort on (priority rank asc, net change desc); shrinking
//!   units release `|net| × demand × contribution_factor` seats from their own
//!   demand; then each unit in sort order receives
//!   `min(demand, round(remaining_supply × demand / remaining_demand))`,
//!   decrementing both running totals. Later units therefore divide a
//!   shrinking pool; the order dependence is deliberate and kept.
//!
//! Postconditions: total allocated ≤ supply; no unit exceeds its (possibly
//! reduced) demand; `seat_gap = allocated − demand`.

use std::collections::BTreeMap;

use sp_core::rounding::round_half_even;
use sp_core::rules::PlanRules;
use sp_core::{AllocationRecommendation, PriorityTier, Unit};

/// Distribute `total_supply` seats across `recs` in place.
///
/// `recs` entries must carry `effective_demand_seats` from the demand model;
/// `allocated_seats` and `seat_gap` are (re)written here. Unknown unit names
/// (no matching `Unit`) sort last with net change 0.
pub fn distribute_seats(
    recs: &mut [AllocationRecommendation],
    units: &[Unit],
    total_supply: u32,
    rules: &PlanRules,
) {
    let total_demand: u64 = recs.iter().map(|r| r.effective_demand_seats as u64).sum();

    if total_demand <= total_supply as u64 {
        for rec in recs.iter_mut() {
            rec.allocated_seats = rec.effective_demand_seats;
            rec.seat_gap = 0;
        }
        return;
    }

    let unit_map: BTreeMap<&str, &Unit> =
        units.iter().map(|u| (u.unit_name.as_str(), u)).collect();

    // Priority-first order: tier rank ascending, then net change descending.
    // The sort is stable; fully tied units keep their input order.
    let sort_key = |ix: usize| -> (u8, f64) {
        match unit_map.get(recs[ix].unit_name.as_str()) {
            Some(u) => (PriorityTier::rank(u.business_priority), u.net_hc_change_pct()),
            None => (PriorityTier::rank(None), 0.0),
        }
    };
    let mut order: Vec<usize> = (0..recs.len()).collect();
    order.sort_by(|&i, &j| {
        let (rank_i, net_i) = sort_key(i);
        let (rank_j, net_j) = sort_key(j);
        rank_i.cmp(&rank_j).then_with(|| net_j.total_cmp(&net_i))
    });

    // Shrinking units give part of their demand back before rationing.
    for &ix in &order {
        if let Some(u) = unit_map.get(recs[ix].unit_name.as_str()) {
            let net = u.net_hc_change_pct();
            if net < 0.0 {
                let release = round_half_even(
                    net.abs() * recs[ix].effective_demand_seats as f64
                        * rules.shrink_contribution_factor,
                )
                .max(0) as u32;
                recs[ix].effective_demand_seats =
                    recs[ix].effective_demand_seats.saturating_sub(release);
            }
        }
    }

    // Proportional walk against shrinking remaining totals.
    let mut remaining_supply = total_supply as i64;
    let mut remaining_demand: i64 =
        recs.iter().map(|r| r.effective_demand_seats as i64).sum();

    for &ix in &order {
        let demand = recs[ix].effective_demand_seats as i64;
        let assigned = if remaining_demand > 0 {
            let share = demand as f64 / remaining_demand as f64;
            demand.min(round_half_even(remaining_supply as f64 * share))
        } else {
            0
        };
        let assigned = assigned.clamp(0, remaining_supply);
        recs[ix].allocated_seats = assigned as u32;
        recs[ix].seat_gap = assigned - demand;
        remaining_supply -= assigned;
        remaining_demand -= demand;
    }
}

/* ---------------------------------- Tests --------------------------------- */
