//! LP formulation and solve for seat placement.
//!
//! One weighted single-solve objective, strictly ordered so that unmet demand
//! dominates fairness, fairness dominates floor count, and floor count
//! dominates the cohesion tiebreak:
//!
//!   minimize  W_short · Σ shortfall_u
//!           + W_fair  · worst_shortfall_ratio
//!           + W_floor · Σ used_{u,f}
//!           − W_adj   · Σ adjacency_{u,f} · seats_{u,f}
//!
//! Variables are continuous; the bundled simplex backend solves the
//! relaxation and the caller rounds extracted seat values back onto the
//! integer grid under the same capacity/demand caps. Usage indicators are
//! `[0, 1]` linked by `seats ≤ capacity × used`, so a max-floors cap of `k`
//! still bounds a unit to `k` floors' worth of capacity in the relaxation.

use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::debug;

/// Dominant: every seat of unmet demand.
pub(crate) const SHORTFALL_WEIGHT: f64 = 10_000.0;
/// Worst-case shortfall ratio (0–1); breaks ties between equal-total splits.
pub(crate) const FAIRNESS_WEIGHT: f64 = 1_000.0;
/// Per (unit, floor) usage indicator.
pub(crate) const FLOOR_USE_WEIGHT: f64 = 10.0;
/// Cohesion tiebreak on adjacency-weighted seats (entered negatively).
pub(crate) const COHESION_WEIGHT: f64 = 0.01;

/// Numeric inputs for one formulation, all indexed (unit, floor).
pub(crate) struct PlanProblem {
    /// Demand basis per unit (objective-specific).
    pub demands: Vec<u32>,
    /// Capacity per available floor.
    pub caps: Vec<u32>,
    /// Tower pinning: disallowed pairs get a zero upper bound.
    pub allowed: Vec<Vec<bool>>,
    /// Adjacency bonus per pair, from the baseline assignment.
    pub adjacency: Vec<Vec<f64>>,
    pub max_floors_per_unit: Option<u32>,
    /// Per-unit minimum-guarantee seats (soft tier; dropped on relaxation).
    pub guarantee_seats: Vec<u32>,
}

pub(crate) struct SolvedPlan {
    pub objective_value: f64,
    /// Raw (possibly fractional) seats per (unit, floor).
    pub seats: Vec<Vec<f64>>,
}

fn sum(vars: impl IntoIterator<Item = Variable>) -> Expression {
    vars.into_iter().fold(Expression::from(0.0), |acc, v| acc + v)
}

/// Build and solve one formulation. `with_guarantees` controls whether the
/// soft minimum-guarantee tier is included.
pub(crate) fn solve(
    p: &PlanProblem,
    with_guarantees: bool,
) -> Result<SolvedPlan, ResolutionError> {
    let n_units = p.demands.len();
    let n_floors = p.caps.len();
    debug!(n_units, n_floors, with_guarantees, "formulating placement model");

    let mut vars = variables!();

    // seats[u][f] in [0, cap] (0 when the pair is pinned out) and the linked
    // usage indicator in [0, 1].
    let mut seats: Vec<Vec<Variable>> = Vec::with_capacity(n_units);
    let mut used: Vec<Vec<Variable>> = Vec::with_capacity(n_units);
    for u in 0..n_units {
        let mut row_x = Vec::with_capacity(n_floors);
        let mut row_y = Vec::with_capacity(n_floors);
        for f in 0..n_floors {
            let cap = if p.allowed[u][f] { p.caps[f] as f64 } else { 0.0 };
            row_x.push(vars.add(variable().min(0.0).max(cap)));
            row_y.push(vars.add(variable().min(0.0).max(1.0)));
        }
        seats.push(row_x);
        used.push(row_y);
    }

    // Shortfall slack per unit and the worst-case shortfall ratio.
    let shortfall: Vec<Variable> =
        (0..n_units).map(|_| vars.add(variable().min(0.0))).collect();
    let worst_ratio = vars.add(variable().min(0.0));

    let mut objective = Expression::from(0.0);
    for u in 0..n_units {
        objective += SHORTFALL_WEIGHT * shortfall[u];
        for f in 0..n_floors {
            objective += FLOOR_USE_WEIGHT * used[u][f];
            let w = p.adjacency[u][f];
            if w != 0.0 {
                objective += (-COHESION_WEIGHT * w) * seats[u][f];
            }
        }
    }
    objective += FAIRNESS_WEIGHT * worst_ratio;

    let mut model = vars.minimise(objective).using(default_solver);

    // Floor capacity.
    for f in 0..n_floors {
        let total = sum((0..n_units).map(|u| seats[u][f]));
        model = model.with(constraint!(total <= p.caps[f] as f64));
    }

    for u in 0..n_units {
        let demand = p.demands[u] as f64;
        let assigned = sum(seats[u].iter().copied());

        // Never over-allocate beyond the unit's demand basis.
        model = model.with(constraint!(assigned.clone() <= demand));

        // Shortfall definition and worst-ratio envelope.
        model = model.with(constraint!(shortfall[u] + assigned.clone() >= demand));
        if p.demands[u] > 0 {
            model = model.with(constraint!(demand * worst_ratio >= shortfall[u]));
        }

        // Link seats to the usage indicator.
        for f in 0..n_floors {
            let cap = p.caps[f] as f64;
            model = model.with(constraint!(seats[u][f] <= cap * used[u][f]));
        }

        if let Some(k) = p.max_floors_per_unit {
            let floors_used = sum(used[u].iter().copied());
            model = model.with(constraint!(floors_used <= k as f64));
        }

        if with_guarantees && p.guarantee_seats[u] > 0 {
            model = model.with(constraint!(assigned >= p.guarantee_seats[u] as f64));
        }
    }

    let solution = model.solve()?;

    let values: Vec<Vec<f64>> = seats
        .iter()
        .map(|row| row.iter().map(|&v| solution.value(v)).collect())
        .collect();

    // Recompute the objective from extracted values; the backend does not
    // expose it uniformly.
    let mut objective_value = 0.0;
    for u in 0..n_units {
        objective_value += SHORTFALL_WEIGHT * solution.value(shortfall[u]);
        for f in 0..n_floors {
            objective_value += FLOOR_USE_WEIGHT * solution.value(used[u][f]);
            objective_value -= COHESION_WEIGHT * p.adjacency[u][f] * values[u][f];
        }
    }
    objective_value += FAIRNESS_WEIGHT * solution.value(worst_ratio);

    Ok(SolvedPlan { objective_value, seats: values })
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn open(n_units: usize, n_floors: usize) -> (Vec<Vec<bool>>, Vec<Vec<f64>>) {
        (vec![vec![true; n_floors]; n_units], vec![vec![0.0; n_floors]; n_units])
    }

    #[test]
    fn satisfies_demand_when_capacity_allows() {
        let (allowed, adjacency) = open(1, 1);
        let p = PlanProblem {
            demands: vec![50],
            caps: vec![200],
            allowed,
            adjacency,
            max_floors_per_unit: None,
            guarantee_seats: vec![0],
        };
        let solved = solve(&p, true).unwrap();
        let total: f64 = solved.seats[0].iter().sum();
        assert!((total - 50.0).abs() < 1e-6);
    }

    #[test]
    fn never_exceeds_floor_capacity() {
        let (allowed, adjacency) = open(2, 1);
        let p = PlanProblem {
            demands: vec![80, 80],
            caps: vec![100],
            allowed,
            adjacency,
            max_floors_per_unit: None,
            guarantee_seats: vec![0, 0],
        };
        let solved = solve(&p, true).unwrap();
        let on_floor: f64 = solved.seats.iter().map(|row| row[0]).sum();
        assert!(on_floor <= 100.0 + 1e-6);
    }

    #[test]
    fn fairness_splits_equal_demands() {
        let (allowed, adjacency) = open(2, 2);
        let p = PlanProblem {
            demands: vec![120, 120],
            caps: vec![100, 100],
            allowed,
            adjacency,
            max_floors_per_unit: None,
            guarantee_seats: vec![0, 0],
        };
        let solved = solve(&p, true).unwrap();
        let a: f64 = solved.seats[0].iter().sum();
        let b: f64 = solved.seats[1].iter().sum();
        assert!((a + b) <= 200.0 + 1e-6);
        assert!((a - b).abs() <= 1.0, "worst-ratio term must balance the split: {a} vs {b}");
    }

    #[test]
    fn pinned_out_floor_stays_empty() {
        let (_, adjacency) = open(1, 2);
        let p = PlanProblem {
            demands: vec![60],
            caps: vec![100, 100],
            allowed: vec![vec![false, true]],
            adjacency,
            max_floors_per_unit: None,
            guarantee_seats: vec![0],
        };
        let solved = solve(&p, true).unwrap();
        assert!(solved.seats[0][0].abs() < 1e-9);
        assert!((solved.seats[0][1] - 60.0).abs() < 1e-6);
    }

    #[test]
    fn guarantee_makes_model_infeasible_then_relaxation_recovers() {
        let (allowed, adjacency) = open(2, 1);
        let p = PlanProblem {
            demands: vec![100, 100],
            caps: vec![150],
            allowed,
            adjacency,
            max_floors_per_unit: None,
            guarantee_seats: vec![100, 100],
        };
        assert!(solve(&p, true).is_err());
        let relaxed = solve(&p, false).unwrap();
        let total: f64 = relaxed.seats.iter().flat_map(|r| r.iter()).sum();
        assert!(total <= 150.0 + 1e-6);
    }

    #[test]
    fn max_floors_bounds_capacity_reach() {
        let (allowed, adjacency) = open(1, 3);
        let p = PlanProblem {
            demands: vec![150],
            caps: vec![60, 60, 60],
            allowed,
            adjacency,
            max_floors_per_unit: Some(2),
            guarantee_seats: vec![0],
        };
        let solved = solve(&p, true).unwrap();
        let total: f64 = solved.seats[0].iter().sum();
        assert!(total <= 120.0 + 1e-6, "two floors of 60 bound the total: {total}");
    }
}
