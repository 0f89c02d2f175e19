//! Entity and result records shared across the engine.
//!
//! Contract:
//! - Base records (`Unit`, `AttendanceProfile`, `Floor`) are immutable once
//!   loaded; scenario overlays act on copies produced by the engine.
//! - `FloorId` is the floor identity `(tower_id, floor_number)`; its derived
//!   `Ord` is the canonical floor order and doubles as the deterministic
//!   tie-break for spatial placement.
//! - `AllocationRecommendation` is created once per simulation run and mutated
//!   in place across the redistribution/assignment stages of that run only.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ----------------------------- Priority domain -----------------------------

/// Business priority tier used for scarcity ordering.
///
/// Ranking for redistribution is `High < Medium < Low < unspecified`;
/// `rank(None) == 3` so untiered units sort last.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// Scarcity sort rank; `None` maps to 3 (last).
    pub fn rank(tier: Option<PriorityTier>) -> u8 {
        match tier {
            Some(PriorityTier::High) => 0,
            Some(PriorityTier::Medium) => 1,
            Some(PriorityTier::Low) => 2,
            None => 3,
        }
    }
}

// ----------------------------- Base records -----------------------------

/// An organizational unit competing for shared seats.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Unit {
    /// Unique key across the portfolio.
    pub unit_name: String,
    pub current_total_hc: u32,
    /// Projected annual growth, e.g. 0.10 for +10%.
    pub hc_growth_pct: f64,
    /// Projected annual attrition, e.g. 0.05 for −5%.
    pub attrition_pct: f64,
    pub business_priority: Option<PriorityTier>,
    /// Per-unit flat allocation override (flat mode only).
    pub seat_alloc_pct: Option<f64>,
}

impl Unit {
    /// Net headcount change fraction: growth − attrition.
    pub fn net_hc_change_pct(&self) -> f64 {
        self.hc_growth_pct - self.attrition_pct
    }

    /// Linear headcount projection over a planning horizon.
    pub fn projected_hc(&self, horizon_months: u32) -> f64 {
        let monthly_net = self.net_hc_change_pct() / 12.0;
        self.current_total_hc as f64 * (1.0 + monthly_net * horizon_months as f64)
    }
}

/// Observed in-office attendance for one unit. One profile per unit;
/// absence is legal and is defaulted by the demand model.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttendanceProfile {
    pub unit_name: String,
    pub monthly_median_hc: f64,
    pub monthly_max_hc: f64,
    /// Average required in-office days per week, 0–7.
    pub avg_rto_days_per_week: f64,
    /// 0–1 scale, higher = more predictable attendance.
    pub attendance_stability: Option<f64>,
}

impl AttendanceProfile {
    pub fn peak_to_median_ratio(&self) -> f64 {
        if self.monthly_median_hc == 0.0 {
            1.0
        } else {
            self.monthly_max_hc / self.monthly_median_hc
        }
    }

    /// Fraction of a working week attended.
    pub fn rto_ratio(&self, working_days_per_week: f64) -> f64 {
        self.avg_rto_days_per_week / working_days_per_week
    }
}

/// Floor identity: `(tower_id, floor_number)`. The derived `Ord` (tower
/// lexicographic, then floor number ascending) is the canonical floor order.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloorId {
    pub tower_id: String,
    pub floor_number: i32,
}

impl FloorId {
    pub fn new(tower_id: impl Into<String>, floor_number: i32) -> Self {
        Self { tower_id: tower_id.into(), floor_number }
    }
}

impl fmt::Display for FloorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-F{}", self.tower_id, self.floor_number)
    }
}

/// A physical floor with a fixed seat capacity. Floors never move; scenario
/// overlays may shrink capacity or remove a floor without mutating the base.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Floor {
    pub building_id: String,
    pub building_name: String,
    pub tower_id: String,
    pub floor_number: i32,
    pub total_seats: u32,
}

impl Floor {
    pub fn floor_id(&self) -> FloorId {
        FloorId::new(self.tower_id.clone(), self.floor_number)
    }
}

// ----------------------------- Result records -----------------------------

/// Qualitative proximity bucket used to score placement desirability.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AdjacencyTier {
    /// First placement for a unit; no proximity signal yet.
    NewPlacement,
    SameFloor,
    /// Adjacent floor number in the same tower.
    Adjacent,
    SameTower,
    CrossTower,
    /// Produced by the optimizer rather than the heuristic.
    Optimized,
}

impl AdjacencyTier {
    /// Fixed bonus table consumed by the placement score.
    pub fn bonus(self) -> i64 {
        match self {
            AdjacencyTier::SameFloor => 100,
            AdjacencyTier::Adjacent => 60,
            AdjacencyTier::SameTower => 30,
            AdjacencyTier::NewPlacement
            | AdjacencyTier::CrossTower
            | AdjacencyTier::Optimized => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdjacencyTier::NewPlacement => "new_placement",
            AdjacencyTier::SameFloor => "same_floor",
            AdjacencyTier::Adjacent => "adjacent",
            AdjacencyTier::SameTower => "same_tower",
            AdjacencyTier::CrossTower => "cross_tower",
            AdjacencyTier::Optimized => "optimized",
        }
    }
}

impl fmt::Display for AdjacencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-unit allocation outcome for one simulation run.
///
/// `seat_gap = allocated − demand` (negative = shortfall). The explanation
/// trail is ordered; its numeric quantities must match the computation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AllocationRecommendation {
    pub unit_name: String,
    pub recommended_alloc_pct: f64,
    pub effective_demand_seats: u32,
    pub allocated_seats: u32,
    pub seat_gap: i64,
    /// 0–1, higher = more fragmented across floors.
    pub fragmentation_score: f64,
    pub explanation_steps: Vec<String>,
    pub is_overridden: bool,
    pub override_alloc_pct: Option<f64>,
}

impl AllocationRecommendation {
    /// A recommendation carrying only derivation output; seats are granted
    /// later by the redistribution stage.
    pub fn pending(
        unit_name: impl Into<String>,
        recommended_alloc_pct: f64,
        effective_demand_seats: u32,
        explanation_steps: Vec<String>,
    ) -> Self {
        Self {
            unit_name: unit_name.into(),
            recommended_alloc_pct,
            effective_demand_seats,
            allocated_seats: 0,
            seat_gap: 0,
            fragmentation_score: 0.0,
            explanation_steps,
            is_overridden: false,
            override_alloc_pct: None,
        }
    }
}

/// Seats granted to one unit on one floor. A unit may span floors and a
/// floor may host several units; per-floor totals never exceed capacity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloorAssignment {
    pub unit_name: String,
    pub building_id: String,
    pub floor: FloorId,
    pub seats_assigned: u32,
    pub adjacency_tier: AdjacencyTier,
}

// ----------------------------- Scenario overlay -----------------------------

/// Sparse per-unit patch over base data; unset fields fall back to base.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioOverride {
    pub hc_growth_pct: Option<f64>,
    pub attrition_pct: Option<f64>,
    pub median_hc: Option<f64>,
    pub max_hc: Option<f64>,
    pub avg_rto_days: Option<f64>,
    /// Direct allocation-fraction override, applied after derivation.
    pub alloc_pct_override: Option<f64>,
}

/// Global scenario knobs applied to every unit / remaining floor.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioParams {
    /// Floor on every unit's RTO days (never lowers a higher value).
    pub global_rto_mandate_days: Option<f64>,
    pub excluded_floors: BTreeSet<FloorId>,
    /// 0–1 uniform capacity reduction applied to remaining floors.
    pub capacity_reduction_pct: f64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScenarioKind {
    Baseline,
    Growth,
    Efficiency,
    Attrition,
    Consolidation,
    Custom,
}

/// A named what-if plan: overlay + the results of its last run.
///
/// Results are stale once base data changes after `last_run_at`; detection
/// and re-running are the caller's responsibility, as is serializing writes
/// per scenario. `is_locked` is an application-level guard that the engine
/// itself never checks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scenario {
    pub scenario_id: String,
    pub name: String,
    pub description: String,
    pub scenario_type: ScenarioKind,
    pub planning_horizon_months: u32,
    pub is_locked: bool,
    pub unit_overrides: BTreeMap<String, ScenarioOverride>,
    pub params: ScenarioParams,
    pub allocation_results: Vec<AllocationRecommendation>,
    pub floor_assignments: Vec<FloorAssignment>,
    pub last_run_at: Option<SystemTime>,
}

impl Scenario {
    pub fn new(
        scenario_id: impl Into<String>,
        name: impl Into<String>,
        scenario_type: ScenarioKind,
        planning_horizon_months: u32,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            name: name.into(),
            description: String::new(),
            scenario_type,
            planning_horizon_months,
            is_locked: false,
            unit_overrides: BTreeMap::new(),
            params: ScenarioParams::default(),
            allocation_results: Vec::new(),
            floor_assignments: Vec::new(),
            last_run_at: None,
        }
    }
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_orders_high_first_none_last() {
        assert_eq!(PriorityTier::rank(Some(PriorityTier::High)), 0);
        assert_eq!(PriorityTier::rank(Some(PriorityTier::Medium)), 1);
        assert_eq!(PriorityTier::rank(Some(PriorityTier::Low)), 2);
        assert_eq!(PriorityTier::rank(None), 3);
    }

    #[test]
    fn floor_id_orders_by_tower_then_number() {
        let mut ids = vec![
            FloorId::new("T2", 1),
            FloorId::new("T1", 10),
            FloorId::new("T1", 2),
        ];
        ids.sort();
        let got: Vec<String> = ids.iter().map(|f| f.to_string()).collect();
        assert_eq!(got, vec!["T1-F2", "T1-F10", "T2-F1"]);
    }

    #[test]
    fn net_change_and_projection() {
        let u = Unit {
            unit_name: "Eng".into(),
            current_total_hc: 120,
            hc_growth_pct: 0.10,
            attrition_pct: 0.04,
            business_priority: Some(PriorityTier::High),
            seat_alloc_pct: None,
        };
        assert!((u.net_hc_change_pct() - 0.06).abs() < 1e-12);
        // 120 * (1 + 0.06/12 * 6) = 123.6
        assert!((u.projected_hc(6) - 123.6).abs() < 1e-9);
    }

    #[test]
    fn peak_ratio_guards_zero_median() {
        let a = AttendanceProfile {
            unit_name: "Eng".into(),
            monthly_median_hc: 0.0,
            monthly_max_hc: 10.0,
            avg_rto_days_per_week: 3.0,
            attendance_stability: None,
        };
        assert_eq!(a.peak_to_median_ratio(), 1.0);
    }

    #[test]
    fn adjacency_bonus_table() {
        assert_eq!(AdjacencyTier::SameFloor.bonus(), 100);
        assert_eq!(AdjacencyTier::Adjacent.bonus(), 60);
        assert_eq!(AdjacencyTier::SameTower.bonus(), 30);
        assert_eq!(AdjacencyTier::CrossTower.bonus(), 0);
        assert_eq!(AdjacencyTier::NewPlacement.bonus(), 0);
    }
}
