//! sp_engine — Scenario engine over the allocation/placement pipeline.
//!
//! The engine is single-threaded and synchronous: every entry point runs to
//! completion before returning. Shared mutable state is scoped to one
//! `Scenario` per simulation; simulations over different scenarios are
//! independent. The engine never inspects `Scenario::is_locked`: the lock
//! flag is an application-level guard, and callers must serialize writes per
//! scenario because a run rewrites the whole result set non-atomically.
//!
//! State is caller-owned: build one `PlanningContext` per user/session and
//! pass it by reference into every call. The context never changes behind
//! the caller's back; overlays are applied to copies.

#![forbid(unsafe_code)]

pub mod report;
pub mod scenario;

use std::collections::BTreeMap;

use thiserror::Error;

use sp_core::rules::PlanRules;
use sp_core::{AttendanceProfile, Floor, Unit};

// Re-export the pipeline surface so callers depend on one crate.
pub use report::{rto_alerts, rto_compliance, RtoAlert, RtoAlertStatus, RtoCompliance};
pub use scenario::{
    apply_floor_modifications, apply_overrides, compare_scenarios, run_scenario, RunOutcome,
    ScenarioDiff,
};
pub use sp_algo::{consolidation_suggestions, floor_utilization, FloorUtilization};
pub use sp_opt::{
    optimize, ObjectiveMode, OptimizationResult, OptimizeRequest, SavingsSummary, SolveStatus,
    UnitDelta,
};

/// Single error surface for engine orchestration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rules: {0}")]
    Rules(#[from] sp_core::CoreError),
    #[error("optimize: {0}")]
    Optimize(#[from] sp_opt::OptError),
}

/// Caller-owned planning state: base data plus validated rules.
///
/// One instance per user/session; never a process-wide global. Base records
/// are immutable here; scenario overlays operate on copies.
#[derive(Clone, Debug)]
pub struct PlanningContext {
    pub units: Vec<Unit>,
    pub attendance: BTreeMap<String, AttendanceProfile>,
    pub floors: Vec<Floor>,
    pub rules: PlanRules,
}

impl PlanningContext {
    /// Build a context from pre-validated records; rules are range-checked.
    pub fn new(
        units: Vec<Unit>,
        attendance: Vec<AttendanceProfile>,
        floors: Vec<Floor>,
        rules: PlanRules,
    ) -> Result<Self, EngineError> {
        let rules = rules.validated()?;
        let attendance = attendance
            .into_iter()
            .map(|a| (a.unit_name.clone(), a))
            .collect();
        Ok(Self { units, attendance, floors, rules })
    }

    /// Total base seat supply across all floors.
    pub fn total_supply(&self) -> u32 {
        self.floors.iter().map(|f| f.total_seats).sum()
    }

    /// Optimization path: re-place a scenario's last-run results with the
    /// solver, under the scenario's overlay (excluded floors, reduced
    /// capacities, overridden attendance). The scenario's stored assignments
    /// serve as the adjacency/delta baseline.
    pub fn optimize_placement(
        &self,
        scenario: &sp_core::Scenario,
        objective: ObjectiveMode,
    ) -> Result<OptimizationResult, EngineError> {
        let (_, attendance) = scenario::apply_overrides(&self.units, &self.attendance, scenario);
        let floors = scenario::apply_floor_modifications(&self.floors, scenario);
        let request = OptimizeRequest::new(
            &scenario.allocation_results,
            &self.units,
            &attendance,
            &floors,
            &scenario.floor_assignments,
            objective,
            &self.rules,
        );
        Ok(optimize(&request)?)
    }
}
