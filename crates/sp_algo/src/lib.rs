//! sp_algo — Algorithm layer: demand derivation, scarcity redistribution,
//! and spatial assignment. Depends only on `sp_core`.
//!
//! Pipeline order (baseline path): `demand` → `redistribute` → `spatial`.
//! All functions are pure and deterministic given the same inputs: maps are
//! keyed by `BTreeMap`, candidate floors are scanned in canonical `FloorId`
//! order, and stable sorts preserve input order on full ties.

#![forbid(unsafe_code)]

pub mod demand;
pub mod redistribute;
pub mod spatial;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use demand::{compute_all_demands, flat_demand, attendance_demand, default_profile};
pub use redistribute::distribute_seats;
pub use spatial::{
    assign_units_to_floors, compute_adjacency_tier, consolidation_suggestions,
    floor_utilization, FloorUtilization, PlacementOutcome,
};
