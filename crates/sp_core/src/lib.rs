//! sp_core — Core types, planning-rule domains, and rounding helpers.
//!
//! This crate is **I/O-free**. It defines the stable types/APIs used across
//! the engine (`sp_algo`, `sp_opt`, `sp_engine`):
//!
//! - Entity records: `Unit`, `AttendanceProfile`, `Floor`, `FloorId`
//! - Result records: `AllocationRecommendation`, `FloorAssignment`
//! - Scenario overlay types: `Scenario`, `ScenarioOverride`, `ScenarioParams`
//! - Priority / adjacency domains with their fixed ordering and bonus tables
//! - Typed `PlanRules` with validated defaults and key→value construction
//! - Half-even rounding for fractional seat quantities
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        /// A rule value is outside its documented range (field name attached).
        DomainOutOfRange(&'static str),
        /// A rule value could not be parsed from its key→value form.
        InvalidValue(&'static str),
        /// `min_alloc_pct` exceeds `max_alloc_pct`.
        InvertedBounds,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
                CoreError::InvalidValue(k) => write!(f, "invalid value for: {k}"),
                CoreError::InvertedBounds => write!(f, "min_alloc_pct exceeds max_alloc_pct"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod entities;
pub mod rules;
pub mod rounding;

// Convenience re-exports (downstream crates import these from the crate root)
pub use entities::{
    AdjacencyTier, AllocationRecommendation, AttendanceProfile, Floor, FloorAssignment, FloorId,
    PriorityTier, Scenario, ScenarioKind, ScenarioOverride, ScenarioParams, Unit,
};
pub use errors::CoreError;
pub use rounding::{clamp_fraction, round_half_even};
pub use rules::{AllocationMode, PlanRules};
