//! Typed planning rules with validated defaults.
//!
//! The external interface is a flat key→value map produced by the loader
//! layer; `PlanRules::from_kv` recognizes the documented keys, ignores
//! unknown ones, and falls back to defaults for missing ones. Ranges are
//! validated once at construction; downstream code never re-checks.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ----------------------------- Fixed domain constants -----------------------------

/// Working days per week for RTO ratio computation.
pub const WORKING_DAYS_PER_WEEK: f64 = 5.0;
/// Assumed RTO days when a unit has no attendance profile.
pub const FALLBACK_RTO_DAYS: f64 = 3.0;
/// Spatial scoring: weight on remaining floor capacity.
pub const CAPACITY_SCORE_WEIGHT: i64 = 10;
/// Spatial scoring: penalty per floor a unit already occupies.
pub const FRAGMENTATION_PENALTY_PER_FLOOR: i64 = 30;
/// Reference seats-per-floor used by the fragmentation score.
pub const IDEAL_FLOOR_CAPACITY: f64 = 120.0;
/// Reporting: floor utilization above this is saturated.
pub const FLOOR_SATURATION_THRESHOLD: f64 = 0.90;
/// Reporting: floor utilization below this is surplus capacity.
pub const FLOOR_SURPLUS_THRESHOLD: f64 = 0.80;
/// Reporting: relative seat gap below this flags a unit shortfall.
pub const UNIT_SHORTFALL_THRESHOLD: f64 = -0.10;

// ----------------------------- Mode & rules -----------------------------

/// Demand derivation mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AllocationMode {
    /// Flat allocation fraction (global default or per-unit override).
    #[default]
    Simple,
    /// Attendance-derived fraction (median/peak/RTO formula).
    Advanced,
}

/// Validated planning rules. Construct via `Default`, a struct literal
/// checked by `validated()`, or `from_kv` for the flat map interface.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanRules {
    pub mode: AllocationMode,
    /// Flat-mode default allocation fraction.
    pub global_alloc_pct: f64,
    /// Policy floor for the recommended fraction.
    pub min_alloc_pct: f64,
    /// Policy ceiling for the recommended fraction.
    pub max_alloc_pct: f64,
    /// Stability above this discounts the peak buffer.
    pub stability_discount_threshold: f64,
    /// Fraction of the peak buffer removed for stable units.
    pub stability_discount_factor: f64,
    pub peak_buffer_multiplier: f64,
    /// Fraction of shrinkage released back to the pool under scarcity.
    pub shrink_contribution_factor: f64,
    /// Relative over-allocation above which a unit is under-utilized.
    pub rto_utilization_threshold: f64,
}

impl Default for PlanRules {
    fn default() -> Self {
        Self {
            mode: AllocationMode::Simple,
            global_alloc_pct: 0.80,
            min_alloc_pct: 0.20,
            max_alloc_pct: 1.50,
            stability_discount_threshold: 0.70,
            stability_discount_factor: 0.30,
            peak_buffer_multiplier: 1.0,
            shrink_contribution_factor: 0.50,
            rto_utilization_threshold: 0.20,
        }
    }
}

impl PlanRules {
    /// Range-check every field; returns `self` unchanged on success.
    pub fn validated(self) -> Result<Self, CoreError> {
        fn unit_interval(v: f64, name: &'static str) -> Result<(), CoreError> {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(CoreError::DomainOutOfRange(name))
            }
        }
        fn nonneg(v: f64, name: &'static str) -> Result<(), CoreError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(CoreError::DomainOutOfRange(name))
            }
        }

        nonneg(self.global_alloc_pct, "global_alloc_pct")?;
        nonneg(self.min_alloc_pct, "min_alloc_pct")?;
        nonneg(self.max_alloc_pct, "max_alloc_pct")?;
        if self.min_alloc_pct > self.max_alloc_pct {
            return Err(CoreError::InvertedBounds);
        }
        unit_interval(self.stability_discount_threshold, "stability_discount_threshold")?;
        unit_interval(self.stability_discount_factor, "stability_discount_factor")?;
        nonneg(self.peak_buffer_multiplier, "peak_buffer_multiplier")?;
        unit_interval(self.shrink_contribution_factor, "shrink_contribution_factor")?;
        nonneg(self.rto_utilization_threshold, "rto_utilization_threshold")?;
        Ok(self)
    }

    /// Build rules from the loader's flat key→value map.
    ///
    /// Recognized keys: `allocation_mode` {simple|advanced},
    /// `global_alloc_pct`, `min_alloc_pct`, `max_alloc_pct`,
    /// `stability_discount_threshold`, `stability_discount_factor`,
    /// `peak_buffer_multiplier`, `shrink_contribution_factor`,
    /// `rto_utilization_threshold`. Unknown keys are ignored; missing keys
    /// keep their defaults. Values that fail to parse are an error (a typo'd
    /// number should not silently become a default).
    pub fn from_kv(kv: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let mut rules = PlanRules::default();

        if let Some(v) = kv.get("allocation_mode") {
            rules.mode = match v.as_str() {
                "simple" => AllocationMode::Simple,
                "advanced" => AllocationMode::Advanced,
                _ => return Err(CoreError::InvalidValue("allocation_mode")),
            };
        }

        fn parse_f64(
            kv: &BTreeMap<String, String>,
            key: &'static str,
            slot: &mut f64,
        ) -> Result<(), CoreError> {
            if let Some(v) = kv.get(key) {
                *slot = v.parse::<f64>().map_err(|_| CoreError::InvalidValue(key))?;
            }
            Ok(())
        }

        parse_f64(kv, "global_alloc_pct", &mut rules.global_alloc_pct)?;
        parse_f64(kv, "min_alloc_pct", &mut rules.min_alloc_pct)?;
        parse_f64(kv, "max_alloc_pct", &mut rules.max_alloc_pct)?;
        parse_f64(kv, "stability_discount_threshold", &mut rules.stability_discount_threshold)?;
        parse_f64(kv, "stability_discount_factor", &mut rules.stability_discount_factor)?;
        parse_f64(kv, "peak_buffer_multiplier", &mut rules.peak_buffer_multiplier)?;
        parse_f64(kv, "shrink_contribution_factor", &mut rules.shrink_contribution_factor)?;
        parse_f64(kv, "rto_utilization_threshold", &mut rules.rto_utilization_threshold)?;

        rules.validated()
    }
}

/* ---------------------------------- Tests --------------------------------- */
