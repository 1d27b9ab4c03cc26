use serde::{Deserialize, Serialize};

/// Policy constants governing resolution and verdict math. The defaults
/// mirror the published price-book rules; deployments override them via
/// configuration rather than code edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    /// Claims within this deviation percentage are approved.
    pub tolerance_percent: f64,
    /// Minimum tag/condition similarity (0-100) for a conditional
    /// coefficient to apply.
    pub similarity_threshold: u8,
    /// Hard validity band; coefficients outside it are dropped from the
    /// product entirely.
    pub coefficient_hard_min: f64,
    pub coefficient_hard_max: f64,
    /// Plausibility band; claim-side values outside it are flagged as
    /// unusual but still participate.
    pub coefficient_plausible_min: f64,
    pub coefficient_plausible_max: f64,
    /// Claimed costs above this magnitude are assumed to be in base
    /// currency units and divided by 1000 before comparison. Known
    /// ambiguity: the claim carries no unit field.
    pub thousands_threshold: f64,
    /// Whether quantities below every position's minimum extrapolate
    /// instead of failing.
    pub extrapolate_below: bool,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            tolerance_percent: 5.0,
            similarity_threshold: 65,
            coefficient_hard_min: 0.1,
            coefficient_hard_max: 10.0,
            coefficient_plausible_min: 0.5,
            coefficient_plausible_max: 3.0,
            thousands_threshold: 1_000_000.0,
            extrapolate_below: false,
        }
    }
}
