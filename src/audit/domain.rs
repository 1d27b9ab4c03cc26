use serde::{Deserialize, Serialize};

/// One cost-estimate line item as extracted upstream. Optional fields
/// are genuinely unknown when absent, never implied zeroes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub table_code: String,
    #[serde(default)]
    pub position_number: Option<u32>,
    pub quantity: f64,
    pub claimed_cost: f64,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub claimed_coefficients: Vec<ClaimedCoefficient>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Coefficient asserted by the claimant. Extraction can fail partway,
/// so every field tolerates absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedCoefficient {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl ClaimedCoefficient {
    /// A coefficient participates in the product only when its value is
    /// present and inside the hard validity band.
    pub fn is_valid(&self, hard_min: f64, hard_max: f64) -> bool {
        matches!(self.value, Some(value) if value >= hard_min && value <= hard_max)
    }
}

/// Reference price-book table, uniquely identified by (code, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub code: String,
    pub year: i32,
    pub name: String,
    pub positions: Vec<Position>,
}

/// Valid quantity interval for a range-indexed position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityRange {
    pub min: f64,
    pub max: f64,
}

impl QuantityRange {
    pub fn contains(&self, quantity: f64) -> bool {
        self.min <= quantity && quantity <= self.max
    }
}

/// Single row of a reference table. Subtitle rows carry no constants
/// and are skipped during matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub position_number: Option<u32>,
    #[serde(default)]
    pub param_a: Option<f64>,
    #[serde(default)]
    pub param_b: Option<f64>,
    #[serde(default)]
    pub range: Option<QuantityRange>,
    #[serde(default)]
    pub stage_coefficient_1: Option<f64>,
    #[serde(default)]
    pub stage_coefficient_2: Option<f64>,
    #[serde(default)]
    pub is_subtitle: bool,
    pub position_id: String,
}

/// Adjustment factor keyed by applicability code, matched against claim
/// tags by text similarity rather than exact lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalCoefficient {
    pub id: String,
    pub applicability_codes: Vec<String>,
    pub condition_text: String,
    pub value: f64,
}

impl ConditionalCoefficient {
    pub fn applies_to(&self, code: &str) -> bool {
        self.applicability_codes.iter().any(|c| c == code)
    }
}

/// Which variant of the cost formula the resolver selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaStrategy {
    Standard,
    ExtrapolateAbove,
    ExtrapolateBelow,
}

impl FormulaStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            FormulaStrategy::Standard => "standard",
            FormulaStrategy::ExtrapolateAbove => "extrapolate_above",
            FormulaStrategy::ExtrapolateBelow => "extrapolate_below",
        }
    }
}

/// Coefficient admitted into the multiplier, with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoefficient {
    pub id: String,
    pub value: f64,
    pub rationale: String,
}

/// Resolver output: everything the calculator needs, frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub ref_a: f64,
    pub ref_b: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub formula_strategy: FormulaStrategy,
    pub valid_coefficients: Vec<AppliedCoefficient>,
    pub source_position_id: String,
    pub resolved_year: i32,
    pub year_fallback: bool,
}

/// Severity ranking for discrepancy findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
        }
    }
}

/// Categories of divergence between claim and reference expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    YearMismatch,
    ConstantMismatch,
    CoefficientUnusual,
    ValueOutOfRange,
    CalculationDeviation,
}

impl DiscrepancyKind {
    pub const fn label(self) -> &'static str {
        match self {
            DiscrepancyKind::YearMismatch => "year_mismatch",
            DiscrepancyKind::ConstantMismatch => "constant_mismatch",
            DiscrepancyKind::CoefficientUnusual => "coefficient_unusual",
            DiscrepancyKind::ValueOutOfRange => "value_out_of_range",
            DiscrepancyKind::CalculationDeviation => "calculation_deviation",
        }
    }
}

/// Structured finding with enough detail to reconstruct it without
/// re-running the audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub severity: Severity,
    pub message: String,
    pub details: serde_json::Value,
}

/// Reproducible record of how the expected cost was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationBreakdown {
    pub base_cost: f64,
    pub coefficients_applied: Vec<AppliedCoefficient>,
    pub final_cost: f64,
    pub formula_text: String,
}

/// Terminal artifact of an audit run. Assembled once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub calculated_total: f64,
    pub is_approved: bool,
    pub reason: String,
    pub discrepancies: Vec<Discrepancy>,
    pub calculation_breakdown: CalculationBreakdown,
}

/// Round at the reporting boundary; internal math keeps full precision.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
