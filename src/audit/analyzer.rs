use serde_json::json;

use super::calculator::{is_stage_slot, render_formula, Calculation};
use super::domain::{
    round2, CalculationBreakdown, Claim, Discrepancy, DiscrepancyKind, ResolvedReference, Severity,
};
use super::policy::AuditPolicy;

/// Turns the resolved reference and calculator output into structured,
/// severity-tagged findings plus the calculation breakdown. Findings
/// are emitted independently of the approve/reject outcome.
pub struct DiscrepancyAnalyzer {
    policy: AuditPolicy,
}

impl DiscrepancyAnalyzer {
    pub fn new(policy: AuditPolicy) -> Self {
        Self { policy }
    }

    pub fn analyze(
        &self,
        claim: &Claim,
        reference: &ResolvedReference,
        calculation: &Calculation,
    ) -> Vec<Discrepancy> {
        let mut findings = Vec::new();

        self.check_year(claim, reference, &mut findings);
        self.check_constants(reference, calculation, &mut findings);
        self.check_claimed_coefficients(claim, &mut findings);
        self.check_quantity_range(claim, reference, &mut findings);
        self.check_deviation(calculation, &mut findings);

        findings
    }

    pub fn breakdown(
        &self,
        claim: &Claim,
        reference: &ResolvedReference,
        calculation: &Calculation,
    ) -> CalculationBreakdown {
        CalculationBreakdown {
            base_cost: round2(calculation.base),
            coefficients_applied: calculation.coefficients_applied.clone(),
            final_cost: round2(calculation.calculated_total),
            formula_text: render_formula(
                reference,
                claim.quantity,
                &calculation.coefficients_applied,
                calculation.calculated_total,
            ),
        }
    }

    /// The reference record's provenance year must agree with the
    /// claimed edition. Two independent signals: the trailing year
    /// token of the source position id, and the resolver's explicit
    /// edition substitution.
    fn check_year(
        &self,
        claim: &Claim,
        reference: &ResolvedReference,
        findings: &mut Vec<Discrepancy>,
    ) {
        let Some(claimed_year) = claim.year else {
            return;
        };

        if let Some(provenance_year) = trailing_year(&reference.source_position_id) {
            if provenance_year != claimed_year {
                findings.push(Discrepancy {
                    kind: DiscrepancyKind::YearMismatch,
                    severity: Severity::Critical,
                    message: format!(
                        "reference constants come from the {provenance_year} edition, claim asserts {claimed_year}"
                    ),
                    details: json!({
                        "claimed_year": claimed_year,
                        "reference_year": provenance_year,
                        "source_position_id": reference.source_position_id,
                    }),
                });
                return;
            }
        }

        if reference.year_fallback {
            findings.push(Discrepancy {
                kind: DiscrepancyKind::YearMismatch,
                severity: Severity::Critical,
                message: format!(
                    "no reference edition for {claimed_year}; audited against {} instead",
                    reference.resolved_year
                ),
                details: json!({
                    "claimed_year": claimed_year,
                    "reference_year": reference.resolved_year,
                    "substituted": true,
                }),
            });
        }
    }

    fn check_constants(
        &self,
        reference: &ResolvedReference,
        calculation: &Calculation,
        findings: &mut Vec<Discrepancy>,
    ) {
        if calculation.deviation_percent <= self.policy.tolerance_percent {
            return;
        }
        findings.push(Discrepancy {
            kind: DiscrepancyKind::ConstantMismatch,
            severity: Severity::Critical,
            message: format!(
                "computed cost disagrees with the claim; constants A={:.2}, B={:.2} may be from the wrong edition",
                reference.ref_a, reference.ref_b
            ),
            details: json!({
                "ref_a": reference.ref_a,
                "ref_b": reference.ref_b,
                "source_position_id": reference.source_position_id,
                "deviation_percent": round2(calculation.deviation_percent),
            }),
        });
    }

    /// Soft plausibility band, narrower than the hard validity band.
    /// Values outside it still participate; they are only flagged.
    fn check_claimed_coefficients(&self, claim: &Claim, findings: &mut Vec<Discrepancy>) {
        for coefficient in &claim.claimed_coefficients {
            let id = coefficient.id.as_deref().unwrap_or("");
            if is_stage_slot(id) {
                continue;
            }
            let Some(value) = coefficient.value else {
                continue;
            };
            if value < self.policy.coefficient_plausible_min
                || value > self.policy.coefficient_plausible_max
            {
                findings.push(Discrepancy {
                    kind: DiscrepancyKind::CoefficientUnusual,
                    severity: Severity::Warning,
                    message: format!(
                        "claimed coefficient {} = {:.2} is outside the usual {:.1}..{:.1} band",
                        if id.is_empty() { "(unnamed)" } else { id },
                        value,
                        self.policy.coefficient_plausible_min,
                        self.policy.coefficient_plausible_max,
                    ),
                    details: json!({
                        "coefficient_id": coefficient.id,
                        "value": value,
                        "plausible_min": self.policy.coefficient_plausible_min,
                        "plausible_max": self.policy.coefficient_plausible_max,
                    }),
                });
            }
        }
    }

    fn check_quantity_range(
        &self,
        claim: &Claim,
        reference: &ResolvedReference,
        findings: &mut Vec<Discrepancy>,
    ) {
        if claim.quantity >= reference.range_min && claim.quantity <= reference.range_max {
            return;
        }
        findings.push(Discrepancy {
            kind: DiscrepancyKind::ValueOutOfRange,
            severity: Severity::Warning,
            message: format!(
                "quantity {:.2} falls outside the reference range {:.2}..{:.2}; {} formula applied",
                claim.quantity,
                reference.range_min,
                reference.range_max,
                reference.formula_strategy.label()
            ),
            details: json!({
                "quantity": claim.quantity,
                "range_min": reference.range_min,
                "range_max": reference.range_max,
                "formula_strategy": reference.formula_strategy.label(),
            }),
        });
    }

    /// Restates the verdict's own deviation for reviewers who read the
    /// discrepancy list without the verdict header.
    fn check_deviation(&self, calculation: &Calculation, findings: &mut Vec<Discrepancy>) {
        if calculation.deviation_percent <= self.policy.tolerance_percent {
            return;
        }
        findings.push(Discrepancy {
            kind: DiscrepancyKind::CalculationDeviation,
            severity: Severity::Critical,
            message: format!(
                "calculated {:.2} vs claimed {:.2}: deviation {:.2} ({:.2}%) exceeds the {:.1}% tolerance",
                round2(calculation.calculated_total),
                round2(calculation.claimed_normalized),
                calculation.deviation,
                calculation.deviation_percent,
                self.policy.tolerance_percent,
            ),
            details: json!({
                "calculated_total": round2(calculation.calculated_total),
                "claimed_normalized": round2(calculation.claimed_normalized),
                "deviation": round2(calculation.deviation),
                "deviation_percent": round2(calculation.deviation_percent),
                "tolerance_percent": self.policy.tolerance_percent,
            }),
        });
    }
}

/// Trailing 4-digit year token of a position id, e.g. `tbl7-p24-2023`.
fn trailing_year(position_id: &str) -> Option<i32> {
    let token = position_id.rsplit(['-', '_']).next()?;
    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
