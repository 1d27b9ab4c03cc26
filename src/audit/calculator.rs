use super::domain::{round2, AppliedCoefficient, Claim, FormulaStrategy, ResolvedReference};
use super::policy::AuditPolicy;

/// Deterministic verdict math: base formula, coefficient composition,
/// unit normalization, and tolerance comparison. No I/O, no state.
pub struct Calculator {
    policy: AuditPolicy,
}

/// Intermediate values handed to the discrepancy analyzer so findings
/// never recompute anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub base: f64,
    pub multiplier: f64,
    pub coefficients_applied: Vec<AppliedCoefficient>,
    pub calculated_total: f64,
    pub claimed_normalized: f64,
    pub deviation: f64,
    pub deviation_percent: f64,
    pub is_approved: bool,
    pub reason: String,
}

impl Calculator {
    pub fn new(policy: AuditPolicy) -> Self {
        Self { policy }
    }

    pub fn run(&self, reference: &ResolvedReference, claim: &Claim) -> Calculation {
        let base = compute_base(reference, claim.quantity);
        let coefficients_applied = self.compose_coefficients(reference, claim);
        let multiplier: f64 = coefficients_applied
            .iter()
            .map(|coefficient| coefficient.value)
            .product();
        let calculated_total = base * multiplier;

        let claimed_normalized = self.normalize_claimed(claim.claimed_cost);
        let deviation = (calculated_total - claimed_normalized).abs();
        // Percent against the claim's magnitude: a negative claimed
        // cost must not flip the sign of the percentage and slip under
        // the tolerance. Zero claimed cost is 0% by convention.
        let deviation_percent = if claimed_normalized == 0.0 {
            0.0
        } else {
            deviation / claimed_normalized.abs() * 100.0
        };

        let tolerance = self.policy.tolerance_percent;
        let is_approved = deviation_percent <= tolerance;
        let reason = if is_approved {
            format!(
                "claim within tolerance: deviation {:.2} ({:.2}% <= {:.1}%)",
                deviation, deviation_percent, tolerance
            )
        } else {
            format!(
                "claim deviates by {:.2} ({:.2}% > {:.1}%)",
                deviation, deviation_percent, tolerance
            )
        };

        Calculation {
            base,
            multiplier,
            coefficients_applied,
            calculated_total,
            claimed_normalized,
            deviation,
            deviation_percent,
            is_approved,
            reason,
        }
    }

    /// Union of reference-resolved and claim-supplied coefficients.
    /// Claim-side stage slots are excluded because the resolver already
    /// supplies them from the reference table; out-of-band values are
    /// dropped rather than clamped.
    fn compose_coefficients(
        &self,
        reference: &ResolvedReference,
        claim: &Claim,
    ) -> Vec<AppliedCoefficient> {
        let hard_min = self.policy.coefficient_hard_min;
        let hard_max = self.policy.coefficient_hard_max;

        let mut applied: Vec<AppliedCoefficient> = reference
            .valid_coefficients
            .iter()
            .filter(|coefficient| coefficient.value >= hard_min && coefficient.value <= hard_max)
            .cloned()
            .collect();

        for claimed in &claim.claimed_coefficients {
            if !claimed.is_valid(hard_min, hard_max) {
                continue;
            }
            let id = claimed.id.as_deref().unwrap_or("");
            if is_stage_slot(id) {
                continue;
            }
            let value = claimed.value.unwrap_or(1.0);
            applied.push(AppliedCoefficient {
                id: if id.is_empty() {
                    "claimed".to_string()
                } else {
                    id.to_string()
                },
                value,
                rationale: claimed
                    .rationale
                    .clone()
                    .unwrap_or_else(|| "declared in the estimate".to_string()),
            });
        }

        applied
    }

    fn normalize_claimed(&self, claimed_cost: f64) -> f64 {
        if claimed_cost > self.policy.thousands_threshold {
            claimed_cost / 1000.0
        } else {
            claimed_cost
        }
    }
}

/// Expected cost before coefficients. Out-of-range quantities use a
/// blend that anchors 40%/60% on the table boundary so extreme claims
/// stay tethered to observed data.
pub fn compute_base(reference: &ResolvedReference, quantity: f64) -> f64 {
    let a = reference.ref_a;
    let b = reference.ref_b;
    match reference.formula_strategy {
        FormulaStrategy::Standard => a + b * quantity,
        FormulaStrategy::ExtrapolateAbove => {
            a + b * (0.4 * reference.range_max + 0.6 * quantity)
        }
        FormulaStrategy::ExtrapolateBelow => {
            a + b * (0.6 * reference.range_min + 0.4 * quantity)
        }
    }
}

/// Stage slots 1 and 2 under any accepted alias, Latin or Cyrillic,
/// case-insensitive. These must never double-count against the
/// resolver-supplied stage coefficient.
pub fn is_stage_slot(id: &str) -> bool {
    let id = id.trim().to_lowercase();
    matches!(id.as_str(), "k1" | "k2" | "к1" | "к2")
}

/// Render the reproducible formula line for the breakdown record.
pub fn render_formula(
    reference: &ResolvedReference,
    quantity: f64,
    coefficients: &[AppliedCoefficient],
    final_cost: f64,
) -> String {
    let mut text = format!(
        "({:.2} + {:.2} × {:.2})",
        reference.ref_a, reference.ref_b, quantity
    );
    for coefficient in coefficients {
        text.push_str(&format!(" × {:.2}", coefficient.value));
    }
    text.push_str(&format!(" = {:.2}", round2(final_cost)));
    text
}
