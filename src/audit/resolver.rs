use tracing::{debug, warn};

use super::domain::{
    AppliedCoefficient, Claim, FormulaStrategy, Position, ReferenceTable, ResolvedReference,
};
use super::engine::AuditError;
use super::matching::{SimilarityScorer, TokenSimilarity};
use super::policy::AuditPolicy;
use super::store::ReferenceStore;

/// Resolves a claim to the authoritative reference record: the matching
/// table edition, the concrete position, the formula strategy, and
/// every applicable coefficient.
pub struct Resolver {
    policy: AuditPolicy,
    scorer: Box<dyn SimilarityScorer>,
}

impl Resolver {
    pub fn new(policy: AuditPolicy) -> Self {
        Self::with_scorer(policy, Box::new(TokenSimilarity))
    }

    pub fn with_scorer(policy: AuditPolicy, scorer: Box<dyn SimilarityScorer>) -> Self {
        Self { policy, scorer }
    }

    pub fn resolve<S: ReferenceStore>(
        &self,
        store: &S,
        claim: &Claim,
    ) -> Result<ResolvedReference, AuditError> {
        let (table, year_fallback) = self.find_table(store, claim)?;
        let (position, strategy) = self.match_position(&table, claim)?;

        let ref_a = position.param_a.ok_or_else(|| AuditError::MissingInput {
            field: format!("param_a on position {}", position.position_id),
        })?;
        let ref_b = position.param_b.ok_or_else(|| AuditError::MissingInput {
            field: format!("param_b on position {}", position.position_id),
        })?;

        let mut valid_coefficients = stage_coefficients(position);
        valid_coefficients.extend(self.match_tags(store, &claim.table_code, &claim.tags)?);

        let (range_min, range_max) = match position.range {
            Some(range) => (range.min, range.max),
            None => (claim.quantity, claim.quantity),
        };

        debug!(
            code = %claim.table_code,
            position = %position.position_id,
            strategy = strategy.label(),
            coefficients = valid_coefficients.len(),
            "claim resolved against reference"
        );

        Ok(ResolvedReference {
            ref_a,
            ref_b,
            range_min,
            range_max,
            formula_strategy: strategy,
            valid_coefficients,
            source_position_id: position.position_id.clone(),
            resolved_year: table.year,
            year_fallback,
        })
    }

    /// Exact (code, year) lookup with fallback to the newest available
    /// edition. The substitution is never silent: it is logged here and
    /// surfaced as a discrepancy downstream.
    fn find_table<S: ReferenceStore>(
        &self,
        store: &S,
        claim: &Claim,
    ) -> Result<(ReferenceTable, bool), AuditError> {
        if let Some(year) = claim.year {
            if let Some(table) = store.find_table(&claim.table_code, year)? {
                return Ok((table, false));
            }
        }

        let mut years = store.years_for(&claim.table_code)?;
        years.sort_unstable();
        let latest = *years.last().ok_or_else(|| AuditError::TableNotFound {
            code: claim.table_code.clone(),
        })?;

        let table = store
            .find_table(&claim.table_code, latest)?
            .ok_or_else(|| AuditError::TableNotFound {
                code: claim.table_code.clone(),
            })?;

        let substituted = claim.year.is_some_and(|year| year != latest);
        if substituted {
            warn!(
                code = %claim.table_code,
                claimed_year = ?claim.year,
                resolved_year = latest,
                "reference edition for claimed year is missing, using newest available"
            );
        }

        Ok((table, substituted))
    }

    fn match_position<'t>(
        &self,
        table: &'t ReferenceTable,
        claim: &Claim,
    ) -> Result<(&'t Position, FormulaStrategy), AuditError> {
        let rows: Vec<&Position> = table
            .positions
            .iter()
            .filter(|position| !position.is_subtitle)
            .collect();

        match claim.position_number {
            Some(number) => {
                let position = rows
                    .iter()
                    .copied()
                    .find(|position| position.position_number == Some(number))
                    .ok_or_else(|| AuditError::PositionNotFound {
                        code: table.code.clone(),
                        position_number: number,
                    })?;
                Ok((position, FormulaStrategy::Standard))
            }
            None => self.match_by_range(table, &rows, claim.quantity),
        }
    }

    /// Range-indexed matching: interval containment first, then the
    /// extrapolation policy for quantities beyond the table.
    fn match_by_range<'t>(
        &self,
        table: &ReferenceTable,
        rows: &[&'t Position],
        quantity: f64,
    ) -> Result<(&'t Position, FormulaStrategy), AuditError> {
        let ranged: Vec<&'t Position> = rows
            .iter()
            .copied()
            .filter(|p| p.range.is_some())
            .collect();

        if let Some(position) = ranged
            .iter()
            .copied()
            .find(|p| p.range.is_some_and(|range| range.contains(quantity)))
        {
            return Ok((position, FormulaStrategy::Standard));
        }

        let highest = ranged
            .iter()
            .copied()
            .max_by(|a, b| {
                let a_max = a.range.map(|r| r.max).unwrap_or(f64::NEG_INFINITY);
                let b_max = b.range.map(|r| r.max).unwrap_or(f64::NEG_INFINITY);
                a_max.total_cmp(&b_max)
            });
        if let Some(position) = highest {
            if position.range.is_some_and(|range| quantity > range.max) {
                return Ok((position, FormulaStrategy::ExtrapolateAbove));
            }
        }

        let lowest = ranged
            .iter()
            .copied()
            .min_by(|a, b| {
                let a_min = a.range.map(|r| r.min).unwrap_or(f64::INFINITY);
                let b_min = b.range.map(|r| r.min).unwrap_or(f64::INFINITY);
                a_min.total_cmp(&b_min)
            });
        if let Some(position) = lowest {
            let below_all = position.range.is_some_and(|range| quantity < range.min);
            if below_all && self.policy.extrapolate_below {
                return Ok((position, FormulaStrategy::ExtrapolateBelow));
            }
        }

        // Either below every minimum without an extrapolation policy,
        // or inside a gap between ranges.
        Err(AuditError::QuantityOutOfRange {
            code: table.code.clone(),
            quantity,
        })
    }

    /// Inclusive conditional-coefficient matching: every coefficient
    /// any tag resembles closely enough is stacked, because independent
    /// conditions (seismicity, soil, structure type) legitimately
    /// combine.
    fn match_tags<S: ReferenceStore>(
        &self,
        store: &S,
        code: &str,
        tags: &[String],
    ) -> Result<Vec<AppliedCoefficient>, AuditError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let mut matched = Vec::new();
        for coefficient in store.coefficients_for(code)? {
            if coefficient.condition_text.trim().is_empty() {
                continue;
            }
            let applicable = tags.iter().any(|tag| {
                self.scorer.score(tag, &coefficient.condition_text)
                    >= self.policy.similarity_threshold
            });
            if applicable {
                matched.push(AppliedCoefficient {
                    id: coefficient.id.clone(),
                    value: coefficient.value,
                    rationale: coefficient.condition_text.clone(),
                });
            }
        }
        Ok(matched)
    }
}

/// Stage 2 reflects the more advanced design phase and supersedes
/// stage 1 when both are present on a position.
fn stage_coefficients(position: &Position) -> Vec<AppliedCoefficient> {
    if let Some(value) = position.stage_coefficient_2 {
        return vec![AppliedCoefficient {
            id: "K2".to_string(),
            value,
            rationale: format!(
                "stage 2 design coefficient from reference position {}",
                position.position_id
            ),
        }];
    }
    if let Some(value) = position.stage_coefficient_1 {
        return vec![AppliedCoefficient {
            id: "K1".to_string(),
            value,
            rationale: format!(
                "stage 1 design coefficient from reference position {}",
                position.position_id
            ),
        }];
    }
    Vec::new()
}
