use std::sync::Arc;

use tracing::info;

use super::analyzer::DiscrepancyAnalyzer;
use super::calculator::Calculator;
use super::domain::{round2, AuditVerdict, Claim};
use super::policy::AuditPolicy;
use super::resolver::Resolver;
use super::store::{ReferenceStore, StoreError};

/// Error raised while resolving or auditing a claim. None of these are
/// retried internally; each carries enough context to act on without
/// re-running the audit.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("no reference table exists for code '{code}' in any year")]
    TableNotFound { code: String },
    #[error("table '{code}' has no position {position_number}")]
    PositionNotFound { code: String, position_number: u32 },
    #[error("quantity {quantity} is outside every reference range of table '{code}'")]
    QuantityOutOfRange { code: String, quantity: f64 },
    #[error("mandatory input missing: {field}")]
    MissingInput { field: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Facade composing the resolver, calculator, and discrepancy analyzer
/// into one audit invocation. Stateless apart from reads against the
/// reference store, so audits may run concurrently without locking.
pub struct AuditEngine<S> {
    store: Arc<S>,
    resolver: Resolver,
    calculator: Calculator,
    analyzer: DiscrepancyAnalyzer,
}

impl<S: ReferenceStore> AuditEngine<S> {
    pub fn new(store: Arc<S>, policy: AuditPolicy) -> Self {
        Self {
            resolver: Resolver::new(policy.clone()),
            calculator: Calculator::new(policy.clone()),
            analyzer: DiscrepancyAnalyzer::new(policy),
            store,
        }
    }

    pub fn with_resolver(store: Arc<S>, policy: AuditPolicy, resolver: Resolver) -> Self {
        Self {
            resolver,
            calculator: Calculator::new(policy.clone()),
            analyzer: DiscrepancyAnalyzer::new(policy),
            store,
        }
    }

    /// Audit one claim end to end. Either returns a complete verdict or
    /// fails; a partially populated verdict is never produced.
    pub fn audit(&self, claim: &Claim) -> Result<AuditVerdict, AuditError> {
        validate(claim)?;

        let reference = self.resolver.resolve(self.store.as_ref(), claim)?;
        let calculation = self.calculator.run(&reference, claim);
        let discrepancies = self.analyzer.analyze(claim, &reference, &calculation);
        let calculation_breakdown = self.analyzer.breakdown(claim, &reference, &calculation);

        info!(
            code = %claim.table_code,
            approved = calculation.is_approved,
            discrepancies = discrepancies.len(),
            calculated_total = round2(calculation.calculated_total),
            "audit complete"
        );

        Ok(AuditVerdict {
            calculated_total: round2(calculation.calculated_total),
            is_approved: calculation.is_approved,
            reason: calculation.reason,
            discrepancies,
            calculation_breakdown,
        })
    }
}

/// Fail fast on claims missing mandatory fields instead of letting a
/// half-empty record reach the math.
fn validate(claim: &Claim) -> Result<(), AuditError> {
    if claim.table_code.trim().is_empty() {
        return Err(AuditError::MissingInput {
            field: "table_code".to_string(),
        });
    }
    if !claim.quantity.is_finite() {
        return Err(AuditError::MissingInput {
            field: "quantity".to_string(),
        });
    }
    if !claim.claimed_cost.is_finite() {
        return Err(AuditError::MissingInput {
            field: "claimed_cost".to_string(),
        });
    }
    Ok(())
}
