//! Deterministic audit of cost-estimate line items against official
//! reference price books.
//!
//! The pipeline is Resolver -> Calculator -> DiscrepancyAnalyzer: the
//! resolver pins the claim to an authoritative table position and
//! gathers applicable coefficients, the calculator re-derives the
//! expected cost, and the analyzer explains every divergence. The
//! [`AuditEngine`] facade runs all three and assembles the frozen
//! verdict.

pub(crate) mod analyzer;
pub(crate) mod calculator;
pub mod dataset;
pub mod domain;
pub mod matching;
pub mod policy;
pub(crate) mod resolver;
pub mod router;
pub mod store;

mod engine;

#[cfg(test)]
mod tests;

pub use domain::{
    AppliedCoefficient, AuditVerdict, CalculationBreakdown, Claim, ClaimedCoefficient,
    ConditionalCoefficient, Discrepancy, DiscrepancyKind, FormulaStrategy, Position,
    QuantityRange, ReferenceTable, ResolvedReference, Severity,
};
pub use engine::{AuditEngine, AuditError};
pub use matching::{SimilarityScorer, TokenSimilarity};
pub use policy::AuditPolicy;
pub use resolver::Resolver;
pub use router::audit_router;
pub use store::{MemoryReferenceStore, ReferenceStore, StoreError};
