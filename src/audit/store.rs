use std::collections::BTreeMap;

use super::domain::{ConditionalCoefficient, ReferenceTable};

/// Storage abstraction over the reference price book so the resolver
/// can be exercised against fixtures in isolation. Implementations must
/// be safe for concurrent reads; the engine never writes.
pub trait ReferenceStore: Send + Sync {
    /// Exact (code, year) lookup.
    fn find_table(&self, code: &str, year: i32) -> Result<Option<ReferenceTable>, StoreError>;
    /// Every edition year available for a code, any order.
    fn years_for(&self, code: &str) -> Result<Vec<i32>, StoreError>;
    /// Conditional coefficients whose applicability covers the code.
    fn coefficients_for(&self, code: &str) -> Result<Vec<ConditionalCoefficient>, StoreError>;
}

/// Error enumeration for reference store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reference store unavailable: {0}")]
    Unavailable(String),
}

/// In-memory store backed by a loaded reference dataset.
#[derive(Debug, Default, Clone)]
pub struct MemoryReferenceStore {
    tables: BTreeMap<(String, i32), ReferenceTable>,
    coefficients: Vec<ConditionalCoefficient>,
}

impl MemoryReferenceStore {
    pub fn new(
        tables: Vec<ReferenceTable>,
        coefficients: Vec<ConditionalCoefficient>,
    ) -> Self {
        let tables = tables
            .into_iter()
            .map(|table| ((table.code.clone(), table.year), table))
            .collect();
        Self {
            tables,
            coefficients,
        }
    }

    pub fn insert_table(&mut self, table: ReferenceTable) {
        self.tables
            .insert((table.code.clone(), table.year), table);
    }

    pub fn insert_coefficient(&mut self, coefficient: ConditionalCoefficient) {
        self.coefficients.push(coefficient);
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl ReferenceStore for MemoryReferenceStore {
    fn find_table(&self, code: &str, year: i32) -> Result<Option<ReferenceTable>, StoreError> {
        Ok(self.tables.get(&(code.to_string(), year)).cloned())
    }

    fn years_for(&self, code: &str) -> Result<Vec<i32>, StoreError> {
        Ok(self
            .tables
            .keys()
            .filter(|(table_code, _)| table_code == code)
            .map(|(_, year)| *year)
            .collect())
    }

    fn coefficients_for(&self, code: &str) -> Result<Vec<ConditionalCoefficient>, StoreError> {
        Ok(self
            .coefficients
            .iter()
            .filter(|coefficient| coefficient.applies_to(code))
            .cloned()
            .collect())
    }
}
