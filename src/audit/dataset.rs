use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::{ConditionalCoefficient, ReferenceTable};
use super::store::MemoryReferenceStore;

/// On-disk shape of a reference price book export: the table editions
/// plus the shared conditional coefficient catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDataset {
    pub tables: Vec<ReferenceTable>,
    #[serde(default)]
    pub coefficients: Vec<ConditionalCoefficient>,
}

impl ReferenceDataset {
    pub fn into_store(self) -> MemoryReferenceStore {
        MemoryReferenceStore::new(self.tables, self.coefficients)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read reference dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid reference dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reference dataset contains no tables")]
    Empty,
}

pub fn from_reader<R: Read>(reader: R) -> Result<MemoryReferenceStore, DatasetError> {
    let dataset: ReferenceDataset = serde_json::from_reader(reader)?;
    if dataset.tables.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(dataset.into_store())
}

pub fn from_path<P: AsRef<Path>>(path: P) -> Result<MemoryReferenceStore, DatasetError> {
    let file = File::open(path)?;
    from_reader(BufReader::new(file))
}
