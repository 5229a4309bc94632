//! Loading of the external dataset file.
//!
//! The dataset is read-only reference data supplied by the hosting
//! application: a JSON array where the record for row `n` sits at index
//! `n - 1`. A missing or unreadable file is not fatal; placeholder records
//! covering every row substitute for it.

use std::path::Path;

use crate::format::error::FormatError;
use crate::model::{DatasetRecord, placeholder_records};

/// Parse a dataset payload.
pub fn parse_dataset(json: &str) -> Result<Vec<DatasetRecord>, FormatError> {
    let payload: serde_json::Value = serde_json::from_str(json)?;
    if !payload.is_array() {
        return Err(FormatError::invalid_format(
            "expected a JSON array of dataset records",
        ));
    }
    Ok(serde_json::from_value(payload)?)
}

/// Load the dataset from a file, substituting placeholders on any failure.
pub fn load_dataset(path: &Path, max_row: u32) -> Vec<DatasetRecord> {
    match std::fs::read_to_string(path) {
        Ok(json) => match parse_dataset(&json) {
            Ok(records) => {
                log::info!("Loaded {} dataset records from {:?}", records.len(), path);
                records
            }
            Err(e) => {
                log::warn!("Failed to parse dataset {:?}, using placeholders: {e}", path);
                placeholder_records(max_row)
            }
        },
        Err(e) => {
            log::warn!("Failed to read dataset {:?}, using placeholders: {e}", path);
            placeholder_records(max_row)
        }
    }
}
