//! Import of user-supplied point files.
//!
//! The import format is a JSON array of items carrying `rowNum` (legacy
//! files use `row`), `x`, `y`, and optionally `size`. Parsing validates the
//! payload shape before anything touches the store, so a malformed file
//! never causes a partial update.

use std::path::Path;

use serde::Deserialize;

use crate::format::error::FormatError;
use crate::store::ImportedPoint;

/// Wire format of one import item.
#[derive(Debug, Deserialize)]
struct ImportItem {
    #[serde(rename = "rowNum", alias = "row")]
    row_num: i64,
    x: f64,
    y: f64,
    #[serde(default)]
    size: Option<f64>,
}

/// Parse an import payload into candidate points.
///
/// Non-array payloads are rejected outright. Items missing a required field
/// are dropped with a warning; items whose row cannot be a valid row number
/// are dropped silently (the store range-checks the rest). Caller-supplied
/// ids are ignored entirely.
pub fn parse_points(json: &str) -> Result<Vec<ImportedPoint>, FormatError> {
    let payload: serde_json::Value = serde_json::from_str(json)?;

    let serde_json::Value::Array(items) = payload else {
        return Err(FormatError::invalid_format(
            "expected a JSON array of points",
        ));
    };

    let mut points = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let item: ImportItem = match serde_json::from_value(item) {
            Ok(item) => item,
            Err(e) => {
                log::warn!("Import: skipping malformed item {index}: {e}");
                continue;
            }
        };

        let Ok(row_num) = u32::try_from(item.row_num) else {
            log::debug!("Import: dropping item {index} with row {}", item.row_num);
            continue;
        };

        points.push(ImportedPoint {
            row_num,
            x: item.x,
            y: item.y,
            size: item.size,
        });
    }

    Ok(points)
}

/// Read and parse an import file.
pub fn read_points(path: &Path) -> Result<Vec<ImportedPoint>, FormatError> {
    log::info!("Importing points from {:?}", path);
    let json = std::fs::read_to_string(path)?;
    parse_points(&json)
}
