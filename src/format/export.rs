//! Export of points merged with their external dataset records.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::error::FormatError;
use crate::model::{DatasetRecord, Point, SignalMap};

/// Wire format of one exported point.
///
/// `row`/`x`/`y`/`size` always come from the point; `plate` and `signals`
/// are merged in from the dataset record for that row when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPoint {
    pub row: u32,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalMap>,
}

/// Build the export records for a point set.
///
/// The dataset is indexed by row (the record for row `n` is at `n - 1`);
/// points without a matching record export with no extra fields.
pub fn export_records(points: &[Point], dataset: &[DatasetRecord]) -> Vec<ExportedPoint> {
    points
        .iter()
        .map(|point| {
            let record = dataset.get(point.row_num as usize - 1);
            ExportedPoint {
                row: point.row_num,
                x: point.x,
                y: point.y,
                size: point.size,
                plate: record.map(|r| r.plate.clone()),
                signals: record.map(|r| r.signals.clone()),
            }
        })
        .collect()
}

/// Serialize a point set (with merged dataset fields) to JSON.
pub fn export_json(points: &[Point], dataset: &[DatasetRecord]) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(&export_records(
        points, dataset,
    ))?)
}

/// Write an export file.
pub fn write_points(
    path: &Path,
    points: &[Point],
    dataset: &[DatasetRecord],
) -> Result<(), FormatError> {
    log::info!("Exporting {} points to {:?}", points.len(), path);
    let json = export_json(points, dataset)?;
    std::fs::write(path, json)?;
    Ok(())
}
