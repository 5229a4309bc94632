//! Interchange formats: point import/export and dataset loading.

mod dataset;
mod error;
mod export;
mod import;

#[cfg(test)]
mod tests;

pub use dataset::{load_dataset, parse_dataset};
pub use error::FormatError;
pub use export::{ExportedPoint, export_json, export_records, write_points};
pub use import::{parse_points, read_points};
