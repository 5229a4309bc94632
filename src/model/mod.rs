//! Core data model: points, interaction state, dataset records.

mod dataset;
mod point;

pub use dataset::{
    DatasetRecord, PLACEHOLDER_CHANNEL, PLACEHOLDER_SIGNAL, SignalMap, placeholder_records,
};
pub use point::{InteractionMode, PanDrag, Point, PointId};
