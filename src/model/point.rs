//! Point model types and interaction state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, stable identifier for a placed point.
///
/// Ids are opaque strings on the wire; freshly generated for every point the
/// engine creates, including every point taken in through bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(Uuid);

impl PointId {
    /// Generate a new unique id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A placed marker bound to one dataset row.
///
/// Coordinates are image-space pixels, independent of the current viewport.
/// `size` is the nominal on-screen diameter at scale = 1; the scene layer
/// divides it by the viewport scale so markers keep a constant apparent size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Unique identifier.
    pub id: PointId,
    /// Image-space X coordinate.
    pub x: f64,
    /// Image-space Y coordinate.
    pub y: f64,
    /// Nominal on-screen diameter in pixels at scale = 1.
    pub size: f64,
    /// 1-based dataset row this point is bound to. Unique across all points.
    #[serde(rename = "rowNum")]
    pub row_num: u32,
}

impl Point {
    /// Create a new point with a freshly generated id.
    pub fn new(x: f64, y: f64, size: f64, row_num: u32) -> Self {
        Self {
            id: PointId::new(),
            x,
            y,
            size,
            row_num,
        }
    }

    /// Distance from this point to an image-space position.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Pointer interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Clicks place new points (or select existing ones).
    Draw,
    /// Drags pan the viewport.
    #[default]
    Pan,
}

impl InteractionMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::Draw => "Draw",
            InteractionMode::Pan => "Pan",
        }
    }

    /// Get all interaction modes.
    pub fn all() -> &'static [InteractionMode] {
        &[InteractionMode::Draw, InteractionMode::Pan]
    }
}

/// Transient pointer-drag state for panning.
///
/// Lives only within a single pointer-down to pointer-up sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanDrag {
    active: bool,
    last_pos: Option<(f64, f64)>,
}

impl PanDrag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start a drag at a screen position.
    pub fn start(&mut self, x: f64, y: f64) {
        self.active = true;
        self.last_pos = Some((x, y));
    }

    /// Update the drag position and return the delta since the last update.
    pub fn update(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.active {
            if let Some((lx, ly)) = self.last_pos {
                self.last_pos = Some((x, y));
                return Some((x - lx, y - ly));
            }
        }
        None
    }

    /// End the drag.
    pub fn end(&mut self) {
        self.active = false;
        self.last_pos = None;
    }
}
