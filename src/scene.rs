//! Scene synchronization between the point model and rendered markers.
//!
//! The synchronizer listens to store events and reconciles an opaque set of
//! marker handles owned by the rendering layer: no orphaned visuals, no
//! missing visuals, correct screen size, correct highlight. Marker geometry
//! lives in the image layer's local coordinate system, which the viewport
//! scales as a whole; dividing nominal sizes by the viewport scale therefore
//! keeps markers at a constant apparent size while the image zooms.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use thiserror::Error;

use crate::constants::{MARKER_LABEL_SIZE, MARKER_STROKE_WIDTH};
use crate::model::{InteractionMode, Point, PointId};
use crate::store::{PointStore, StoreError, StoreEvent};

/// Opaque handle to one rendered marker, chosen by the backend.
pub type MarkerHandle = u64;

/// Geometry for one marker, in the image layer's local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerMetrics {
    /// Marker center X (image space).
    pub x: f64,
    /// Marker center Y (image space).
    pub y: f64,
    /// Visual radius: nominal size divided by the viewport scale.
    pub radius: f64,
    /// Stroke width, counter-scaled like the radius.
    pub stroke_width: f64,
    /// Label font size, counter-scaled like the radius.
    pub label_size: f64,
}

impl MarkerMetrics {
    /// Metrics for a point at the given viewport scale.
    pub fn for_point(point: &Point, scale: f64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            radius: point.size / scale,
            stroke_width: MARKER_STROKE_WIDTH / scale,
            label_size: MARKER_LABEL_SIZE / scale,
        }
    }
}

/// Rendering-layer seam: creates, destroys, and restyles marker visuals.
///
/// The synchronizer owns the point-id to handle mapping and only ever talks
/// to the renderer through this trait; it never holds renderer objects.
pub trait MarkerBackend {
    /// Create a marker for a point. The returned handle identifies it in all
    /// later calls.
    fn create_marker(
        &mut self,
        point: &Point,
        metrics: &MarkerMetrics,
        selected: bool,
    ) -> MarkerHandle;

    /// Destroy a marker.
    fn destroy_marker(&mut self, handle: MarkerHandle);

    /// Update a marker's geometry.
    fn update_marker(&mut self, handle: MarkerHandle, metrics: &MarkerMetrics);

    /// Apply or remove the selected visual treatment.
    fn set_selected(&mut self, handle: MarkerHandle, selected: bool);
}

/// Reasons a placement attempt is refused. State is never changed.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Placement only happens in draw mode
    #[error("switch to draw mode to place points")]
    NotInDrawMode,

    /// The pointer is over an existing marker, not the background
    #[error("an existing marker is under the pointer")]
    MarkerUnderCursor,

    /// Row already taken or out of range
    #[error(transparent)]
    Model(#[from] StoreError),
}

/// Keeps rendered markers in lockstep with the store.
pub struct SceneSynchronizer {
    events: Receiver<StoreEvent>,
    markers: HashMap<PointId, MarkerHandle>,
    /// Marker currently shown with the selected treatment.
    selected: Option<PointId>,
}

impl SceneSynchronizer {
    /// Create a synchronizer subscribed to the store's events.
    pub fn new(store: &mut PointStore) -> Self {
        Self {
            events: store.subscribe(),
            markers: HashMap::new(),
            selected: None,
        }
    }

    /// Number of markers currently rendered.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Drain pending store events and reconcile the scene.
    pub fn process(&mut self, store: &PointStore, backend: &mut dyn MarkerBackend) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                StoreEvent::PointsChanged => self.diff_points(store, backend),
                StoreEvent::PointsReplaced => self.rebuild(store, backend),
                StoreEvent::ViewportChanged => self.rescale_markers(store, backend),
                StoreEvent::SelectionChanged => self.apply_selection(store, backend),
                StoreEvent::ModeChanged => {}
            }
        }
    }

    /// Full idempotent reconciliation: afterwards the scene reflects the
    /// store exactly, regardless of any missed events.
    pub fn resync(&mut self, store: &PointStore, backend: &mut dyn MarkerBackend) {
        // Pending increments are subsumed by the rebuild.
        while self.events.try_recv().is_ok() {}
        self.rebuild(store, backend);
    }

    /// Find the marker under an image-space position, if any.
    ///
    /// Uses each marker's current visual radius, so the clickable area
    /// matches what is on screen at the current zoom level.
    pub fn hit_test(&self, store: &PointStore, image_x: f64, image_y: f64) -> Option<PointId> {
        let scale = store.viewport().scale;
        store
            .points()
            .iter()
            .filter_map(|p| {
                let distance = p.distance_to(image_x, image_y);
                (distance <= p.size / scale).then_some((p.id, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Try to place a new point at an image-space position.
    ///
    /// Placement only happens in draw mode, only on the background (not over
    /// an existing marker), and only for an available, in-range row. The
    /// caller still pumps [`process`](Self::process) afterwards.
    pub fn try_place(
        &self,
        store: &mut PointStore,
        image_x: f64,
        image_y: f64,
        row_num: u32,
    ) -> Result<PointId, PlacementError> {
        if store.mode() != InteractionMode::Draw {
            return Err(PlacementError::NotInDrawMode);
        }
        if self.hit_test(store, image_x, image_y).is_some() {
            return Err(PlacementError::MarkerUnderCursor);
        }
        Ok(store.create_point(image_x, image_y, row_num)?)
    }

    /// Incremental reconcile: destroy orphaned markers, create missing ones.
    fn diff_points(&mut self, store: &PointStore, backend: &mut dyn MarkerBackend) {
        let alive: HashMap<PointId, &Point> = store.points().iter().map(|p| (p.id, p)).collect();

        self.markers.retain(|id, handle| {
            if alive.contains_key(id) {
                true
            } else {
                backend.destroy_marker(*handle);
                false
            }
        });
        if let Some(selected) = self.selected {
            if !self.markers.contains_key(&selected) {
                self.selected = None;
            }
        }

        let scale = store.viewport().scale;
        for point in store.points() {
            if !self.markers.contains_key(&point.id) {
                let selected = store.selected() == Some(point.id);
                let metrics = MarkerMetrics::for_point(point, scale);
                let handle = backend.create_marker(point, &metrics, selected);
                self.markers.insert(point.id, handle);
                if selected {
                    self.selected = Some(point.id);
                }
            }
        }
    }

    /// Clear-then-recreate: the reconciliation for full-list replacement.
    fn rebuild(&mut self, store: &PointStore, backend: &mut dyn MarkerBackend) {
        for (_, handle) in self.markers.drain() {
            backend.destroy_marker(handle);
        }
        self.selected = None;

        let scale = store.viewport().scale;
        for point in store.points() {
            let selected = store.selected() == Some(point.id);
            let metrics = MarkerMetrics::for_point(point, scale);
            let handle = backend.create_marker(point, &metrics, selected);
            self.markers.insert(point.id, handle);
            if selected {
                self.selected = Some(point.id);
            }
        }

        log::debug!("Rebuilt scene with {} markers", self.markers.len());
    }

    /// Recompute every marker's metrics for the current viewport scale.
    fn rescale_markers(&mut self, store: &PointStore, backend: &mut dyn MarkerBackend) {
        let scale = store.viewport().scale;
        for point in store.points() {
            if let Some(handle) = self.markers.get(&point.id) {
                backend.update_marker(*handle, &MarkerMetrics::for_point(point, scale));
            }
        }
    }

    /// Exclusive selection: restore the previous marker's default treatment
    /// before applying the new one.
    fn apply_selection(&mut self, store: &PointStore, backend: &mut dyn MarkerBackend) {
        let current = store.selected();
        if current == self.selected {
            return;
        }

        if let Some(handle) = self.selected.and_then(|id| self.markers.get(&id)) {
            backend.set_selected(*handle, false);
        }
        if let Some(handle) = current.and_then(|id| self.markers.get(&id)) {
            backend.set_selected(*handle, true);
        }
        self.selected = current;
    }
}

impl std::fmt::Debug for SceneSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSynchronizer")
            .field("markers", &self.markers.len())
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}
