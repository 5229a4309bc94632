//! Authoritative engine state: point list, viewport, selection, mode.
//!
//! All mutation goes through [`PointStore`] methods. Every mutating call
//! fully completes (state, persistence, notification) before it returns, so
//! a synchronous read in the same handler never observes stale state.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;

use crate::constants::{DEFAULT_MAX_ROW, DEFAULT_POINT_SIZE, MAX_SCALE, MIN_SCALE};
use crate::model::{InteractionMode, Point, PointId};
use crate::storage::{MemoryStorage, PersistenceAdapter, StorageError};
use crate::viewport::Viewport;

/// Errors for operations that violate a model invariant.
///
/// These are descriptive refusals: the store is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A point already occupies the requested row
    #[error("row {row} already has a point")]
    DuplicateRow { row: u32 },

    /// The requested row is outside the configured range
    #[error("row {row} is outside the valid range 1..={max_row}")]
    RowOutOfRange { row: u32, max_row: u32 },

    /// No point matches the given id
    #[error("no point with the requested id")]
    PointNotFound,
}

/// Notification sent to subscribers after each mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// Incremental point-list change (a single add or remove).
    PointsChanged,
    /// Full replacement of the point list (import or clear).
    PointsReplaced,
    /// The selected point changed.
    SelectionChanged,
    /// Scale or offset changed.
    ViewportChanged,
    /// The interaction mode changed.
    ModeChanged,
}

/// One candidate item for bulk import.
///
/// Caller-supplied ids are never retained; the store generates a fresh id
/// for every imported point.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPoint {
    pub row_num: u32,
    pub x: f64,
    pub y: f64,
    /// Nominal diameter; the configured default is used when absent.
    pub size: Option<f64>,
}

/// Owner of the point list, viewport state, and selection.
pub struct PointStore {
    max_row: u32,
    default_point_size: f64,
    /// Points kept in ascending row order for stable list presentation.
    points: Vec<Point>,
    viewport: Viewport,
    mode: InteractionMode,
    selected: Option<PointId>,
    subscribers: Vec<Sender<StoreEvent>>,
    persistence: PersistenceAdapter,
}

impl PointStore {
    /// Create a store with default limits over the given persistence adapter.
    pub fn new(persistence: PersistenceAdapter) -> Self {
        Self::with_limits(DEFAULT_MAX_ROW, DEFAULT_POINT_SIZE, persistence)
    }

    /// Create a store with an explicit row capacity and default marker size.
    pub fn with_limits(
        max_row: u32,
        default_point_size: f64,
        persistence: PersistenceAdapter,
    ) -> Self {
        Self {
            max_row,
            default_point_size,
            points: Vec::new(),
            viewport: Viewport::identity(),
            mode: InteractionMode::default(),
            selected: None,
            subscribers: Vec::new(),
            persistence,
        }
    }

    /// Create a store over volatile in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(PersistenceAdapter::new(Box::new(MemoryStorage::new())))
    }

    /// Load the persisted point list into the store.
    ///
    /// Call once at startup, before subscribing observers. A missing or
    /// unreadable entry falls back to an empty list; entries violating the
    /// row invariants are dropped.
    pub fn load_persisted(&mut self) {
        let mut loaded = match self.persistence.load_points() {
            Ok(points) => points,
            Err(e) => {
                log::warn!("Failed to load persisted points, starting empty: {e}");
                return;
            }
        };

        loaded.sort_by_key(|p| p.row_num);

        let mut seen = HashSet::new();
        self.points = loaded
            .into_iter()
            .filter(|p| {
                let valid = (1..=self.max_row).contains(&p.row_num) && seen.insert(p.row_num);
                if !valid {
                    log::warn!("Dropping persisted point with invalid row {}", p.row_num);
                }
                valid
            })
            .collect();

        log::info!("Loaded {} persisted points", self.points.len());
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// All points, ascending by row number.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Look up a point by id.
    pub fn point(&self, id: &PointId) -> Option<&Point> {
        self.points.iter().find(|p| p.id == *id)
    }

    /// Look up a point by row number.
    pub fn point_by_row(&self, row: u32) -> Option<&Point> {
        self.points.iter().find(|p| p.row_num == row)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Current viewport transform.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current interaction mode.
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Currently selected point id, if any.
    pub fn selected(&self) -> Option<PointId> {
        self.selected
    }

    /// Configured row capacity.
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// Configured nominal marker diameter for new points.
    pub fn default_point_size(&self) -> f64 {
        self.default_point_size
    }

    /// Smallest row in `1..=max_row` not used by any point.
    ///
    /// Saturates to `max_row` when every row is taken: placement is always
    /// offered a suggested row, even at capacity.
    pub fn next_available_row(&self) -> u32 {
        let mut candidate = 1;
        for point in &self.points {
            if point.row_num == candidate {
                candidate += 1;
            } else if point.row_num > candidate {
                break;
            }
        }
        candidate.min(self.max_row)
    }

    // ========================================================================
    // Point mutations
    // ========================================================================

    /// Insert a point. Rejects duplicate or out-of-range rows.
    pub fn add_point(&mut self, point: Point) -> Result<(), StoreError> {
        self.check_row(point.row_num)?;
        if self.point_by_row(point.row_num).is_some() {
            return Err(StoreError::DuplicateRow {
                row: point.row_num,
            });
        }

        self.points.push(point);
        self.points.sort_by_key(|p| p.row_num);
        self.persist_points();
        self.notify(StoreEvent::PointsChanged);
        Ok(())
    }

    /// Create and insert a point at an image-space position, using the
    /// configured default size. Returns the new point's id.
    pub fn create_point(&mut self, x: f64, y: f64, row_num: u32) -> Result<PointId, StoreError> {
        let point = Point::new(x, y, self.default_point_size, row_num);
        let id = point.id;
        self.add_point(point)?;
        Ok(id)
    }

    /// Remove a point by id, returning it. Clears the selection when the
    /// removed point was selected.
    pub fn remove_point(&mut self, id: &PointId) -> Result<Point, StoreError> {
        let index = self
            .points
            .iter()
            .position(|p| p.id == *id)
            .ok_or(StoreError::PointNotFound)?;

        let removed = self.points.remove(index);
        if self.selected == Some(removed.id) {
            self.selected = None;
        }
        self.persist_points();
        self.notify(StoreEvent::PointsChanged);
        Ok(removed)
    }

    /// Remove every point and clear the selection.
    pub fn clear_all(&mut self) {
        self.points.clear();
        self.selected = None;
        self.persist_points();
        self.notify(StoreEvent::PointsReplaced);
    }

    /// Replace the entire point list with imported items.
    ///
    /// Items outside `1..=max_row` are dropped silently; a second item for an
    /// already-taken row is likewise dropped. Every kept item gets a freshly
    /// generated id and the default size when none was supplied. Returns the
    /// number of points kept.
    pub fn import_points(&mut self, items: Vec<ImportedPoint>) -> usize {
        let mut seen = HashSet::new();
        let mut replacement: Vec<Point> = Vec::new();

        for item in items {
            if !(1..=self.max_row).contains(&item.row_num) {
                log::debug!("Import: dropping out-of-range row {}", item.row_num);
                continue;
            }
            if !seen.insert(item.row_num) {
                log::debug!("Import: dropping duplicate row {}", item.row_num);
                continue;
            }
            replacement.push(Point::new(
                item.x,
                item.y,
                item.size.unwrap_or(self.default_point_size),
                item.row_num,
            ));
        }

        replacement.sort_by_key(|p| p.row_num);
        let kept = replacement.len();

        self.points = replacement;
        self.selected = None;
        self.persist_points();
        self.notify(StoreEvent::PointsReplaced);

        log::info!("Imported {kept} points");
        kept
    }

    // ========================================================================
    // Viewport, mode, selection
    // ========================================================================

    /// Set the zoom scale, clamped to the valid range.
    pub fn set_scale(&mut self, scale: f64) {
        self.viewport.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        self.notify(StoreEvent::ViewportChanged);
    }

    /// Set the screen-space translation of the image origin. Unclamped.
    pub fn set_offset(&mut self, offset_x: f64, offset_y: f64) {
        self.viewport.offset_x = offset_x;
        self.viewport.offset_y = offset_y;
        self.notify(StoreEvent::ViewportChanged);
    }

    /// Replace the whole viewport (scale clamped).
    pub fn apply_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport::new(viewport.scale, viewport.offset_x, viewport.offset_y);
        self.notify(StoreEvent::ViewportChanged);
    }

    /// Switch the interaction mode. Setting the current mode is a no-op.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode != mode {
            self.mode = mode;
            self.notify(StoreEvent::ModeChanged);
        }
    }

    /// Select a point (or clear the selection with `None`).
    ///
    /// Selecting an id with no matching point is a refusal that leaves the
    /// current selection in place.
    pub fn select(&mut self, id: Option<PointId>) -> Result<(), StoreError> {
        if let Some(id) = id {
            if self.point(&id).is_none() {
                return Err(StoreError::PointNotFound);
            }
        }
        if self.selected != id {
            self.selected = id;
            self.notify(StoreEvent::SelectionChanged);
        }
        Ok(())
    }

    // ========================================================================
    // Background image persistence
    // ========================================================================

    /// Persist the encoded background image blob.
    pub fn save_background(&mut self, blob: &[u8]) -> Result<(), StorageError> {
        self.persistence.save_image(blob)
    }

    /// Read the persisted background image blob, if any.
    pub fn load_background(&self) -> Result<Option<Vec<u8>>, StorageError> {
        self.persistence.load_image()
    }

    /// Remove the persisted background image.
    pub fn clear_background(&mut self) -> Result<(), StorageError> {
        self.persistence.clear_image()
    }

    // ========================================================================
    // Subscription
    // ========================================================================

    /// Subscribe to store events.
    ///
    /// Each mutating operation delivers exactly one event to every live
    /// subscriber, after the store is fully consistent. Dropped receivers
    /// are pruned on the next notification.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers.retain(|s| s.send(event).is_ok());
    }

    fn persist_points(&mut self) {
        // A write failure degrades to a session-only store; the in-memory
        // state stays consistent and observers are still notified.
        if let Err(e) = self.persistence.save_points(&self.points) {
            log::error!("Failed to persist points: {e}");
        }
    }

    fn check_row(&self, row: u32) -> Result<(), StoreError> {
        if (1..=self.max_row).contains(&row) {
            Ok(())
        } else {
            Err(StoreError::RowOutOfRange {
                row,
                max_row: self.max_row,
            })
        }
    }
}

impl std::fmt::Debug for PointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointStore")
            .field("points", &self.points.len())
            .field("viewport", &self.viewport)
            .field("mode", &self.mode)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStorage;

    fn point(row: u32) -> Point {
        Point::new(row as f64 * 10.0, row as f64 * 5.0, 24.0, row)
    }

    #[test]
    fn test_add_point_rejects_duplicate_row() {
        let mut store = PointStore::in_memory();
        store.add_point(point(3)).unwrap();

        let err = store.add_point(point(3)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateRow { row: 3 });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_point_rejects_out_of_range_row() {
        let mut store = PointStore::in_memory();
        assert_eq!(
            store.add_point(point(0)).unwrap_err(),
            StoreError::RowOutOfRange { row: 0, max_row: 215 }
        );
        assert_eq!(
            store.add_point(point(216)).unwrap_err(),
            StoreError::RowOutOfRange { row: 216, max_row: 215 }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_points_kept_sorted_by_row() {
        let mut store = PointStore::in_memory();
        store.add_point(point(9)).unwrap();
        store.add_point(point(2)).unwrap();
        store.add_point(point(5)).unwrap();

        let rows: Vec<u32> = store.points().iter().map(|p| p.row_num).collect();
        assert_eq!(rows, vec![2, 5, 9]);
    }

    #[test]
    fn test_next_available_row_scenario() {
        let mut store = PointStore::in_memory();
        let id1 = store.create_point(100.0, 50.0, 1).unwrap();
        assert_eq!(store.next_available_row(), 2);

        store.create_point(30.0, 30.0, 5).unwrap();
        assert_eq!(store.next_available_row(), 2);

        store.remove_point(&id1).unwrap();
        assert_eq!(store.next_available_row(), 1);
    }

    #[test]
    fn test_next_available_row_saturates_at_capacity() {
        let mut store = PointStore::with_limits(
            4,
            24.0,
            PersistenceAdapter::new(Box::new(MemoryStorage::new())),
        );
        for row in 1..=4 {
            store.add_point(point(row)).unwrap();
        }
        assert_eq!(store.next_available_row(), 4);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut store = PointStore::in_memory();
        let id = store.create_point(1.0, 1.0, 1).unwrap();
        store.create_point(2.0, 2.0, 2).unwrap();

        store.select(Some(id)).unwrap();
        assert_eq!(store.selected(), Some(id));

        store.remove_point(&id).unwrap();
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_remove_other_point_keeps_selection() {
        let mut store = PointStore::in_memory();
        let keep = store.create_point(1.0, 1.0, 1).unwrap();
        let drop = store.create_point(2.0, 2.0, 2).unwrap();

        store.select(Some(keep)).unwrap();
        store.remove_point(&drop).unwrap();
        assert_eq!(store.selected(), Some(keep));
    }

    #[test]
    fn test_selection_is_exclusive_and_checked() {
        let mut store = PointStore::in_memory();
        let a = store.create_point(1.0, 1.0, 1).unwrap();
        let b = store.create_point(2.0, 2.0, 2).unwrap();

        store.select(Some(a)).unwrap();
        store.select(Some(b)).unwrap();
        assert_eq!(store.selected(), Some(b));

        let stray = PointId::new();
        assert_eq!(store.select(Some(stray)), Err(StoreError::PointNotFound));
        assert_eq!(store.selected(), Some(b));

        store.select(None).unwrap();
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_import_replaces_atomically() {
        let mut store = PointStore::in_memory();
        let old_id = store.create_point(1.0, 1.0, 1).unwrap();

        let kept = store.import_points(vec![
            ImportedPoint { row_num: 7, x: 70.0, y: 7.0, size: None },
            ImportedPoint { row_num: 3, x: 30.0, y: 3.0, size: Some(30.0) },
            ImportedPoint { row_num: 999, x: 0.0, y: 0.0, size: None },
            ImportedPoint { row_num: 3, x: 99.0, y: 99.0, size: None },
        ]);

        assert_eq!(kept, 2);
        assert_eq!(store.len(), 2);

        let rows: Vec<u32> = store.points().iter().map(|p| p.row_num).collect();
        assert_eq!(rows, vec![3, 7]);

        // Fresh ids, defaulted size, first occurrence wins for row 3.
        assert!(store.points().iter().all(|p| p.id != old_id));
        assert_eq!(store.point_by_row(3).unwrap().x, 30.0);
        assert_eq!(store.point_by_row(3).unwrap().size, 30.0);
        assert_eq!(store.point_by_row(7).unwrap().size, 24.0);
    }

    #[test]
    fn test_import_clears_selection() {
        let mut store = PointStore::in_memory();
        let id = store.create_point(1.0, 1.0, 1).unwrap();
        store.select(Some(id)).unwrap();

        store.import_points(vec![ImportedPoint {
            row_num: 1,
            x: 0.0,
            y: 0.0,
            size: None,
        }]);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_scale_clamped() {
        let mut store = PointStore::in_memory();
        store.set_scale(100.0);
        assert_eq!(store.viewport().scale, 6.0);
        store.set_scale(0.0);
        assert_eq!(store.viewport().scale, 0.1);
    }

    #[test]
    fn test_one_event_per_mutation() {
        let mut store = PointStore::in_memory();
        let events = store.subscribe();

        let id = store.create_point(1.0, 1.0, 1).unwrap();
        store.select(Some(id)).unwrap();
        store.set_scale(2.0);
        store.set_offset(10.0, 20.0);
        store.set_mode(InteractionMode::Draw);
        store.set_mode(InteractionMode::Draw); // no-op, no event
        store.remove_point(&id).unwrap();
        store.clear_all();

        let received: Vec<StoreEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                StoreEvent::PointsChanged,
                StoreEvent::SelectionChanged,
                StoreEvent::ViewportChanged,
                StoreEvent::ViewportChanged,
                StoreEvent::ModeChanged,
                StoreEvent::PointsChanged,
                StoreEvent::PointsReplaced,
            ]
        );
    }

    #[test]
    fn test_rejected_mutation_emits_no_event() {
        let mut store = PointStore::in_memory();
        store.add_point(point(1)).unwrap();

        let events = store.subscribe();
        assert!(store.add_point(point(1)).is_err());
        assert!(store.remove_point(&PointId::new()).is_err());
        assert!(events.try_iter().next().is_none());
    }

    #[test]
    fn test_points_persist_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = PointStore::new(PersistenceAdapter::new(Box::new(FileStorage::new(
            dir.path(),
        ))));
        store.create_point(100.0, 50.0, 1).unwrap();
        store.create_point(10.0, 5.0, 8).unwrap();
        let saved: Vec<Point> = store.points().to_vec();

        let mut reloaded = PointStore::new(PersistenceAdapter::new(Box::new(FileStorage::new(
            dir.path(),
        ))));
        reloaded.load_persisted();
        assert_eq!(reloaded.points(), saved.as_slice());
    }

    #[test]
    fn test_background_blob_roundtrip() {
        let mut store = PointStore::in_memory();
        assert_eq!(store.load_background().unwrap(), None);

        store.save_background(b"blob").unwrap();
        assert_eq!(store.load_background().unwrap().as_deref(), Some(b"blob".as_ref()));

        store.clear_background().unwrap();
        assert_eq!(store.load_background().unwrap(), None);
    }
}
