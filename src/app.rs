//! Application root.
//!
//! Owns the store, the scene synchronizer, and the rendering backend, and
//! translates host gestures (clicks, drags, wheel) into engine operations.
//! After every mutation the scene is pumped, so an event handler never
//! returns while the rendered markers lag the model.

use std::path::Path;

use crate::background::{BackgroundError, BackgroundImage};
use crate::config::AppConfig;
use crate::constants::{BUTTON_ZOOM_STEP, WHEEL_ZOOM_STEP};
use crate::format::{self, FormatError};
use crate::model::{DatasetRecord, InteractionMode, PanDrag, Point, PointId, placeholder_records};
use crate::scene::{MarkerBackend, PlacementError, SceneSynchronizer};
use crate::storage::{MemoryStorage, PersistenceAdapter};
use crate::store::{PointStore, StoreError};
use crate::viewport::Viewport;

/// What a pointer-down gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// A pan drag started.
    PanStarted,
    /// An existing marker was selected.
    Selected(PointId),
    /// A new point was placed.
    Placed(PointId),
}

/// Engine root owning all state and the rendering seam.
pub struct App<B: MarkerBackend> {
    store: PointStore,
    scene: SceneSynchronizer,
    backend: B,
    drag: PanDrag,
    dataset: Vec<DatasetRecord>,
    background: Option<BackgroundImage>,
    container: (f64, f64),
}

impl<B: MarkerBackend> App<B> {
    /// Build the application root: load persisted points and background,
    /// seed placeholder dataset records, and render the initial scene.
    pub fn new(config: &AppConfig, persistence: PersistenceAdapter, backend: B) -> Self {
        let mut store =
            PointStore::with_limits(config.max_row, config.default_point_size, persistence);
        store.load_persisted();
        let scene = SceneSynchronizer::new(&mut store);

        let background = match store.load_background() {
            Ok(Some(blob)) => match BackgroundImage::decode(blob) {
                Ok(background) => Some(background),
                Err(e) => {
                    log::warn!("Stored background image is unreadable: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to load background image: {e}");
                None
            }
        };

        let dataset = placeholder_records(config.max_row);

        let mut app = Self {
            store,
            scene,
            backend,
            drag: PanDrag::new(),
            dataset,
            background,
            container: (0.0, 0.0),
        };
        app.scene.resync(&app.store, &mut app.backend);
        app
    }

    /// Convenience constructor over in-memory storage.
    pub fn in_memory(backend: B) -> Self {
        Self::new(
            &AppConfig::new(),
            PersistenceAdapter::new(Box::new(MemoryStorage::new())),
            backend,
        )
    }

    /// Read access to the engine state.
    pub fn store(&self) -> &PointStore {
        &self.store
    }

    /// The rendering backend, for host-side inspection.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current background image, if any.
    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    /// Tell the engine the size of the viewport container. Used as the
    /// pivot for button zoom and as the frame for fit-to-content.
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        self.container = (width, height);
    }

    /// Force a full scene reconciliation.
    pub fn resync(&mut self) {
        self.scene.resync(&self.store, &mut self.backend);
    }

    fn pump(&mut self) {
        self.scene.process(&self.store, &mut self.backend);
    }

    // ========================================================================
    // Pointer gestures
    // ========================================================================

    /// Handle pointer-down.
    ///
    /// Pan mode starts a drag. Draw mode selects the marker under the
    /// pointer, or places a new point at the suggested row when the pointer
    /// is over the background.
    pub fn pointer_down(
        &mut self,
        screen_x: f64,
        screen_y: f64,
    ) -> Result<PointerOutcome, PlacementError> {
        match self.store.mode() {
            InteractionMode::Pan => {
                self.drag.start(screen_x, screen_y);
                Ok(PointerOutcome::PanStarted)
            }
            InteractionMode::Draw => {
                let (image_x, image_y) = self.store.viewport().to_image_space(screen_x, screen_y);

                if let Some(id) = self.scene.hit_test(&self.store, image_x, image_y) {
                    if let Err(e) = self.store.select(Some(id)) {
                        log::error!("Selecting hit-tested point failed: {e}");
                    }
                    self.pump();
                    return Ok(PointerOutcome::Selected(id));
                }

                let row = self.store.next_available_row();
                let placed = self.scene.try_place(&mut self.store, image_x, image_y, row);
                self.pump();
                placed.map(PointerOutcome::Placed)
            }
        }
    }

    /// Handle pointer movement; pans the viewport while a drag is active.
    pub fn pointer_moved(&mut self, screen_x: f64, screen_y: f64) {
        if let Some((dx, dy)) = self.drag.update(screen_x, screen_y) {
            let panned = self.store.viewport().pan_by(dx, dy);
            self.store.apply_viewport(panned);
            self.pump();
        }
    }

    /// Handle pointer-up, ending any active drag.
    pub fn pointer_up(&mut self) {
        self.drag.end();
    }

    // ========================================================================
    // Zoom and framing
    // ========================================================================

    /// Wheel zoom toward the pointer. Positive steps zoom in.
    pub fn wheel_zoom(&mut self, pointer_x: f64, pointer_y: f64, steps: f64) {
        let factor = WHEEL_ZOOM_STEP.powf(steps);
        let zoomed = self.store.viewport().zoom_at(pointer_x, pointer_y, factor);
        self.store.apply_viewport(zoomed);
        self.pump();
    }

    /// Button zoom in, pivoting on the container center.
    pub fn zoom_in(&mut self) {
        self.zoom_about_center(BUTTON_ZOOM_STEP);
    }

    /// Button zoom out, pivoting on the container center.
    pub fn zoom_out(&mut self) {
        self.zoom_about_center(1.0 / BUTTON_ZOOM_STEP);
    }

    fn zoom_about_center(&mut self, factor: f64) {
        let (cx, cy) = (self.container.0 / 2.0, self.container.1 / 2.0);
        let zoomed = self.store.viewport().zoom_at(cx, cy, factor);
        self.store.apply_viewport(zoomed);
        self.pump();
    }

    /// Frame the background's content region in the container.
    pub fn fit_view(&mut self) {
        let Some(background) = &self.background else {
            log::debug!("fit_view requested without a background image");
            return;
        };
        let (image_w, image_h) = background.dimensions();
        let fitted = Viewport::fit_to_content(image_w, image_h, self.container.0, self.container.1);
        self.store.apply_viewport(fitted);
        self.pump();
    }

    // ========================================================================
    // Mode, selection, removal
    // ========================================================================

    /// Switch the interaction mode, ending any in-flight drag.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.drag.end();
        self.store.set_mode(mode);
        self.pump();
    }

    /// Select a point (or clear the selection).
    pub fn select_point(&mut self, id: Option<PointId>) -> Result<(), StoreError> {
        let result = self.store.select(id);
        self.pump();
        result
    }

    /// Remove the currently selected point, returning it.
    pub fn remove_selected(&mut self) -> Option<Point> {
        let id = self.store.selected()?;
        let removed = match self.store.remove_point(&id) {
            Ok(point) => Some(point),
            Err(e) => {
                log::error!("Removing selected point failed: {e}");
                None
            }
        };
        self.pump();
        removed
    }

    /// Remove every point.
    pub fn clear_points(&mut self) {
        self.store.clear_all();
        self.pump();
    }

    // ========================================================================
    // Import, export, dataset, background
    // ========================================================================

    /// Import a point file payload, replacing the current point list.
    ///
    /// The payload is fully validated before the store is touched; a
    /// malformed file leaves everything unchanged. Returns the number of
    /// points kept.
    pub fn import_json(&mut self, json: &str) -> Result<usize, FormatError> {
        let items = format::parse_points(json)?;
        let kept = self.store.import_points(items);
        self.pump();
        Ok(kept)
    }

    /// Import a point file from disk.
    pub fn import_file(&mut self, path: &Path) -> Result<usize, FormatError> {
        let items = format::read_points(path)?;
        let kept = self.store.import_points(items);
        self.pump();
        Ok(kept)
    }

    /// Export the point list, merged with dataset records, as JSON.
    pub fn export_json(&self) -> Result<String, FormatError> {
        format::export_json(self.store.points(), &self.dataset)
    }

    /// Export the point list to disk.
    pub fn export_file(&self, path: &Path) -> Result<(), FormatError> {
        format::write_points(path, self.store.points(), &self.dataset)
    }

    /// Load the external dataset file; failures fall back to placeholders.
    pub fn load_dataset_file(&mut self, path: &Path) {
        self.dataset = format::load_dataset(path, self.store.max_row());
    }

    /// Replace the dataset records directly.
    pub fn set_dataset(&mut self, records: Vec<DatasetRecord>) {
        self.dataset = records;
    }

    /// Dataset record for a row, if one exists.
    pub fn record_for_row(&self, row: u32) -> Option<&DatasetRecord> {
        self.dataset.get(row.checked_sub(1)? as usize)
    }

    /// Install a new background image from an encoded blob.
    ///
    /// Decode failure rejects the blob and keeps the previous background.
    pub fn set_background(&mut self, bytes: Vec<u8>) -> Result<(), BackgroundError> {
        let background = BackgroundImage::decode(bytes)?;
        if let Err(e) = self.store.save_background(background.bytes()) {
            log::error!("Failed to persist background image: {e}");
        }
        self.background = Some(background);
        Ok(())
    }

    /// Remove the background image.
    pub fn clear_background(&mut self) {
        if let Err(e) = self.store.clear_background() {
            log::error!("Failed to clear persisted background image: {e}");
        }
        self.background = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MarkerHandle, MarkerMetrics};
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    /// Minimal backend counting marker lifecycle calls.
    #[derive(Debug, Default)]
    struct CountingBackend {
        next_handle: MarkerHandle,
        alive: usize,
    }

    impl MarkerBackend for CountingBackend {
        fn create_marker(
            &mut self,
            _point: &Point,
            _metrics: &MarkerMetrics,
            _selected: bool,
        ) -> MarkerHandle {
            self.next_handle += 1;
            self.alive += 1;
            self.next_handle
        }

        fn destroy_marker(&mut self, _handle: MarkerHandle) {
            self.alive -= 1;
        }

        fn update_marker(&mut self, _handle: MarkerHandle, _metrics: &MarkerMetrics) {}

        fn set_selected(&mut self, _handle: MarkerHandle, _selected: bool) {}
    }

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let buffer = RgbaImage::new(width, height);
        let mut bytes = Cursor::new(Vec::new());
        buffer.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn app() -> App<CountingBackend> {
        let _ = env_logger::builder().is_test(true).try_init();
        App::in_memory(CountingBackend::default())
    }

    #[test]
    fn test_draw_clicks_place_points_at_suggested_rows() {
        let mut app = app();
        app.set_mode(InteractionMode::Draw);

        let first = app.pointer_down(100.0, 50.0).unwrap();
        let second = app.pointer_down(300.0, 200.0).unwrap();

        let (PointerOutcome::Placed(a), PointerOutcome::Placed(b)) = (first, second) else {
            panic!("expected placements, got {first:?} / {second:?}");
        };
        assert_eq!(app.store().point(&a).unwrap().row_num, 1);
        assert_eq!(app.store().point(&b).unwrap().row_num, 2);
        assert_eq!(app.backend().alive, 2);
    }

    #[test]
    fn test_placement_uses_image_space_coordinates() {
        let mut app = app();
        app.set_mode(InteractionMode::Draw);
        app.wheel_zoom(0.0, 0.0, 5.0); // zoom in at origin

        let outcome = app.pointer_down(200.0, 120.0).unwrap();
        let PointerOutcome::Placed(id) = outcome else {
            panic!("expected placement");
        };

        // The stored position converts back to the click position.
        let point = app.store().point(&id).unwrap().clone();
        let (sx, sy) = app.store().viewport().to_screen_space(point.x, point.y);
        assert!((sx - 200.0).abs() < 1e-6);
        assert!((sy - 120.0).abs() < 1e-6);
    }

    #[test]
    fn test_clicking_marker_selects_instead_of_placing() {
        let mut app = app();
        app.set_mode(InteractionMode::Draw);

        let placed = app.pointer_down(100.0, 100.0).unwrap();
        let PointerOutcome::Placed(id) = placed else {
            panic!("expected placement");
        };

        let outcome = app.pointer_down(110.0, 100.0).unwrap();
        assert_eq!(outcome, PointerOutcome::Selected(id));
        assert_eq!(app.store().selected(), Some(id));
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn test_pan_drag_moves_viewport() {
        let mut app = app();
        assert_eq!(app.store().mode(), InteractionMode::Pan);

        assert_eq!(
            app.pointer_down(10.0, 10.0).unwrap(),
            PointerOutcome::PanStarted
        );
        app.pointer_moved(30.0, 25.0);
        app.pointer_up();

        let viewport = app.store().viewport();
        assert_eq!(viewport.offset_x, 20.0);
        assert_eq!(viewport.offset_y, 15.0);

        // No drag active: movement is ignored.
        app.pointer_moved(100.0, 100.0);
        assert_eq!(app.store().viewport().offset_x, 20.0);
    }

    #[test]
    fn test_wheel_zoom_keeps_pointer_position_fixed() {
        let mut app = app();
        let (before_x, before_y) = app.store().viewport().to_image_space(140.0, 90.0);

        app.wheel_zoom(140.0, 90.0, 3.0);

        let (after_x, after_y) = app.store().viewport().to_image_space(140.0, 90.0);
        assert!((before_x - after_x).abs() < 1e-6);
        assert!((before_y - after_y).abs() < 1e-6);
    }

    #[test]
    fn test_button_zoom_stays_clamped() {
        let mut app = app();
        app.set_container_size(800.0, 600.0);

        for _ in 0..30 {
            app.zoom_in();
        }
        assert_eq!(app.store().viewport().scale, 6.0);

        for _ in 0..60 {
            app.zoom_out();
        }
        assert_eq!(app.store().viewport().scale, 0.1);
    }

    #[test]
    fn test_fit_view_frames_background_content() {
        let mut app = app();
        app.set_container_size(800.0, 600.0);
        app.set_background(encoded_png(1000, 1000)).unwrap();

        app.fit_view();

        let viewport = app.store().viewport();
        let expected = (800.0 / 720.0_f64).min(600.0 / 480.0) * 0.92;
        assert!((viewport.scale - expected).abs() < 1e-6);
        let (sx, sy) = viewport.to_screen_space(510.0, 520.0);
        assert!((sx - 400.0).abs() < 1e-6);
        assert!((sy - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_view_without_background_is_noop() {
        let mut app = app();
        app.set_container_size(800.0, 600.0);
        let before = app.store().viewport();
        app.fit_view();
        assert_eq!(app.store().viewport(), before);
    }

    #[test]
    fn test_remove_selected() {
        let mut app = app();
        app.set_mode(InteractionMode::Draw);
        let PointerOutcome::Placed(id) = app.pointer_down(50.0, 50.0).unwrap() else {
            panic!("expected placement");
        };

        assert!(app.remove_selected().is_none()); // nothing selected yet

        app.select_point(Some(id)).unwrap();
        let removed = app.remove_selected().unwrap();
        assert_eq!(removed.id, id);
        assert!(app.store().is_empty());
        assert_eq!(app.backend().alive, 0);
    }

    #[test]
    fn test_malformed_import_leaves_state_untouched() {
        let mut app = app();
        app.set_mode(InteractionMode::Draw);
        app.pointer_down(50.0, 50.0).unwrap();

        assert!(app.import_json("{\"not\": \"an array\"}").is_err());
        assert!(app.import_json("[{\"rowNum\": 1,").is_err());

        assert_eq!(app.store().len(), 1);
        assert_eq!(app.backend().alive, 1);
    }

    #[test]
    fn test_import_rebuilds_scene() {
        let mut app = app();
        app.set_mode(InteractionMode::Draw);
        app.pointer_down(50.0, 50.0).unwrap();

        let kept = app
            .import_json(r#"[{"rowNum": 4, "x": 1.0, "y": 2.0}, {"row": 9, "x": 3.0, "y": 4.0}]"#)
            .unwrap();
        assert_eq!(kept, 2);
        assert_eq!(app.store().len(), 2);
        assert_eq!(app.backend().alive, 2);
    }

    #[test]
    fn test_placement_error_at_capacity() {
        let mut config = AppConfig::new();
        config.max_row = 1;
        let mut app = App::new(
            &config,
            PersistenceAdapter::new(Box::new(crate::storage::MemoryStorage::new())),
            CountingBackend::default(),
        );
        app.set_mode(InteractionMode::Draw);

        app.pointer_down(10.0, 10.0).unwrap();
        // Row 1 is taken; the saturated suggestion collides and is refused.
        let err = app.pointer_down(500.0, 500.0).unwrap_err();
        assert!(matches!(
            err,
            PlacementError::Model(StoreError::DuplicateRow { row: 1 })
        ));
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn test_background_decode_failure_keeps_previous() {
        let mut app = app();
        app.set_background(encoded_png(40, 30)).unwrap();

        assert!(app.set_background(b"garbage".to_vec()).is_err());
        let background = app.background().unwrap();
        assert_eq!(background.width(), 40);
        assert_eq!(background.height(), 30);
    }

    #[test]
    fn test_record_for_row_lookup() {
        let mut app = app();
        // Placeholders seeded for every row.
        assert_eq!(app.record_for_row(1).unwrap().plate, "P001");
        assert_eq!(app.record_for_row(215).unwrap().plate, "P215");
        assert!(app.record_for_row(0).is_none());
        assert!(app.record_for_row(216).is_none());

        app.set_dataset(vec![DatasetRecord::new("A01")]);
        assert_eq!(app.record_for_row(1).unwrap().plate, "A01");
        assert!(app.record_for_row(2).is_none());
    }
}
