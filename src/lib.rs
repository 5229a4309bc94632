//! Floormark - floor-plan point annotation engine.
//!
//! The core of a floor-plan annotator: a persistent, resolution-independent
//! point model, a pan/zoom viewport, and a scene synchronizer that keeps
//! rendered markers in lockstep with both. Hosts supply the rendering
//! surface through the [`scene::MarkerBackend`] seam and feed pointer/wheel
//! gestures into [`app::App`].

pub mod app;
pub mod background;
pub mod config;
pub mod constants;
pub mod format;
pub mod model;
pub mod scene;
pub mod storage;
pub mod store;
pub mod viewport;

pub use app::{App, PointerOutcome};
pub use model::{InteractionMode, Point, PointId};
pub use scene::{MarkerBackend, SceneSynchronizer};
pub use store::{PointStore, StoreEvent};
pub use viewport::Viewport;
