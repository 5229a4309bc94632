//! Global constants for the floormark engine.

/// Minimum user-driven zoom scale.
pub const MIN_SCALE: f64 = 0.1;

/// Maximum user-driven zoom scale.
pub const MAX_SCALE: f64 = 6.0;

/// Minimum scale produced by fit-to-content framing.
pub const FIT_MIN_SCALE: f64 = 0.3;

/// Maximum scale produced by fit-to-content framing.
pub const FIT_MAX_SCALE: f64 = 4.0;

/// Safety margin applied when fitting content to the container.
pub const FIT_MARGIN: f64 = 0.92;

/// Left edge of the meaningful content region, as a fraction of image width.
pub const CONTENT_LEFT: f64 = 0.15;

/// Top edge of the meaningful content region, as a fraction of image height.
pub const CONTENT_TOP: f64 = 0.28;

/// Width of the meaningful content region, as a fraction of image width.
pub const CONTENT_WIDTH: f64 = 0.72;

/// Height of the meaningful content region, as a fraction of image height.
pub const CONTENT_HEIGHT: f64 = 0.48;

/// Default row capacity: dataset rows are numbered 1..=DEFAULT_MAX_ROW.
///
/// This matches the deployment the engine was built for; override it via
/// [`AppConfig::max_row`](crate::config::AppConfig).
pub const DEFAULT_MAX_ROW: u32 = 215;

/// Default nominal marker diameter in pixels at scale = 1.
pub const DEFAULT_POINT_SIZE: f64 = 24.0;

/// Nominal marker stroke width in pixels at scale = 1.
pub const MARKER_STROKE_WIDTH: f64 = 2.0;

/// Nominal marker label font size in pixels at scale = 1.
pub const MARKER_LABEL_SIZE: f64 = 12.0;

/// Wheel-zoom step factor per scroll notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

/// Button-zoom step factor.
pub const BUTTON_ZOOM_STEP: f64 = 1.25;
