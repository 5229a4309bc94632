//! Pan/zoom viewport mathematics.
//!
//! The viewport is the affine map from image space to screen space:
//! `screen = image * scale + offset`, uniform in both axes. All functions
//! here are pure; the store owns the authoritative viewport value.

use crate::constants::{
    CONTENT_HEIGHT, CONTENT_LEFT, CONTENT_TOP, CONTENT_WIDTH, FIT_MARGIN, FIT_MAX_SCALE,
    FIT_MIN_SCALE, MAX_SCALE, MIN_SCALE,
};

/// Pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Viewport {
    /// Create a new viewport. The scale is clamped to the valid range.
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
            offset_x,
            offset_y,
        }
    }

    /// Identity viewport (scale = 1, no offset).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Convert a screen-space position to image space (inverse affine map).
    pub fn to_image_space(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        (
            (screen_x - self.offset_x) / self.scale,
            (screen_y - self.offset_y) / self.scale,
        )
    }

    /// Convert an image-space position to screen space (forward affine map).
    pub fn to_screen_space(&self, image_x: f64, image_y: f64) -> (f64, f64) {
        (
            image_x * self.scale + self.offset_x,
            image_y * self.scale + self.offset_y,
        )
    }

    /// Zoom by `factor` while keeping the image point under the pivot fixed.
    ///
    /// The pivot is a screen-space position: the pointer for wheel zoom, the
    /// viewport center for button zoom. The new scale is clamped, then the
    /// offset is solved so the pivot's image-space point stays under it.
    pub fn zoom_at(&self, pivot_x: f64, pivot_y: f64, factor: f64) -> Viewport {
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);

        let (image_x, image_y) = self.to_image_space(pivot_x, pivot_y);

        Viewport {
            scale: new_scale,
            offset_x: pivot_x - image_x * new_scale,
            offset_y: pivot_y - image_y * new_scale,
        }
    }

    /// Apply a pan delta.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Viewport {
        Viewport {
            scale: self.scale,
            offset_x: self.offset_x + dx,
            offset_y: self.offset_y + dy,
        }
    }

    /// Frame the meaningful content region of an image in a container.
    ///
    /// The content of a floor-plan sheet occupies a fixed fractional
    /// sub-region of the full image (margins hold title blocks and legends).
    /// That sub-region is scaled to fit the container with a safety margin,
    /// clamped to a narrower band than user-driven zoom, and centered.
    pub fn fit_to_content(
        image_width: f64,
        image_height: f64,
        container_width: f64,
        container_height: f64,
    ) -> Viewport {
        if !(image_width > 0.0
            && image_height > 0.0
            && container_width > 0.0
            && container_height > 0.0)
        {
            return Viewport::identity();
        }

        let content_width = image_width * CONTENT_WIDTH;
        let content_height = image_height * CONTENT_HEIGHT;

        let scale = (container_width / content_width)
            .min(container_height / content_height)
            * FIT_MARGIN;
        let scale = scale.clamp(FIT_MIN_SCALE, FIT_MAX_SCALE);

        // Center of the content region, in image space.
        let content_cx = image_width * (CONTENT_LEFT + CONTENT_WIDTH / 2.0);
        let content_cy = image_height * (CONTENT_TOP + CONTENT_HEIGHT / 2.0);

        Viewport {
            scale,
            offset_x: container_width / 2.0 - content_cx * scale,
            offset_y: container_height / 2.0 - content_cy * scale,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}
