//! Background floor-plan image handling.
//!
//! The engine never renders the image; it only needs the encoded blob (for
//! persistence) and the pixel dimensions (for fit-to-content framing).

use thiserror::Error;

/// Errors from background image operations.
#[derive(Debug, Error)]
pub enum BackgroundError {
    /// The blob could not be decoded as an image
    #[error("failed to decode background image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A decoded background image: the encoded blob plus its dimensions.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl BackgroundImage {
    /// Decode an encoded image blob (PNG, JPEG, ...).
    ///
    /// On failure the blob is rejected and the caller's previous background,
    /// if any, stays in place.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, BackgroundError> {
        use image::GenericImageView;

        let decoded = image::load_from_memory(&bytes)?;
        let (width, height) = decoded.dimensions();
        log::info!(
            "Decoded background image: {width}x{height} ({} bytes)",
            bytes.len()
        );
        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    /// The encoded blob, as persisted.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as floats, for viewport math.
    pub fn dimensions(&self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }
}
