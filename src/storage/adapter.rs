//! Persistence adapter mapping engine state onto storage entries.

use crate::model::Point;

use super::{KeyValueStorage, StorageError};

/// Storage key holding the point list as one JSON array.
const POINTS_KEY: &str = "points.json";

/// Storage key holding the encoded background image blob.
const IMAGE_KEY: &str = "background.img";

/// Serializes points and the background image to durable storage.
///
/// The point list is one JSON array of wire-format records; the background
/// image is a single blob entry separate from the point array.
pub struct PersistenceAdapter {
    storage: Box<dyn KeyValueStorage>,
}

impl PersistenceAdapter {
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Write the full point list.
    pub fn save_points(&mut self, points: &[Point]) -> Result<(), StorageError> {
        let json = serde_json::to_vec(points)?;
        self.storage.set(POINTS_KEY, &json)
    }

    /// Read the persisted point list. An absent entry is an empty list.
    pub fn load_points(&self) -> Result<Vec<Point>, StorageError> {
        match self.storage.get(POINTS_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Write the background image blob.
    pub fn save_image(&mut self, blob: &[u8]) -> Result<(), StorageError> {
        self.storage.set(IMAGE_KEY, blob)
    }

    /// Read the background image blob, if one was stored.
    pub fn load_image(&self) -> Result<Option<Vec<u8>>, StorageError> {
        self.storage.get(IMAGE_KEY)
    }

    /// Remove the stored background image.
    pub fn clear_image(&mut self) -> Result<(), StorageError> {
        self.storage.remove(IMAGE_KEY)
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter").finish_non_exhaustive()
    }
}
