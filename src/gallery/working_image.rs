//! The session's current source image.

use crate::error::Result;
use crate::gallery::storage::KeyValueStore;
use crate::generation::to_data_url;
use std::path::Path;
use std::sync::Arc;

/// Store key holding the working image data URI.
pub const WORKING_IMAGE_KEY: &str = "selectedImage";

/// Session-scoped holder for the image the next generation will restyle.
pub struct WorkingImage {
    store: Arc<dyn KeyValueStore>,
}

impl WorkingImage {
    /// Wraps a (session-scoped) store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stores raw image bytes as a data URI and returns it.
    pub fn set_from_bytes(&self, data: &[u8]) -> Result<String> {
        let url = to_data_url(data);
        self.store.set(WORKING_IMAGE_KEY, &url)?;
        Ok(url)
    }

    /// Reads an image file and stores it.
    pub fn set_from_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let data = std::fs::read(path)?;
        self.set_from_bytes(&data)
    }

    /// The current image, if any. Read failures are logged and treated as
    /// no image.
    pub fn get(&self) -> Option<String> {
        match self.store.get(WORKING_IMAGE_KEY) {
            Ok(image) => image.filter(|url| !url.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read working image");
                None
            }
        }
    }

    /// Clears the current image.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(WORKING_IMAGE_KEY)
    }
}
