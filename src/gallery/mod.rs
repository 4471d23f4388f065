//! Local state: the result gallery and the working image.

mod entry;
pub mod storage;
mod store;
mod working_image;

pub use entry::{GalleryEntry, TimeRemaining};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{Gallery, GALLERY_KEY};
pub use working_image::{WorkingImage, WORKING_IMAGE_KEY};
