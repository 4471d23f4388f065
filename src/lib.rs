#![warn(missing_docs)]
//! magedit - magazine-cover restyling via a remote image-generation API.
//!
//! A generation cycle submits a style prompt (and optionally the working
//! image) to the service, polls the returned status URL until the job
//! resolves, downloads the artifact and keeps it in a short-lived local
//! gallery.
//!
//! # Quick Start
//!
//! ```no_run
//! use magedit::{Editor, EditorConfig, StylePreset};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> magedit::Result<()> {
//!     let editor = Editor::open(EditorConfig::builder().build()?)?;
//!     editor.working_image().set_from_file("portrait.jpg")?;
//!
//!     let preset = StylePreset::find("vogue")?;
//!     let download = editor
//!         .run(&preset, std::path::Path::new("."), &CancellationToken::new())
//!         .await?;
//!     println!("saved {}", download.path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `magedit` command-line binary.

pub mod clock;
mod config;
mod error;
pub mod gallery;
pub mod generation;
mod presets;
mod workflow;

pub use config::{EditorConfig, EditorConfigBuilder, API_TOKEN_ENV, DEFAULT_GENERATE_URL};
pub use error::{ErrorKind, MagEditError, Result};
pub use gallery::{Gallery, GalleryEntry, TimeRemaining, WorkingImage};
pub use generation::{
    GenerationRequest, ImageFormat, JobHandle, JobOutcome, JobSubmitter, StatusPoller,
};
pub use presets::StylePreset;
pub use workflow::{download_filename, Activity, Download, Editor};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MagEditError, Result};
    pub use crate::gallery::{Gallery, GalleryEntry};
    pub use crate::generation::{JobHandle, JobOutcome};
    pub use crate::presets::StylePreset;
    pub use crate::workflow::{Activity, Editor};
}
