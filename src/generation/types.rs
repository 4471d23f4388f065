//! Core types for the generation workflow.

use crate::error::{MagEditError, Result};
use base64::Engine;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Encodes raw image bytes as a `data:` URI. Unknown formats are labelled PNG.
pub fn to_data_url(data: &[u8]) -> String {
    let format = ImageFormat::from_magic_bytes(data).unwrap_or_default();
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// Decodes a base64 `data:` URI into its format and raw bytes.
pub fn decode_data_url(url: &str) -> Result<(ImageFormat, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| MagEditError::Decode("not a data URI".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MagEditError::Decode("data URI has no payload".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MagEditError::Decode("data URI is not base64 encoded".into()))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| MagEditError::Decode(e.to_string()))?;
    let format = ImageFormat::from_magic_bytes(&data)
        .or_else(|| ImageFormat::from_mime_type(mime))
        .unwrap_or_default();
    Ok((format, data))
}

/// A request to restyle an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The style prompt sent to the service.
    pub prompt: String,
    /// Source image as a data URI. Omitted for prompt-only generation.
    pub source_image: Option<String>,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_image: None,
        }
    }

    /// Attaches a source image (data URI).
    pub fn with_source_image(mut self, image: impl Into<String>) -> Self {
        self.source_image = Some(image.into());
        self
    }

    /// Returns true if this request restyles an existing image.
    pub fn is_edit(&self) -> bool {
        self.source_image.is_some()
    }
}

/// Locator returned by the service for an accepted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    status_url: String,
}

impl JobHandle {
    /// Wraps a status URL. Empty locators are rejected.
    pub fn new(status_url: impl Into<String>) -> Result<Self> {
        let status_url = status_url.into();
        if status_url.trim().is_empty() {
            return Err(MagEditError::Protocol("empty status URL".into()));
        }
        Ok(Self { status_url })
    }

    /// The status URL to poll.
    pub fn status_url(&self) -> &str {
        &self.status_url
    }
}

/// How a polled job resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job finished and produced an artifact.
    Completed {
        /// Where the generated image can be fetched.
        artifact_url: String,
    },
    /// The service reported the job as failed.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
    /// No terminal status within the attempt bound.
    TimedOut {
        /// Status requests issued before giving up.
        attempts: u32,
    },
    /// The caller cancelled polling.
    Cancelled,
}

impl JobOutcome {
    /// Converts the outcome into the artifact URL, or the matching error.
    pub fn into_artifact_url(self) -> Result<String> {
        match self {
            Self::Completed { artifact_url } => Ok(artifact_url),
            Self::Failed { reason } => Err(MagEditError::GenerationFailed(reason)),
            Self::TimedOut { attempts } => Err(MagEditError::TimedOut { attempts }),
            Self::Cancelled => Err(MagEditError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_data_url_uses_detected_mime() {
        assert!(to_data_url(&JPEG_MAGIC).starts_with("data:image/jpeg;base64,"));
        assert!(to_data_url(b"not an image at all").starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_decode_data_url() {
        let url = to_data_url(&WEBP_MAGIC);
        let (format, data) = decode_data_url(&url).unwrap();
        assert_eq!(format, ImageFormat::WebP);
        assert_eq!(data, WEBP_MAGIC.to_vec());

        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png,plain").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_job_handle_rejects_empty_locator() {
        assert!(JobHandle::new("").is_err());
        assert!(JobHandle::new("   ").is_err());
        let handle = JobHandle::new("https://engine.example/status/1").unwrap();
        assert_eq!(handle.status_url(), "https://engine.example/status/1");
    }

    #[test]
    fn test_outcome_into_artifact_url() {
        let ok = JobOutcome::Completed {
            artifact_url: "https://cdn.example/a.png".into(),
        };
        assert_eq!(ok.into_artifact_url().unwrap(), "https://cdn.example/a.png");

        let timed_out = JobOutcome::TimedOut { attempts: 30 }.into_artifact_url();
        assert!(matches!(timed_out, Err(MagEditError::TimedOut { attempts: 30 })));

        let cancelled = JobOutcome::Cancelled.into_artifact_url();
        assert!(matches!(cancelled, Err(MagEditError::Cancelled)));
    }

    #[test]
    fn test_request_builder() {
        let req = GenerationRequest::new("vogue cover");
        assert!(!req.is_edit());
        let req = req.with_source_image("data:image/png;base64,AAAA");
        assert!(req.is_edit());
    }
}
