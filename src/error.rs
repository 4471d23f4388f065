//! Error types for the generate/poll/persist workflow.

/// Broad classification of a [`MagEditError`], used by callers to decide
/// how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No API credential configured.
    Auth,
    /// The remote service answered with an error or could not be reached.
    Remote,
    /// A well-formed response was missing an expected field.
    Protocol,
    /// The remote job finished in a failed state.
    GenerationFailed,
    /// The poll bound was exceeded; the job may still complete server-side.
    TimedOut,
    /// The caller cancelled the operation.
    Cancelled,
    /// Local persistence rejected a write.
    Quota,
    /// Local failures: I/O, decoding, invalid input, a cycle already running.
    Local,
}

/// Errors that can occur while generating, polling or persisting results.
#[derive(Debug, thiserror::Error)]
pub enum MagEditError {
    /// API token missing.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote service returned a non-success response.
    #[error("{message}")]
    Remote {
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        /// Message taken from the response body or status text.
        message: String,
    },

    /// Transport-level failure talking to the remote service.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The artifact URL was no longer valid when fetched.
    #[error("artifact URL expired")]
    UrlExpired,

    /// A response was missing a field the workflow depends on.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// The remote job reported failure.
    #[error("{0}")]
    GenerationFailed(String),

    /// Polling gave up before the job reached a terminal status.
    #[error("image generation timed out after {attempts} status checks")]
    TimedOut {
        /// Number of status requests issued.
        attempts: u32,
    },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The local store refused a write because its quota is exhausted.
    #[error("storage quota exceeded: {0}")]
    Quota(String),

    /// A generation cycle is already in flight.
    #[error("a generation is already in progress")]
    Busy,

    /// Invalid input (unknown preset, malformed data URI, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MagEditError {
    /// Builds a [`MagEditError::Remote`] error.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Remote { .. } | Self::Network(_) | Self::UrlExpired => ErrorKind::Remote,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::GenerationFailed(_) => ErrorKind::GenerationFailed,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Quota(_) => ErrorKind::Quota,
            Self::Busy
            | Self::InvalidRequest(_)
            | Self::Decode(_)
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Local,
        }
    }
}

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, MagEditError>;

/// Trims a remote error body down to something fit for display.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    const MAX_LEN: usize = 300;

    let text = text.trim();
    if text.chars().count() <= MAX_LEN {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_LEN).collect();
    format!("{truncated}...")
}
