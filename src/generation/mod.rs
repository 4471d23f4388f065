//! Remote generation: submission, status polling and transport.

mod poller;
mod submitter;
pub mod transport;
mod types;

pub use poller::{StatusPoller, FAILED_REASON};
pub use submitter::JobSubmitter;
pub use transport::{FetchedBytes, HttpTransport, Transport, TransportResponse};
pub use types::{
    decode_data_url, to_data_url, GenerationRequest, ImageFormat, JobHandle, JobOutcome,
};
