//! Fixed-interval status polling.

use crate::error::{MagEditError, Result};
use crate::generation::transport::Transport;
use crate::generation::types::{JobHandle, JobOutcome};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Reason reported when the service marks a job as failed.
pub const FAILED_REASON: &str = "Image generation failed.";

/// Progress of a polled job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollState {
    /// Waiting for the next status check (1-based).
    Pending {
        /// The attempt about to be made.
        attempt: u32,
    },
    /// Reached a terminal outcome.
    Done(JobOutcome),
}

impl PollState {
    /// Advances the machine with one status response.
    fn advance(self, status: StatusResponse, max_attempts: u32) -> Result<Self> {
        let attempt = match self {
            Self::Pending { attempt } => attempt,
            done @ Self::Done(_) => return Ok(done),
        };

        match status.status.as_deref() {
            Some("COMPLETED") => {
                let artifact_url = status
                    .result
                    .and_then(|r| r.image_url)
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| {
                        MagEditError::Protocol("completed job has no result.image_url".into())
                    })?;
                Ok(Self::Done(JobOutcome::Completed { artifact_url }))
            }
            Some("FAILED") => Ok(Self::Done(JobOutcome::Failed {
                reason: FAILED_REASON.into(),
            })),
            _ if attempt >= max_attempts => {
                Ok(Self::Done(JobOutcome::TimedOut { attempts: attempt }))
            }
            _ => Ok(Self::Pending {
                attempt: attempt + 1,
            }),
        }
    }
}

/// Polls a job's status locator until it resolves.
pub struct StatusPoller {
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl StatusPoller {
    /// Creates a poller; `max_attempts` is clamped to at least one.
    pub fn new(transport: Arc<dyn Transport>, poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            transport,
            poll_interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Polls until the job completes, fails, times out or `cancel` fires.
    ///
    /// Transport failures and non-success statuses abort immediately; there
    /// is no retry beyond the in-progress loop.
    pub async fn poll(
        &self,
        handle: &JobHandle,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome> {
        let url = handle.status_url();
        let start = Instant::now();
        let mut state = PollState::Pending { attempt: 1 };

        loop {
            let attempt = match state {
                PollState::Pending { attempt } => attempt,
                PollState::Done(outcome) => {
                    tracing::debug!(
                        status_url = %url,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        ?outcome,
                        "job resolved"
                    );
                    return Ok(outcome);
                }
            };

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(JobOutcome::Cancelled),
                response = self.transport.get(url, token) => response?,
            };

            if !response.is_success() {
                return Err(MagEditError::remote(
                    Some(response.status),
                    format!("Status Check Failed: {}", response.reason),
                ));
            }

            let status: StatusResponse = serde_json::from_str(&response.body).map_err(|e| {
                MagEditError::Protocol(format!("status response is not valid JSON: {e}"))
            })?;

            state = state.advance(status, self.max_attempts)?;

            if let PollState::Pending { .. } = state {
                tracing::debug!(
                    status_url = %url,
                    attempt,
                    elapsed_secs = start.elapsed().as_secs(),
                    "job still in progress"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(JobOutcome::Cancelled),
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<StatusResult>,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    #[serde(default)]
    image_url: Option<String>,
}
