//! Job submission against the generation endpoint.

use crate::error::{sanitize_error_message, MagEditError, Result};
use crate::generation::transport::{Transport, TransportResponse};
use crate::generation::types::{GenerationRequest, JobHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sends generation requests and returns a [`JobHandle`] for polling.
pub struct JobSubmitter {
    transport: Arc<dyn Transport>,
    generate_url: String,
}

impl JobSubmitter {
    /// Creates a submitter posting to `generate_url`.
    pub fn new(transport: Arc<dyn Transport>, generate_url: impl Into<String>) -> Self {
        Self {
            transport,
            generate_url: generate_url.into(),
        }
    }

    /// Submits one asynchronous generation job. Never retried.
    pub async fn submit(&self, request: &GenerationRequest, token: &str) -> Result<JobHandle> {
        if token.trim().is_empty() {
            return Err(MagEditError::Auth("no API token configured".into()));
        }

        let body = serde_json::to_value(GenerateBody::from_request(request))?;
        let response = self
            .transport
            .post_json(&self.generate_url, token, &body)
            .await?;

        if !response.is_success() {
            return Err(parse_error(&response));
        }

        let submitted: SubmitResponse = serde_json::from_str(&response.body).map_err(|e| {
            MagEditError::Protocol(format!("generation response is not valid JSON: {e}"))
        })?;
        let status_url = submitted
            .status_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                MagEditError::Protocol("No status URL returned from generation API".into())
            })?;

        tracing::debug!(status_url = %status_url, edit = request.is_edit(), "submitted generation job");
        JobHandle::new(status_url)
    }
}

fn parse_error(response: &TransportResponse) -> MagEditError {
    let message = serde_json::from_str::<ErrorResponse>(&response.body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .map(|m| sanitize_error_message(&m))
        .unwrap_or_else(|| format!("API Error: {}", response.reason));

    MagEditError::remote(Some(response.status), message)
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<&'a str>>,
    sync: bool,
}

impl<'a> GenerateBody<'a> {
    fn from_request(req: &'a GenerationRequest) -> Self {
        Self {
            prompt: &req.prompt,
            images: req.source_image.as_deref().map(|img| vec![img]),
            sync: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    status_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::generation::transport::testing::{Reply, ScriptedTransport};
    use serde_json::json;

    const URL: &str = "https://engine.example/v2/image/generate";

    fn submitter(transport: &Arc<ScriptedTransport>) -> JobSubmitter {
        JobSubmitter::new(transport.clone(), URL)
    }

    #[test]
    fn test_body_without_image_omits_images() {
        let req = GenerationRequest::new("vogue cover");
        let json = serde_json::to_value(GenerateBody::from_request(&req)).unwrap();
        assert_eq!(json, json!({"prompt": "vogue cover", "sync": false}));
    }

    #[test]
    fn test_body_with_image() {
        let req = GenerationRequest::new("gq cover").with_source_image("data:image/png;base64,AA");
        let json = serde_json::to_value(GenerateBody::from_request(&req)).unwrap();
        assert_eq!(json["images"], json!(["data:image/png;base64,AA"]));
        assert_eq!(json["sync"], json!(false));
    }

    #[tokio::test]
    async fn test_submit_returns_handle() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json(200, json!({"status_url": "https://engine.example/status/abc"})),
        );
        let handle = submitter(&transport)
            .submit(&GenerationRequest::new("vogue cover"), "token")
            .await
            .unwrap();
        assert_eq!(handle.status_url(), "https://engine.example/status/abc");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].url, URL);
        assert_eq!(calls[0].token.as_deref(), Some("token"));
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_call() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = submitter(&transport)
            .submit(&GenerationRequest::new("vogue cover"), "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_error_message_from_body() {
        let transport = Arc::new(
            ScriptedTransport::new().json(422, json!({"message": "prompt rejected"})),
        );
        let err = submitter(&transport)
            .submit(&GenerationRequest::new("x"), "token")
            .await
            .unwrap_err();
        match err {
            MagEditError::Remote { status, message } => {
                assert_eq!(status, Some(422));
                assert_eq!(message, "prompt rejected");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_falls_back_to_status_text() {
        let transport = Arc::new(ScriptedTransport::new().reply(Reply::Status(
            503,
            "Service Unavailable",
            "<html>down</html>".into(),
        )));
        let err = submitter(&transport)
            .submit(&GenerationRequest::new("x"), "token")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API Error: Service Unavailable");
    }

    #[tokio::test]
    async fn test_transport_failure_is_remote() {
        let transport = Arc::new(ScriptedTransport::new().reply(Reply::Unreachable));
        let err = submitter(&transport)
            .submit(&GenerationRequest::new("x"), "token")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_missing_or_empty_status_url_is_protocol_error() {
        for body in [json!({"request_id": "1"}), json!({"status_url": ""})] {
            let transport = Arc::new(ScriptedTransport::new().json(200, body));
            let err = submitter(&transport)
                .submit(&GenerationRequest::new("x"), "token")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Protocol);
        }
    }
}
