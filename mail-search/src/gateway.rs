//! Request gateway
//!
//! Wraps a [`Transport`] call and always resolves to a [`GatewayResult`].
//! Transport errors, undecodable bodies and cancellation are folded into
//! tagged outcomes so callers branch on the kind, never on error values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::transport::{RequestTarget, Transport};

/// Status reported when the real one is unavailable
pub const FALLBACK_STATUS: u16 = 500;

/// User-facing message for network and decoding failures
pub const GENERIC_FAILURE_MESSAGE: &str = "there was an error, try again later";

/// Uniform outcome of a gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResult<T> {
    /// Transport completed and the body decoded
    Success { payload: T, status: u16 },
    /// The cancellation token fired before or during the request
    Cancelled,
    /// Network error, undecodable body or any other non-cancellation failure
    Failed { message: String, status: u16 },
}

impl<T> GatewayResult<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    fn failed() -> Self {
        Self::Failed {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
            status: FALLBACK_STATUS,
        }
    }
}

/// Executes requests through a shared transport
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
}

impl RequestGateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send `payload` to `target` and decode the body as `T`.
    ///
    /// Never fails: every error path resolves to a [`GatewayResult`] variant.
    pub async fn execute<T, P>(
        &self,
        target: &RequestTarget,
        payload: &P,
        cancel: &CancellationToken,
    ) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        if cancel.is_cancelled() {
            return GatewayResult::Cancelled;
        }

        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode request for {}: {}", target.url, e);
                return GatewayResult::failed();
            }
        };

        let response = match self.transport.send(target, body, cancel).await {
            Ok(response) => response,
            Err(SearchError::Cancelled) => return GatewayResult::Cancelled,
            // An abort can surface as an ordinary transport error
            Err(_) if cancel.is_cancelled() => return GatewayResult::Cancelled,
            Err(e) => {
                warn!("Request to {} failed: {}", target.url, e);
                return GatewayResult::failed();
            }
        };

        if cancel.is_cancelled() {
            debug!("Discarding response from {} after cancellation", target.url);
            return GatewayResult::Cancelled;
        }

        match serde_json::from_slice::<T>(&response.body) {
            Ok(payload) => GatewayResult::Success {
                payload,
                status: response.status,
            },
            Err(e) => {
                warn!(
                    "Invalid JSON from {} (HTTP {}): {}",
                    target.url, response.status, e
                );
                GatewayResult::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{ApiResponse, MailPage};
    use crate::transport::TransportResponse;
    use serde_json::json;

    mockall::mock! {
        pub Wire {}

        #[async_trait::async_trait]
        impl Transport for Wire {
            async fn send(
                &self,
                target: &RequestTarget,
                body: serde_json::Value,
                cancel: &CancellationToken,
            ) -> Result<TransportResponse>;
        }
    }

    fn target() -> RequestTarget {
        RequestTarget::post("http://localhost:8080/api/mails/search")
    }

    fn reply(status: u16, body: serde_json::Value) -> TransportResponse {
        TransportResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_success_keeps_transport_status() {
        let mut wire = MockWire::new();
        wire.expect_send().times(1).returning(|_, _, _| {
            Ok(reply(
                200,
                json!({ "msg": "success", "data": { "mails": [], "total": 0 }, "status": 418 }),
            ))
        });

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({ "query": "" }), &CancellationToken::new())
            .await;

        match result {
            GatewayResult::Success { payload, status } => {
                assert_eq!(status, 200);
                assert_eq!(payload.msg, "success");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_body_is_still_success_kind() {
        let mut wire = MockWire::new();
        wire.expect_send()
            .returning(|_, _, _| Ok(reply(500, json!({ "msg": "error", "error": "db down" }))));

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({}), &CancellationToken::new())
            .await;

        match result {
            GatewayResult::Success { payload, status } => {
                assert_eq!(status, 500);
                assert_eq!(payload.error_message(), Some("db down"));
            }
            other => panic!("expected decoded body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_fails_with_generic_message() {
        let mut wire = MockWire::new();
        wire.expect_send().returning(|_, _, _| {
            Ok(TransportResponse {
                status: 502,
                body: b"<html>Bad Gateway</html>".to_vec(),
            })
        });

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({}), &CancellationToken::new())
            .await;

        assert_eq!(
            result,
            GatewayResult::Failed {
                message: GENERIC_FAILURE_MESSAGE.to_string(),
                status: FALLBACK_STATUS,
            }
        );
    }

    #[tokio::test]
    async fn test_network_error_fails() {
        let mut wire = MockWire::new();
        wire.expect_send().returning(|_, _, _| {
            Err(SearchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        });

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({}), &CancellationToken::new())
            .await;

        assert!(matches!(result, GatewayResult::Failed { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_transport_cancellation_is_reported_as_cancelled() {
        let mut wire = MockWire::new();
        wire.expect_send()
            .returning(|_, _, _| Err(SearchError::Cancelled));

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({}), &CancellationToken::new())
            .await;

        assert!(result.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_transport() {
        let mut wire = MockWire::new();
        wire.expect_send().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> =
            gateway.execute(&target(), &json!({}), &cancel).await;

        assert!(result.is_cancelled());
    }

    #[tokio::test]
    async fn test_response_after_cancellation_is_dropped() {
        let mut wire = MockWire::new();
        wire.expect_send().returning(|_, _, cancel| {
            // Transport ignored the abort and completed anyway
            cancel.cancel();
            Ok(reply(200, json!({ "msg": "success", "data": { "mails": [], "total": 9 } })))
        });

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({}), &CancellationToken::new())
            .await;

        assert!(result.is_cancelled());
    }

    #[tokio::test]
    async fn test_error_after_cancellation_is_cancelled() {
        let mut wire = MockWire::new();
        wire.expect_send().returning(|_, _, cancel| {
            cancel.cancel();
            Err(SearchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "aborted",
            )))
        });

        let gateway = RequestGateway::new(Arc::new(wire));
        let result: GatewayResult<ApiResponse<MailPage>> = gateway
            .execute(&target(), &json!({}), &CancellationToken::new())
            .await;

        assert!(result.is_cancelled());
    }
}
