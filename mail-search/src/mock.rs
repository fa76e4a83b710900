//! Scripted transport for testing
//!
//! Replies are handed out in the order requests arrive. Each reply can be
//! delayed and can be told to ignore cancellation, which is how tests
//! reproduce slow or misbehaving servers.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::transport::{RequestTarget, Transport, TransportResponse};

/// One canned reply
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    outcome: std::result::Result<TransportResponse, String>,
    delay: Option<Duration>,
    honor_cancel: bool,
}

impl ScriptedReply {
    /// Reply with a JSON body
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::raw(status, body.to_string().into_bytes())
    }

    /// Reply with an arbitrary body
    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            outcome: Ok(TransportResponse {
                status,
                body: body.into(),
            }),
            delay: None,
            honor_cancel: true,
        }
    }

    /// Fail at the network level
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
            honor_cancel: true,
        }
    }

    /// Wait before replying
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Keep going even after the token fires, like a server that already
    /// committed to the response
    pub fn ignoring_cancel(mut self) -> Self {
        self.honor_cancel = false;
        self
    }
}

/// Request observed by the transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: RequestTarget,
    pub body: serde_json::Value,
    pub cancel: CancellationToken,
}

/// Transport that replays a script
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of replies
    pub fn with_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        let transport = Self::new();
        for reply in replies {
            transport.push(reply);
        }
        transport
    }

    /// Queue another reply
    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.script).push_back(reply);
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        target: &RequestTarget,
        body: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        lock(&self.requests).push(RecordedRequest {
            target: target.clone(),
            body,
            cancel: cancel.clone(),
        });

        let reply = lock(&self.script).pop_front().ok_or_else(|| {
            SearchError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "script exhausted",
            ))
        })?;

        if let Some(delay) = reply.delay {
            if reply.honor_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Scripted reply cancelled while waiting");
                        return Err(SearchError::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            } else {
                tokio::time::sleep(delay).await;
            }
        }

        if reply.honor_cancel && cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        reply.outcome.map_err(|message| {
            SearchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message,
            ))
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
