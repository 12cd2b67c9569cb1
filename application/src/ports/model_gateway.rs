//! Model gateway port
//!
//! Defines the interface to the model streaming service. The engine never
//! sees tokens as anything but opaque text; what it cares about is the
//! terminal finish reason each stream converges to.

use async_trait::async_trait;
use roundtable_domain::{FinishReason, Message};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur starting or driving a model stream
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,
}

/// Everything a participant turn's stream needs
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub thread_id: String,
    pub round: u32,
    pub participant_index: u32,
    pub model_id: String,
    pub role: Option<String>,
    /// Generation context in log order (earlier rounds plus completed
    /// same-round turns)
    pub history: Vec<Message>,
}

/// Everything a moderation stream needs
#[derive(Debug, Clone)]
pub struct ModerationRequest {
    pub thread_id: String,
    pub round: u32,
    pub model_id: String,
    /// The participant messages being synthesized
    pub source_messages: Vec<Message>,
}

/// An event in a streaming model response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk from the model
    Delta(String),
    /// Stream end with its terminal reason
    Completed { finish_reason: FinishReason },
    /// An error that occurred during streaming
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed { .. } | StreamEvent::Error(_))
    }
}

/// What a drained stream converged to. The finish reason is always
/// terminal: errors and dropped transports become `FinishReason::Error`
/// rather than surfacing as a failure of the turn itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub text: String,
    pub finish_reason: FinishReason,
    /// Error detail when `finish_reason` is `Error`
    pub error: Option<String>,
}

/// Handle for receiving streaming events from a model turn.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides a drain-to-terminal
/// helper.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Drain the stream to its terminal event, accumulating delta text.
    ///
    /// Any non-`Unknown` reason is accepted as terminal regardless of
    /// value. A `Completed` carrying `Unknown` is a transport bug and is
    /// coerced to `Stop`; a closed channel without a terminal event is a
    /// dropped connection and becomes `Error`.
    pub async fn collect(mut self) -> TurnOutcome {
        let mut text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => text.push_str(&chunk),
                StreamEvent::Completed { finish_reason } => {
                    let finish_reason = if finish_reason.is_terminal() {
                        finish_reason
                    } else {
                        FinishReason::Stop
                    };
                    return TurnOutcome {
                        text,
                        finish_reason,
                        error: None,
                    };
                }
                StreamEvent::Error(e) => {
                    return TurnOutcome {
                        text,
                        finish_reason: FinishReason::Error,
                        error: Some(e),
                    };
                }
            }
        }
        TurnOutcome {
            text,
            finish_reason: FinishReason::Error,
            error: Some("stream closed before a terminal event".to_string()),
        }
    }
}

/// Gateway to the model streaming service
///
/// This port defines how the engine reaches models. Implementations
/// (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Start a participant turn stream
    async fn start_turn(&self, request: TurnRequest) -> Result<StreamHandle, GatewayError>;

    /// Start a moderation synthesis stream
    async fn start_moderation(
        &self,
        request: ModerationRequest,
    ) -> Result<StreamHandle, GatewayError>;

    /// Run the round's pre-search query, returning the result payload
    async fn fetch_presearch(&self, query: &str) -> Result<serde_json::Value, GatewayError>;
}
