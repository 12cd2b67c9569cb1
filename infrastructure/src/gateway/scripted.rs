//! Scripted model gateway.
//!
//! Streams canned responses word by word over the same channel protocol a
//! real model service would use. This is the default gateway for the CLI
//! demo and for exercising the engine without network access.

use async_trait::async_trait;
use roundtable_application::ports::{
    GatewayError, ModelGateway, ModerationRequest, StreamEvent, StreamHandle, TurnRequest,
};
use roundtable_domain::FinishReason;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// [`ModelGateway`] that plays back configured responses
pub struct ScriptedGateway {
    /// Reply per model id; models without an entry get the fallback
    replies: HashMap<String, String>,
    fallback: String,
    presearch_payload: serde_json::Value,
    /// Pause between streamed chunks; zero for instant playback
    chunk_delay: Duration,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            fallback: "I have considered the question and have nothing to add.".to_string(),
            presearch_payload: serde_json::json!({ "results": [] }),
            chunk_delay: Duration::ZERO,
        }
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, model_id: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(model_id.into(), reply.into());
        self
    }

    pub fn with_presearch_payload(mut self, payload: serde_json::Value) -> Self {
        self.presearch_payload = payload;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    fn stream_text(&self, text: String) -> StreamHandle {
        let (tx, rx) = mpsc::channel(32);
        let delay = self.chunk_delay;
        tokio::spawn(async move {
            for word in text.split_inclusive(' ') {
                if tx.send(StreamEvent::Delta(word.to_string())).await.is_err() {
                    return; // receiver gone, stop streaming
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            let _ = tx
                .send(StreamEvent::Completed { finish_reason: FinishReason::Stop })
                .await;
        });
        StreamHandle::new(rx)
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn start_turn(&self, request: TurnRequest) -> Result<StreamHandle, GatewayError> {
        debug!(
            model = %request.model_id,
            round = request.round,
            index = request.participant_index,
            history = request.history.len(),
            "scripted turn"
        );
        let reply = self
            .replies
            .get(&request.model_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        Ok(self.stream_text(reply))
    }

    async fn start_moderation(
        &self,
        request: ModerationRequest,
    ) -> Result<StreamHandle, GatewayError> {
        debug!(model = %request.model_id, round = request.round, "scripted moderation");
        let text = format!(
            "Synthesis of {} perspectives: the participants broadly agree.",
            request.source_messages.len()
        );
        Ok(self.stream_text(text))
    }

    async fn fetch_presearch(&self, query: &str) -> Result<serde_json::Value, GatewayError> {
        debug!(query, "scripted pre-search");
        Ok(self.presearch_payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_domain::Message;

    fn request(model: &str) -> TurnRequest {
        TurnRequest {
            thread_id: "t1".to_string(),
            round: 0,
            participant_index: 0,
            model_id: model.to_string(),
            role: None,
            history: vec![Message::user("t1", 0, "q", chrono::Utc::now())],
        }
    }

    #[tokio::test]
    async fn configured_reply_streams_to_completion() {
        let gateway = ScriptedGateway::new().with_reply("gpt-5", "short answer");
        let handle = gateway.start_turn(request("gpt-5")).await.unwrap();
        let outcome = handle.collect().await;
        assert_eq!(outcome.text, "short answer");
        assert_eq!(outcome.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn unknown_model_gets_the_fallback() {
        let gateway = ScriptedGateway::new();
        let handle = gateway.start_turn(request("mystery-model")).await.unwrap();
        let outcome = handle.collect().await;
        assert!(outcome.text.contains("nothing to add"));
    }

    #[tokio::test]
    async fn moderation_mentions_source_count() {
        let gateway = ScriptedGateway::new();
        let handle = gateway
            .start_moderation(ModerationRequest {
                thread_id: "t1".to_string(),
                round: 0,
                model_id: "gpt-5".to_string(),
                source_messages: vec![
                    Message::participant("t1", 0, 0, chrono::Utc::now()),
                    Message::participant("t1", 0, 1, chrono::Utc::now()),
                ],
            })
            .await
            .unwrap();
        let outcome = handle.collect().await;
        assert!(outcome.text.starts_with("Synthesis of 2"));
    }
}
