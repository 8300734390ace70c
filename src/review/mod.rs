pub mod openai;
pub mod prompt;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

use crate::chunk::Chunk;

/// Fixed pause before every chunk after the first, to stay under the
/// provider's request rate limit.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(20);

const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 800;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    LlmFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// One chat-completion call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Chat-completion capability. [`OpenAiClient`] talks to a real endpoint;
/// tests substitute scripted fakes.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AnalysisError>;
}

/// Sends each chunk to the model in order and joins the answers.
pub struct ReviewRequester {
    model: Arc<dyn ChatModel>,
    model_id: String,
}

impl ReviewRequester {
    pub fn new(model: Arc<dyn ChatModel>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
        }
    }

    /// Review every chunk sequentially. Any failed call aborts the whole
    /// review; nothing is retried.
    pub async fn review(&self, chunks: &[Chunk]) -> Result<String, AnalysisError> {
        let total = chunks.len();
        let mut analyses = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 {
                debug!(delay_secs = RATE_LIMIT_DELAY.as_secs(), "rate limit pause");
                tokio::time::sleep(RATE_LIMIT_DELAY).await;
            }

            let request = ChatRequest {
                model: self.model_id.clone(),
                messages: vec![
                    ChatMessage {
                        role: Role::System,
                        content: prompt::SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: Role::User,
                        content: prompt::build_chunk_prompt(chunk, index, total),
                    },
                ],
                temperature: TEMPERATURE,
                max_tokens: MAX_OUTPUT_TOKENS,
            };

            let span = info_span!("review_chunk", part = index + 1, of = total, files = chunk.files.len());
            let analysis = self.model.complete(&request).instrument(span).await?;
            debug!(part = index + 1, chars = analysis.len(), "received chunk analysis");
            analyses.push(analysis);
        }

        info!(chunks = total, "review complete");
        Ok(analyses.join("\n\n"))
    }
}
