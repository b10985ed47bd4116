use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use specdraft_common::Result;

pub mod dashscope;
pub mod multimodal;
pub(crate) mod sse;

pub use dashscope::TextGenerationProvider;
pub use multimodal::MultimodalProvider;

/// One role-tagged unit of conversation content sent to the model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: TurnContent,
}

impl ChatTurn {
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn parts(role: ChatRole, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: TurnContent::Parts(parts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { url: String },
}

/// Terminal token counters reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A per-unit failure reported inside an otherwise live stream. The call
/// may still recover on the next unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub message: String,
    pub code: Option<String>,
}

/// One incremental provider unit, normalized across the text-only and
/// vision-capable variants. All fields are explicit options: whether a
/// fragment exists is data, not a lookup that can fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderChunk {
    pub reasoning: Option<String>,
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
    pub failure: Option<ChunkFailure>,
}

impl ProviderChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            failure: Some(ChunkFailure {
                message: message.into(),
                code,
            }),
            ..Self::default()
        }
    }
}

pub type ChunkStream = BoxStream<'static, Result<ProviderChunk>>;

/// One streaming call against an upstream model. An `Err` return or an
/// `Err` stream item is a transport failure and ends the call; per-unit
/// provider failures travel as [`ProviderChunk::failure`] instead.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider identifier, used in logs.
    fn provider_id(&self) -> &str;

    /// Invoke the provider's streaming API with the assembled turns.
    async fn stream(&self, turns: &[ChatTurn]) -> Result<ChunkStream>;
}
