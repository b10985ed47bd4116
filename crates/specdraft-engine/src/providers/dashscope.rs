use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use specdraft_common::{Error, Result};
use specdraft_config::ProviderConfig;

use super::sse;
use super::{
    ChatRole, ChatTurn, ChunkStream, ContentPart, ModelProvider, ProviderChunk, TokenUsage,
    TurnContent,
};

const TEXT_GENERATION_PATH: &str = "/services/aigc/text-generation/generation";

/// Text-only DashScope generation. Supports the model's reasoning stream
/// when `enable_reasoning` is on.
pub struct TextGenerationProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    enable_reasoning: bool,
}

impl TextGenerationProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("DASHSCOPE_API_KEY is not set".to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            enable_reasoning: config.enable_reasoning,
        })
    }

    fn request_body(&self, turns: &[ChatTurn]) -> ApiRequest {
        let messages = turns
            .iter()
            .map(|turn| ApiMessage {
                role: role_name(turn.role),
                content: flatten_text(&turn.content),
            })
            .collect();

        ApiRequest {
            model: self.model.clone(),
            input: ApiInput { messages },
            parameters: ApiParameters {
                result_format: "message",
                incremental_output: true,
                enable_thinking: self.enable_reasoning,
            },
        }
    }
}

#[async_trait]
impl ModelProvider for TextGenerationProvider {
    fn provider_id(&self) -> &str {
        "dashscope-text"
    }

    async fn stream(&self, turns: &[ChatTurn]) -> Result<ChunkStream> {
        let url = format!("{}{}", self.base_url, TEXT_GENERATION_PATH);
        let body = self.request_body(turns);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-SSE", "enable")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "generation call rejected (HTTP {status}): {text}"
            )));
        }

        let lines = sse::data_lines(response.bytes_stream().boxed());
        let chunks = lines
            .filter_map(|line| async move {
                match line {
                    Ok(data) => match serde_json::from_str::<ApiChunk>(&data) {
                        Ok(chunk) => Some(Ok(normalize_chunk(chunk))),
                        // Malformed frames are skipped; the call stays alive.
                        Err(_) => None,
                    },
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed();

        Ok(chunks)
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// The text endpoint takes plain string content. Part lists only occur on
/// the multimodal path, but a stray one degrades to its text parts.
fn flatten_text(content: &TurnContent) -> String {
    match content {
        TurnContent::Text(text) => text.clone(),
        TurnContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn normalize_chunk(chunk: ApiChunk) -> ProviderChunk {
    if let Some(code) = chunk.code.filter(|c| !c.is_empty()) {
        return ProviderChunk::failure(chunk.message.unwrap_or_default(), Some(code));
    }

    let mut normalized = ProviderChunk::default();
    if let Some(output) = chunk.output
        && let Some(choice) = output.choices.into_iter().next()
    {
        normalized.reasoning = choice.message.reasoning_content.filter(|s| !s.is_empty());
        normalized.content = choice.message.content.filter(|s| !s.is_empty());
    }
    normalized.usage = chunk.usage.map(|u| TokenUsage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
    });
    normalized
}

// Request types

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    input: ApiInput,
    parameters: ApiParameters,
}

#[derive(Serialize)]
struct ApiInput {
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ApiParameters {
    result_format: &'static str,
    incremental_output: bool,
    enable_thinking: bool,
}

// Response types

#[derive(Deserialize)]
struct ApiChunk {
    output: Option<ApiOutput>,
    usage: Option<ApiUsage>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ApiOutput {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_chunks_keep_code_and_message() {
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"code":"Throttling.RateQuota","message":"requests throttled"}"#,
        )
        .unwrap();
        let normalized = normalize_chunk(chunk);
        let failure = normalized.failure.expect("failure expected");
        assert_eq!(failure.code.as_deref(), Some("Throttling.RateQuota"));
        assert_eq!(failure.message, "requests throttled");
        assert!(normalized.content.is_none());
    }

    #[test]
    fn reasoning_and_content_become_explicit_fields() {
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"output":{"choices":[{"message":{"content":"Hi","reasoning_content":"thinking"}}]}}"#,
        )
        .unwrap();
        let normalized = normalize_chunk(chunk);
        assert_eq!(normalized.reasoning.as_deref(), Some("thinking"));
        assert_eq!(normalized.content.as_deref(), Some("Hi"));
        assert!(normalized.failure.is_none());
    }

    #[test]
    fn empty_fragments_are_dropped() {
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"output":{"choices":[{"message":{"content":"","reasoning_content":""}}]},"usage":{"input_tokens":7,"output_tokens":3}}"#,
        )
        .unwrap();
        let normalized = normalize_chunk(chunk);
        assert!(normalized.reasoning.is_none());
        assert!(normalized.content.is_none());
        assert_eq!(
            normalized.usage,
            Some(TokenUsage {
                input_tokens: 7,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn part_lists_flatten_to_their_text() {
        let content = TurnContent::Parts(vec![
            ContentPart::Image {
                url: "data:image/png;base64,AAA".to_string(),
            },
            ContentPart::Text {
                text: "describe this".to_string(),
            },
        ]);
        assert_eq!(flatten_text(&content), "describe this");
    }
}
