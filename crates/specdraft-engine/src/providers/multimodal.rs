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

const MULTIMODAL_PATH: &str = "/services/aigc/multimodal-generation/generation";

/// Vision-capable DashScope generation. Targeted whenever a request
/// carries image attachments; turn content goes up as ordered part lists.
pub struct MultimodalProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl MultimodalProvider {
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
            model: config.vision_model.clone(),
        })
    }

    fn request_body(&self, turns: &[ChatTurn]) -> ApiRequest {
        let messages = turns
            .iter()
            .map(|turn| ApiMessage {
                role: role_name(turn.role),
                content: to_part_list(&turn.content),
            })
            .collect();

        ApiRequest {
            model: self.model.clone(),
            input: ApiInput { messages },
            parameters: ApiParameters {
                incremental_output: true,
            },
        }
    }
}

#[async_trait]
impl ModelProvider for MultimodalProvider {
    fn provider_id(&self) -> &str {
        "dashscope-vision"
    }

    async fn stream(&self, turns: &[ChatTurn]) -> Result<ChunkStream> {
        let url = format!("{}{}", self.base_url, MULTIMODAL_PATH);
        let body = self.request_body(turns);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-SSE", "enable")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("multimodal request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "multimodal call rejected (HTTP {status}): {text}"
            )));
        }

        let lines = sse::data_lines(response.bytes_stream().boxed());
        let chunks = lines
            .filter_map(|line| async move {
                match line {
                    Ok(data) => match serde_json::from_str::<ApiChunk>(&data) {
                        Ok(chunk) => Some(Ok(normalize_chunk(chunk))),
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

/// Multimodal content is always a part list, even for plain text turns.
fn to_part_list(content: &TurnContent) -> Vec<ApiContentItem> {
    match content {
        TurnContent::Text(text) => vec![ApiContentItem::Text { text: text.clone() }],
        TurnContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => ApiContentItem::Text { text: text.clone() },
                ContentPart::Image { url } => ApiContentItem::Image { image: url.clone() },
            })
            .collect(),
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
        normalized.content = extract_text(choice.message.content).filter(|s| !s.is_empty());
    }
    normalized.usage = chunk.usage.map(|u| TokenUsage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
    });
    normalized
}

/// The vision endpoint replies with either a bare string or a list of
/// text items; either way only the text survives normalization.
fn extract_text(content: Option<ApiResponseContent>) -> Option<String> {
    match content? {
        ApiResponseContent::Text(text) => Some(text),
        ApiResponseContent::Items(items) => {
            let joined: String = items
                .into_iter()
                .filter_map(|item| item.text)
                .collect::<Vec<_>>()
                .join("");
            Some(joined)
        }
    }
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
    content: Vec<ApiContentItem>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ApiContentItem {
    Text { text: String },
    Image { image: String },
}

#[derive(Serialize)]
struct ApiParameters {
    incremental_output: bool,
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
    content: Option<ApiResponseContent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApiResponseContent {
    Text(String),
    Items(Vec<ApiResponseItem>),
}

#[derive(Deserialize)]
struct ApiResponseItem {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
