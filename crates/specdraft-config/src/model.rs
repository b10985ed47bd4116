use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration, built once at startup and shared by reference.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub provider: ProviderConfig,
    pub templates: TemplateConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8100,
        }
    }
}

/// Settings for the upstream model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API credential. Absence is fatal at service construction.
    pub api_key: Option<String>,
    /// Base URL of the DashScope-compatible API.
    pub base_url: String,
    /// Model identifier for text-only requests.
    pub model: String,
    /// Model identifier used when the request carries images.
    pub vision_model: String,
    /// Forward the model's reasoning stream when it offers one.
    pub enable_reasoning: bool,
    /// Expose raw provider error messages in the event stream.
    /// When off, messages are replaced with a generic phrase.
    pub debug_errors: bool,
    /// Whole-call deadline for one provider invocation. Not per-chunk.
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://dashscope.aliyuncs.com/api/v1".to_string(),
            model: "deepseek-v3.2".to_string(),
            vision_model: "qwen-vl-plus".to_string(),
            enable_reasoning: true,
            debug_errors: false,
            timeout_secs: 300,
        }
    }
}

/// Locations of the two instruction templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub generate_path: PathBuf,
    pub chat_path: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            generate_path: PathBuf::from("prompts/prompt.md"),
            chat_path: PathBuf::from("prompts/prompt-chat.md"),
        }
    }
}

/// Section labels driving the completeness classifier. The matching
/// algorithm lives in the engine; only the vocabulary is configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub required_sections: Vec<String>,
    pub optional_sections: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            required_sections: vec![
                "background".to_string(),
                "requirements".to_string(),
                "overview".to_string(),
            ],
            optional_sections: vec![
                "acceptance scenarios".to_string(),
                "user stories".to_string(),
                "exception handling".to_string(),
                "user flow".to_string(),
            ],
        }
    }
}
