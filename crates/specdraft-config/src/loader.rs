use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::model::{AppConfig, ClassifierConfig, GatewayConfig, ProviderConfig, TemplateConfig};

/// Builds an [`AppConfig`] from process environment variables, falling back
/// to defaults for anything unset. `.env` loading happens in the binary
/// before this runs.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_env() -> AppConfig {
        let gateway = GatewayConfig {
            host: var_or("SPECDRAFT_HOST", || GatewayConfig::default().host),
            port: parsed_var("SPECDRAFT_PORT", GatewayConfig::default().port),
        };

        let defaults = ProviderConfig::default();
        let provider = ProviderConfig {
            api_key: env::var("DASHSCOPE_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            base_url: var_or("DASHSCOPE_BASE_URL", || defaults.base_url.clone()),
            model: var_or("DASHSCOPE_MODEL", || defaults.model.clone()),
            vision_model: var_or("DASHSCOPE_VL_MODEL", || defaults.vision_model.clone()),
            enable_reasoning: bool_var("ENABLE_THINKING", defaults.enable_reasoning),
            debug_errors: bool_var("DEBUG_ERRORS", defaults.debug_errors),
            timeout_secs: parsed_var("PROVIDER_TIMEOUT_SECS", defaults.timeout_secs),
        };

        let template_defaults = TemplateConfig::default();
        let templates = TemplateConfig {
            generate_path: path_var("PROMPT_FILE_PATH", template_defaults.generate_path),
            chat_path: path_var("PROMPT_CHAT_FILE_PATH", template_defaults.chat_path),
        };

        let classifier_defaults = ClassifierConfig::default();
        let classifier = ClassifierConfig {
            required_sections: list_var(
                "CLASSIFIER_REQUIRED_SECTIONS",
                classifier_defaults.required_sections,
            ),
            optional_sections: list_var(
                "CLASSIFIER_OPTIONAL_SECTIONS",
                classifier_defaults.optional_sections,
            ),
        };

        let config = AppConfig {
            gateway,
            provider,
            templates,
            classifier,
        };
        debug!(
            model = %config.provider.model,
            vision_model = %config.provider.vision_model,
            "configuration loaded from environment"
        );
        config
    }
}

fn var_or(key: &str, default: impl FnOnce() -> String) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(default)
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn bool_var(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn path_var(key: &str, default: PathBuf) -> PathBuf {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

fn list_var(key: &str, default: Vec<String>) -> Vec<String> {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() { default } else { items }
}
