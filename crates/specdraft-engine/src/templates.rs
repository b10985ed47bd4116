use std::fs;
use std::path::{Path, PathBuf};

use specdraft_common::{Error, Result};
use specdraft_config::TemplateConfig;
use tracing::info;

/// Which instruction template a call needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPurpose {
    /// Drafting a new document from scratch.
    Generate,
    /// Discussing or editing an existing document.
    Chat,
}

/// Immutable instruction text plus where it came from.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
    source: PathBuf,
}

impl PromptTemplate {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Both templates, read once at startup and shared read-only for the
/// process lifetime. No invalidation, no hot-reload.
#[derive(Debug)]
pub struct PromptStore {
    generate: PromptTemplate,
    chat: PromptTemplate,
}

impl PromptStore {
    pub fn load(config: &TemplateConfig) -> Result<Self> {
        let generate = read_template(&config.generate_path)?;
        let chat = read_template(&config.chat_path)?;
        info!(
            generate = %generate.source.display(),
            chat = %chat.source.display(),
            "prompt templates loaded"
        );
        Ok(Self { generate, chat })
    }

    pub fn get(&self, purpose: PromptPurpose) -> &PromptTemplate {
        match purpose {
            PromptPurpose::Generate => &self.generate,
            PromptPurpose::Chat => &self.chat,
        }
    }
}

fn read_template(path: &Path) -> Result<PromptTemplate> {
    if !path.exists() {
        return Err(Error::TemplateNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    Ok(PromptTemplate {
        text,
        source: path.to_path_buf(),
    })
}
