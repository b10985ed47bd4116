use std::sync::Arc;

use futures::StreamExt;
use specdraft_common::{Error, Result};
use specdraft_config::AppConfig;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument, warn};

use crate::assembler;
use crate::classifier::DocumentClassifier;
use crate::events::OutputEvent;
use crate::providers::{
    ChatTurn, ModelProvider, MultimodalProvider, TextGenerationProvider, TokenUsage,
};
use crate::request::{GenerationRequest, Mode};
use crate::templates::{PromptPurpose, PromptStore};

/// Substitute for raw provider error text when debug exposure is off.
/// Deliberate information-disclosure boundary, not a lost message.
const GENERIC_UPSTREAM_ERROR: &str = "Upstream model error";

/// Event channel depth. The producer suspends when the consumer lags.
const EVENT_BUFFER: usize = 32;

/// The generation pipeline: template lookup, turn assembly, provider
/// streaming, event normalization, and chat-mode completeness tagging.
///
/// All state here is read-only after construction; each call owns its own
/// turns and buffers, so concurrent requests never share mutable state.
pub struct DraftService {
    prompts: Arc<PromptStore>,
    text_provider: Arc<dyn ModelProvider>,
    vision_provider: Arc<dyn ModelProvider>,
    classifier: DocumentClassifier,
    debug_errors: bool,
}

impl DraftService {
    /// Fails with `Error::Config` when the provider credential is absent;
    /// a service instance without credentials must not serve requests.
    pub fn new(config: &AppConfig, prompts: Arc<PromptStore>) -> Result<Self> {
        let text_provider = TextGenerationProvider::from_config(&config.provider)?;
        let vision_provider = MultimodalProvider::from_config(&config.provider)?;
        Ok(Self {
            prompts,
            text_provider: Arc::new(text_provider),
            vision_provider: Arc::new(vision_provider),
            classifier: DocumentClassifier::new((&config.classifier).into()),
            debug_errors: config.provider.debug_errors,
        })
    }

    /// Construction seam for tests and alternative providers.
    pub fn with_providers(
        prompts: Arc<PromptStore>,
        text_provider: Arc<dyn ModelProvider>,
        vision_provider: Arc<dyn ModelProvider>,
        classifier: DocumentClassifier,
        debug_errors: bool,
    ) -> Self {
        Self {
            prompts,
            text_provider,
            vision_provider,
            classifier,
            debug_errors,
        }
    }

    /// Starts one generation call and returns its event stream.
    ///
    /// The producer runs as a spawned task feeding a bounded channel;
    /// dropping the returned stream cancels it, so a disconnected client
    /// does not keep an upstream call alive.
    #[instrument(skip(self, request), fields(mode = ?request.mode, session_id = request.session_id.as_deref()))]
    pub fn stream_events(&self, request: GenerationRequest) -> Result<ReceiverStream<OutputEvent>> {
        let turns = self.assemble_turns(&request)?;
        let provider = self.select_provider(&request);
        let emit_metadata = request.mode == Mode::Chat;

        if !request.images.is_empty() {
            let total_bytes: u64 = request
                .images
                .iter()
                .map(|img| img.size.unwrap_or_else(|| img.estimated_bytes()))
                .sum();
            info!(
                count = request.images.len(),
                total_mib = format!("{:.2}", total_bytes as f64 / (1024.0 * 1024.0)),
                provider = provider.provider_id(),
                "image attachments included in request"
            );
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let classifier = self.classifier.clone();
        let debug_errors = self.debug_errors;
        tokio::spawn(async move {
            run_stream(provider, turns, emit_metadata, classifier, debug_errors, tx).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Synchronous collection: drains the same event stream and returns
    /// the concatenated content. Any embedded `error` event is promoted
    /// to a single upstream failure; partial text is discarded.
    pub async fn collect_markdown(&self, request: GenerationRequest) -> Result<String> {
        let mut events = self.stream_events(request)?;
        let mut markdown = String::new();

        while let Some(event) = events.next().await {
            match event {
                OutputEvent::Content { content } => markdown.push_str(&content),
                OutputEvent::Error { message, .. } => {
                    return Err(Error::Upstream(message));
                }
                OutputEvent::Reasoning { .. }
                | OutputEvent::Usage { .. }
                | OutputEvent::Metadata { .. } => {}
            }
        }

        Ok(markdown)
    }

    fn assemble_turns(&self, request: &GenerationRequest) -> Result<Vec<ChatTurn>> {
        match request.mode {
            Mode::Generate => {
                let template = self.prompts.get(PromptPurpose::Generate);
                Ok(assembler::assemble_generate(
                    template,
                    &request.message,
                    &request.images,
                ))
            }
            Mode::Chat => {
                let document = request
                    .current_document
                    .as_deref()
                    .filter(|doc| !doc.trim().is_empty())
                    .ok_or_else(|| {
                        Error::Validation(
                            "chat mode requires a non-empty current_document".to_string(),
                        )
                    })?;
                let template = self.prompts.get(PromptPurpose::Chat);
                Ok(assembler::assemble_chat(
                    template,
                    document,
                    &request.message,
                    &request.images,
                ))
            }
        }
    }

    /// Requests with images target the vision-capable variant.
    fn select_provider(&self, request: &GenerationRequest) -> Arc<dyn ModelProvider> {
        if request.images.is_empty() {
            Arc::clone(&self.text_provider)
        } else {
            Arc::clone(&self.vision_provider)
        }
    }
}

/// The producer loop. Per incremental unit: a failure becomes one `error`
/// event and the loop continues (a single bad unit is non-fatal); a
/// reasoning fragment precedes a content fragment from the same unit;
/// usage counters are remembered and emitted once at the end. A transport
/// error yields exactly one `error` event and ends the sequence with no
/// trailing metadata or usage.
async fn run_stream(
    provider: Arc<dyn ModelProvider>,
    turns: Vec<ChatTurn>,
    emit_metadata: bool,
    classifier: DocumentClassifier,
    debug_errors: bool,
    tx: mpsc::Sender<OutputEvent>,
) {
    let mut chunks = match provider.stream(&turns).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!(provider = provider.provider_id(), error = %e, "provider call failed");
            let _ = tx
                .send(OutputEvent::Error {
                    message: exposed_message(&e.to_string(), debug_errors),
                    code: None,
                })
                .await;
            return;
        }
    };

    let mut buffered = String::new();
    let mut last_usage: Option<TokenUsage> = None;

    while let Some(item) = chunks.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(provider = provider.provider_id(), error = %e, "stream transport error");
                let _ = tx
                    .send(OutputEvent::Error {
                        message: exposed_message(&e.to_string(), debug_errors),
                        code: None,
                    })
                    .await;
                return;
            }
        };

        if let Some(failure) = chunk.failure {
            let event = OutputEvent::Error {
                message: exposed_message(&failure.message, debug_errors),
                code: failure.code,
            };
            if tx.send(event).await.is_err() {
                return;
            }
            continue;
        }

        if let Some(reasoning) = chunk.reasoning
            && tx.send(OutputEvent::Reasoning { content: reasoning }).await.is_err()
        {
            return;
        }

        if let Some(content) = chunk.content {
            if emit_metadata {
                buffered.push_str(&content);
            }
            if tx.send(OutputEvent::Content { content }).await.is_err() {
                return;
            }
        }

        if chunk.usage.is_some() {
            last_usage = chunk.usage;
        }
    }

    if emit_metadata && !buffered.is_empty() {
        let is_full_document = classifier.is_full_document(&buffered);
        if tx
            .send(OutputEvent::Metadata { is_full_document })
            .await
            .is_err()
        {
            return;
        }
    }

    if let Some(usage) = last_usage {
        let _ = tx
            .send(OutputEvent::usage(usage.input_tokens, usage.output_tokens))
            .await;
    }
}

fn exposed_message(raw: &str, debug_errors: bool) -> String {
    if debug_errors {
        raw.to_string()
    } else {
        GENERIC_UPSTREAM_ERROR.to_string()
    }
}
