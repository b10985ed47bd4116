use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use specdraft_common::{Error, Result};
use specdraft_config::TemplateConfig;
use specdraft_engine::{
    ChatTurn, ChunkStream, DocumentClassifier, DraftService, GenerationRequest, ImageAttachment,
    ImageMime, Mode, ModelProvider, OutputEvent, PromptStore, ProviderChunk, TokenUsage,
};

/// Scripted provider: replays a fixed sequence of units, or refuses the
/// call outright, and records whether it was invoked.
#[derive(Clone)]
enum Script {
    Units(Vec<ScriptItem>),
    RefuseCall(String),
}

#[derive(Clone)]
enum ScriptItem {
    Chunk(ProviderChunk),
    TransportError(String),
}

struct ScriptedProvider {
    id: &'static str,
    script: Script,
    invoked: Arc<AtomicBool>,
}

impl ScriptedProvider {
    fn new(id: &'static str, script: Script) -> (Arc<Self>, Arc<AtomicBool>) {
        let invoked = Arc::new(AtomicBool::new(false));
        let provider = Arc::new(Self {
            id,
            script,
            invoked: Arc::clone(&invoked),
        });
        (provider, invoked)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        self.id
    }

    async fn stream(&self, _turns: &[ChatTurn]) -> Result<ChunkStream> {
        self.invoked.store(true, Ordering::SeqCst);
        match &self.script {
            Script::RefuseCall(message) => Err(Error::Upstream(message.clone())),
            Script::Units(items) => {
                let items: Vec<Result<ProviderChunk>> = items
                    .iter()
                    .map(|item| match item {
                        ScriptItem::Chunk(chunk) => Ok(chunk.clone()),
                        ScriptItem::TransportError(message) => {
                            Err(Error::Upstream(message.clone()))
                        }
                    })
                    .collect();
                Ok(stream::iter(items).boxed())
            }
        }
    }
}

fn prompt_store(dir: &tempfile::TempDir) -> Arc<PromptStore> {
    for name in ["prompt.md", "prompt-chat.md"] {
        let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
        f.write_all(b"instructions").unwrap();
    }
    let config = TemplateConfig {
        generate_path: dir.path().join("prompt.md"),
        chat_path: dir.path().join("prompt-chat.md"),
    };
    Arc::new(PromptStore::load(&config).unwrap())
}

fn service_with(script: Script, debug_errors: bool) -> (DraftService, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let prompts = prompt_store(&dir);
    let (provider, _) = ScriptedProvider::new("scripted-text", script.clone());
    let (vision, _) = ScriptedProvider::new("scripted-vision", script);
    let service = DraftService::with_providers(
        prompts,
        provider,
        vision,
        DocumentClassifier::default(),
        debug_errors,
    );
    (service, dir)
}

fn generate_request(message: &str) -> GenerationRequest {
    GenerationRequest {
        message: message.to_string(),
        stream: true,
        mode: Mode::Generate,
        current_document: None,
        images: Vec::new(),
        session_id: None,
    }
}

fn chat_request(message: &str, document: &str) -> GenerationRequest {
    GenerationRequest {
        message: message.to_string(),
        stream: true,
        mode: Mode::Chat,
        current_document: Some(document.to_string()),
        images: Vec::new(),
        session_id: None,
    }
}

fn content_units(parts: &[&str], usage: Option<(u64, u64)>) -> Vec<ScriptItem> {
    let mut items: Vec<ScriptItem> = parts
        .iter()
        .map(|p| ScriptItem::Chunk(ProviderChunk::content(*p)))
        .collect();
    if let Some((input, output)) = usage {
        let mut chunk = ProviderChunk::default();
        chunk.usage = Some(TokenUsage {
            input_tokens: input,
            output_tokens: output,
        });
        items.push(ScriptItem::Chunk(chunk));
    }
    items
}

async fn collect_events(service: &DraftService, request: GenerationRequest) -> Vec<OutputEvent> {
    service
        .stream_events(request)
        .unwrap()
        .collect::<Vec<_>>()
        .await
}

#[tokio::test]
async fn generate_stream_emits_content_then_usage() {
    let (service, _dir) = service_with(
        Script::Units(content_units(&["A", "B"], Some((10, 5)))),
        false,
    );

    let events = collect_events(&service, generate_request("draft")).await;

    assert_eq!(
        events,
        vec![
            OutputEvent::Content {
                content: "A".to_string()
            },
            OutputEvent::Content {
                content: "B".to_string()
            },
            OutputEvent::Usage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15
            },
        ]
    );
}

#[tokio::test]
async fn reasoning_fragments_interleave_before_content() {
    let (service, _dir) = service_with(
        Script::Units(vec![
            ScriptItem::Chunk(ProviderChunk::reasoning("thinking")),
            ScriptItem::Chunk(ProviderChunk::content("answer")),
        ]),
        false,
    );

    let events = collect_events(&service, generate_request("draft")).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Reasoning {
                content: "thinking".to_string()
            },
            OutputEvent::Content {
                content: "answer".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn chat_metadata_follows_content_and_precedes_usage() {
    let full_doc = "# Background\n\ntext\n\n## Requirements\n\n- item\n";
    let (service, _dir) = service_with(
        Script::Units(content_units(&[full_doc], Some((3, 4)))),
        false,
    );

    let events = collect_events(&service, chat_request("revise", "# Old")).await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], OutputEvent::Content { .. }));
    assert_eq!(
        events[1],
        OutputEvent::Metadata {
            is_full_document: true
        }
    );
    assert!(matches!(events[2], OutputEvent::Usage { total_tokens: 7, .. }));
}

#[tokio::test]
async fn chat_partial_suggestion_is_tagged_not_full() {
    let (service, _dir) = service_with(
        Script::Units(content_units(&["Just tweak the intro paragraph."], None)),
        false,
    );

    let events = collect_events(&service, chat_request("ideas?", "# Old")).await;
    assert_eq!(
        events.last(),
        Some(&OutputEvent::Metadata {
            is_full_document: false
        })
    );
}

#[tokio::test]
async fn generate_mode_never_emits_metadata() {
    let full_doc = "# Background\n\n## Requirements\n";
    let (service, _dir) = service_with(Script::Units(content_units(&[full_doc], None)), false);

    let events = collect_events(&service, generate_request("draft")).await;
    assert!(
        events
            .iter()
            .all(|e| !matches!(e, OutputEvent::Metadata { .. }))
    );
}

#[tokio::test]
async fn refused_call_yields_exactly_one_error_event() {
    let (service, _dir) = service_with(Script::RefuseCall("connect timeout".to_string()), false);

    let events = collect_events(&service, generate_request("draft")).await;
    assert_eq!(
        events,
        vec![OutputEvent::Error {
            message: "Upstream model error".to_string(),
            code: None
        }]
    );
}

#[tokio::test]
async fn transport_error_mid_stream_ends_without_usage() {
    let mut items = content_units(&["partial"], None);
    items.push(ScriptItem::TransportError("reset by peer".to_string()));
    items.push(ScriptItem::Chunk(ProviderChunk::content("never seen")));
    let (service, _dir) = service_with(Script::Units(items), false);

    let events = collect_events(&service, chat_request("revise", "# Old")).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Content {
                content: "partial".to_string()
            },
            OutputEvent::Error {
                message: "Upstream model error".to_string(),
                code: None
            },
        ]
    );
}

#[tokio::test]
async fn unit_failure_is_non_fatal() {
    let (service, _dir) = service_with(
        Script::Units(vec![
            ScriptItem::Chunk(ProviderChunk::failure(
                "throttled",
                Some("Throttling".to_string()),
            )),
            ScriptItem::Chunk(ProviderChunk::content("recovered")),
        ]),
        false,
    );

    let events = collect_events(&service, generate_request("draft")).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Error {
                message: "Upstream model error".to_string(),
                code: Some("Throttling".to_string())
            },
            OutputEvent::Content {
                content: "recovered".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn debug_mode_exposes_raw_provider_messages() {
    let (service, _dir) = service_with(
        Script::Units(vec![ScriptItem::Chunk(ProviderChunk::failure(
            "quota exceeded for key",
            Some("Quota".to_string()),
        ))]),
        true,
    );

    let events = collect_events(&service, generate_request("draft")).await;
    assert_eq!(
        events,
        vec![OutputEvent::Error {
            message: "quota exceeded for key".to_string(),
            code: Some("Quota".to_string())
        }]
    );
}

#[tokio::test]
async fn collected_markdown_matches_streamed_content() {
    let (service, _dir) = service_with(
        Script::Units(content_units(&["# Title\n", "\nBody"], Some((1, 2)))),
        false,
    );

    let streamed: String = collect_events(&service, generate_request("draft"))
        .await
        .into_iter()
        .filter_map(|e| match e {
            OutputEvent::Content { content } => Some(content),
            _ => None,
        })
        .collect();

    let collected = service
        .collect_markdown(generate_request("draft"))
        .await
        .unwrap();

    assert_eq!(collected, streamed);
    assert_eq!(collected, "# Title\n\nBody");
}

#[tokio::test]
async fn collection_fails_on_any_embedded_error() {
    let (service, _dir) = service_with(
        Script::Units(vec![
            ScriptItem::Chunk(ProviderChunk::content("partial text")),
            ScriptItem::Chunk(ProviderChunk::failure("bad unit", None)),
            ScriptItem::Chunk(ProviderChunk::content("more text")),
        ]),
        false,
    );

    let err = service
        .collect_markdown(generate_request("draft"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn chat_without_document_is_rejected_before_any_provider_call() {
    let dir = tempfile::tempdir().unwrap();
    let prompts = prompt_store(&dir);
    let (text, text_invoked) = ScriptedProvider::new("scripted-text", Script::Units(vec![]));
    let (vision, vision_invoked) = ScriptedProvider::new("scripted-vision", Script::Units(vec![]));
    let service = DraftService::with_providers(
        prompts,
        text,
        vision,
        DocumentClassifier::default(),
        false,
    );

    let mut request = chat_request("revise", "");
    request.current_document = Some("   ".to_string());

    let err = service.stream_events(request).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!text_invoked.load(Ordering::SeqCst));
    assert!(!vision_invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn image_requests_target_the_vision_provider() {
    let dir = tempfile::tempdir().unwrap();
    let prompts = prompt_store(&dir);
    let (text, text_invoked) =
        ScriptedProvider::new("scripted-text", Script::Units(content_units(&["t"], None)));
    let (vision, vision_invoked) =
        ScriptedProvider::new("scripted-vision", Script::Units(content_units(&["v"], None)));
    let service = DraftService::with_providers(
        prompts,
        text,
        vision,
        DocumentClassifier::default(),
        false,
    );

    let mut request = generate_request("what is this");
    request.images = vec![ImageAttachment {
        data: "aW1hZ2U=".to_string(),
        mime_type: ImageMime::Png,
        filename: Some("mockup.png".to_string()),
        size: Some(6),
    }];

    let events = collect_events(&service, request).await;
    assert_eq!(
        events,
        vec![OutputEvent::Content {
            content: "v".to_string()
        }]
    );
    assert!(vision_invoked.load(Ordering::SeqCst));
    assert!(!text_invoked.load(Ordering::SeqCst));
}
