pub mod assembler;
pub mod classifier;
pub mod events;
pub mod providers;
pub mod request;
pub mod service;
pub mod templates;

pub use classifier::{DocumentClassifier, SectionRules};
pub use events::{OutputEvent, encode_event};
pub use providers::{
    ChatRole, ChatTurn, ChunkFailure, ChunkStream, ContentPart, ModelProvider, ProviderChunk,
    TokenUsage, TurnContent,
};
pub use request::{GenerationRequest, ImageAttachment, ImageMime, Mode};
pub use service::DraftService;
pub use templates::{PromptPurpose, PromptStore, PromptTemplate};
