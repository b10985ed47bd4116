use crate::providers::{ChatRole, ChatTurn, ContentPart};
use crate::request::ImageAttachment;
use crate::templates::PromptTemplate;

/// Prefix for the document-priming turn in chat mode.
const DOCUMENT_PREAMBLE: &str = "Current document:\n\n";

/// Fixed acknowledgement anchoring the assistant's slot in the chat
/// priming sequence. Any non-empty constant works here; the model only
/// needs a confirmation that the document was received.
const DOCUMENT_ACK: &str =
    "Understood. I have the current document; tell me what you would like to change.";

/// Turns for generate mode: `[system, user]`.
pub fn assemble_generate(
    template: &PromptTemplate,
    message: &str,
    images: &[ImageAttachment],
) -> Vec<ChatTurn> {
    vec![
        ChatTurn::text(ChatRole::System, template.text()),
        user_turn(message, images),
    ]
}

/// Turns for chat mode: `[system, user(document), assistant(ack), user(message)]`.
/// Only the final user turn ever carries images; the priming turns stay
/// text-only even on the multimodal path.
pub fn assemble_chat(
    template: &PromptTemplate,
    current_document: &str,
    message: &str,
    images: &[ImageAttachment],
) -> Vec<ChatTurn> {
    vec![
        ChatTurn::text(ChatRole::System, template.text()),
        ChatTurn::text(
            ChatRole::User,
            format!("{DOCUMENT_PREAMBLE}{current_document}"),
        ),
        ChatTurn::text(ChatRole::Assistant, DOCUMENT_ACK),
        user_turn(message, images),
    ]
}

/// The final user turn. With images it becomes an ordered part list:
/// all image parts first, then exactly one text part.
fn user_turn(message: &str, images: &[ImageAttachment]) -> ChatTurn {
    if images.is_empty() {
        return ChatTurn::text(ChatRole::User, message);
    }

    let mut parts: Vec<ContentPart> = images
        .iter()
        .map(|image| ContentPart::Image {
            url: image.data_uri(),
        })
        .collect();
    parts.push(ContentPart::Text {
        text: message.to_string(),
    });
    ChatTurn::parts(ChatRole::User, parts)
}
