use serde::{Deserialize, Serialize};

/// Hard cap on image attachments per request.
pub const MAX_IMAGES: usize = 5;

/// Hard cap on a single image payload, in bytes (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Longest accepted attachment filename.
pub const MAX_FILENAME_LEN: usize = 255;

/// Operating mode of a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Draft a new document from a description, no prior document context.
    Generate,
    /// Discuss or modify an existing document; the reply is always a full
    /// replacement document.
    Chat,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Generate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Gif => "image/gif",
            ImageMime::Webp => "image/webp",
        }
    }
}

/// One uploaded image, carried as base64 in the request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64-encoded payload, no data-URI prefix.
    pub data: String,
    pub mime_type: ImageMime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Declared payload size in bytes, as reported by the uploader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ImageAttachment {
    /// `data:{mime};base64,{payload}` form expected by the vision API.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type.as_str(), self.data)
    }

    /// Byte size decoded from the base64 payload length. Used as a backstop
    /// when the uploader omits `size`.
    pub fn estimated_bytes(&self) -> u64 {
        let trimmed = self.data.trim_end_matches('=').len() as u64;
        trimmed * 3 / 4
    }
}

/// One HTTP call's worth of input. Created per request, never persisted:
/// the caller supplies any history it wants the model to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub message: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub mode: Mode,
    /// Required iff `mode == Chat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_document: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn default_stream() -> bool {
    true
}
