use std::path::PathBuf;

/// Error taxonomy for the drafting service.
///
/// Per-chunk provider failures are not represented here: they are surfaced
/// inside the event stream as `error` events so that a partially successful
/// stream stays observable by the consumer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Service construction failed (e.g. missing provider credential).
    /// Fatal: the instance cannot handle any request.
    #[error("configuration error: {0}")]
    Config(String),

    /// A prompt template file is missing. Fatal for any request needing it.
    #[error("prompt template not found at {0}")]
    TemplateNotFound(PathBuf),

    /// Malformed request, rejected before any provider call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The provider call itself failed (network / protocol), or an embedded
    /// stream error was promoted by the synchronous collection path.
    #[error("upstream provider error: {0}")]
    Upstream(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
