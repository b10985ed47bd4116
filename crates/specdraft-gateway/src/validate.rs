use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use specdraft_common::{Error, Result};
use specdraft_engine::request::{
    GenerationRequest, MAX_FILENAME_LEN, MAX_IMAGES, MAX_IMAGE_BYTES,
};

/// Request-shape checks performed before any work is scheduled. The size
/// limit is enforced on the declared size when present, otherwise on the
/// decoded payload, which also rejects payloads that are not base64.
pub fn validate(request: &GenerationRequest) -> Result<()> {
    if request.message.trim().is_empty() {
        return Err(Error::Validation("message must not be empty".to_string()));
    }

    if request.mode == specdraft_engine::Mode::Chat
        && !request
            .current_document
            .as_deref()
            .is_some_and(|doc| !doc.trim().is_empty())
    {
        return Err(Error::Validation(
            "chat mode requires a non-empty current_document".to_string(),
        ));
    }

    if request.images.len() > MAX_IMAGES {
        return Err(Error::Validation(format!(
            "at most {MAX_IMAGES} images are allowed per request"
        )));
    }

    for (index, image) in request.images.iter().enumerate() {
        if image.data.trim().is_empty() {
            return Err(Error::Validation(format!(
                "image {index} has no payload data"
            )));
        }

        let bytes = match image.size {
            Some(declared) => declared,
            None => match BASE64.decode(image.data.as_bytes()) {
                Ok(decoded) => decoded.len() as u64,
                Err(_) => {
                    return Err(Error::Validation(format!(
                        "image {index} payload is not valid base64"
                    )));
                }
            },
        };
        if bytes > MAX_IMAGE_BYTES {
            return Err(Error::Validation(format!(
                "image {index} exceeds the {MAX_IMAGE_BYTES} byte limit"
            )));
        }

        if let Some(filename) = &image.filename
            && filename.len() > MAX_FILENAME_LEN
        {
            return Err(Error::Validation(format!(
                "image {index} filename exceeds {MAX_FILENAME_LEN} characters"
            )));
        }
    }

    Ok(())
}
