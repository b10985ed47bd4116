use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use specdraft_common::Error;
use specdraft_engine::{GenerationRequest, OutputEvent, encode_event};
use tracing::warn;

use crate::state::AppState;
use crate::validate;

/// POST /api/v1/generate — run one generation call.
///
/// With `stream: true` the response is NDJSON, one event per line, sent
/// as the provider produces them. With `stream: false` the call blocks
/// until the stream ends and returns the concatenated markdown.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Response {
    if let Err(error) = validate::validate(&request) {
        return error_response(&error);
    }

    if request.stream {
        match state.service.stream_events(request) {
            Ok(events) => ndjson_response(events),
            Err(error) => error_response(&error),
        }
    } else {
        match state.service.collect_markdown(request).await {
            Ok(markdown) => Json(json!({ "markdown_content": markdown })).into_response(),
            Err(error) => error_response(&error),
        }
    }
}

fn ndjson_response(events: impl Stream<Item = OutputEvent> + Send + 'static) -> Response {
    let lines = events.filter_map(|event| async move {
        match encode_event(&event) {
            Ok(line) => Some(Ok::<_, std::convert::Infallible>(Bytes::from(line))),
            Err(error) => {
                warn!(error = %error, "dropping event that failed to encode");
                None
            }
        }
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Maps pipeline errors onto HTTP statuses. Upstream failures are the
/// provider's fault, not ours, so they surface as 502.
fn error_response(error: &Error) -> Response {
    let status = match error {
        Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Upstream(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_)
        | Error::TemplateNotFound(_)
        | Error::Serialization(_)
        | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
