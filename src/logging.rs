//! Middleware for logging requests and responses.

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body the server will read, in bytes.
pub const MAX_REQUEST_BODY_BYTES: usize = 1_048_576;

/// Log the request and response for each request.
///
/// The method, URI and status are logged at the `info` level along with the
/// first [LOG_BODY_LENGTH_LIMIT] bytes of each body. Longer bodies are logged
/// in full at the `debug` level. Requests with a body over
/// [MAX_REQUEST_BODY_BYTES] are rejected with `413 Payload Too Large`.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!("could not read request body: {error}");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "error": format!(
                        "the request body could not be read, \
                        it must not be larger than {MAX_REQUEST_BODY_BYTES} bytes"
                    )
                })),
            )
                .into_response();
        }
    };

    let body_text = String::from_utf8_lossy(&body);
    tracing::info!(
        "Received request: {} {}\nbody: {}",
        parts.method,
        parts.uri,
        truncate(&body_text)
    );
    log_full_body("request", &body_text);

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    let (parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body_text = String::from_utf8_lossy(&body);
    tracing::info!(
        "Sending response: {}\nbody: {}",
        parts.status,
        truncate(&body_text)
    );
    log_full_body("response", &body_text);

    Response::from_parts(parts, Body::from(body))
}

fn log_full_body(kind: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!("Full {kind} body: {body:?}");
    }
}

/// Cut `text` down to at most [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(text: &str) -> String {
    if text.len() <= LOG_BODY_LENGTH_LIMIT {
        return format!("{text:?}");
    }

    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    format!("{:?}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::{LOG_BODY_LENGTH_LIMIT, truncate};

    #[test]
    fn short_text_is_kept() {
        assert_eq!(truncate("{\"price\":1}"), "\"{\\\"price\\\":1}\"");
    }

    #[test]
    fn long_text_is_cut_at_limit() {
        let text = "a".repeat(LOG_BODY_LENGTH_LIMIT + 10);

        let got = truncate(&text);

        assert_eq!(got, format!("{:?}...", "a".repeat(LOG_BODY_LENGTH_LIMIT)));
    }

    #[test]
    fn long_text_is_not_cut_inside_a_character() {
        // '€' is three bytes, so the limit falls inside a character.
        let text = "€".repeat(LOG_BODY_LENGTH_LIMIT);

        let got = truncate(&text);

        assert!(got.ends_with("..."));
        assert!(got.len() < text.len());
    }
}
