//! OpenAI-compatible forwarding handlers
//!
//! Each handler forwards the request body as the first call argument through
//! the balanced handle. Streaming upstream responses are passed through as
//! `text/event-stream` without re-encoding.

use crate::api::ApiResponse;
use crate::error::BalancerResult;
use crate::handlers::AppState;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// POST /v1/chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> BalancerResult<Response> {
    forward(&state, &["chat", "completions", "create"], vec![body]).await
}

/// POST /v1/completions
pub async fn completions(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> BalancerResult<Response> {
    forward(&state, &["completions", "create"], vec![body]).await
}

/// POST /v1/embeddings
pub async fn embeddings(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> BalancerResult<Response> {
    forward(&state, &["embeddings", "create"], vec![body]).await
}

/// GET /v1/models
///
/// Returns the catalog of whichever upstream the balancer selects.
pub async fn models(State(state): State<AppState>) -> BalancerResult<Response> {
    forward(&state, &["models", "list"], Vec::new()).await
}

async fn forward(state: &AppState, path: &[&str], args: Vec<Value>) -> BalancerResult<Response> {
    let response = state.proxy().call(path, args).await?;
    Ok(into_http_response(response))
}

/// Convert an upstream response into an HTTP response
pub fn into_http_response(response: ApiResponse) -> Response {
    match response {
        ApiResponse::Json(body) => Json(body).into_response(),
        ApiResponse::Stream(stream) => (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(stream),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BalancerError;
    use axum::body::{Bytes, to_bytes};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_response_is_plain_json() {
        let response = into_http_response(ApiResponse::Json(json!({"id": "chatcmpl-1"})));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["id"], "chatcmpl-1");
    }

    #[tokio::test]
    async fn test_stream_response_is_event_stream() {
        let chunks: Vec<Result<Bytes, BalancerError>> = vec![
            Ok(Bytes::from_static(b"data: {\"n\":1}\n\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ];
        let stream = Box::pin(futures::stream::iter(chunks));
        let response = into_http_response(ApiResponse::Stream(stream));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"data: {\"n\":1}\n\ndata: [DONE]\n\n");
    }
}
