//! HTTP Handler 函数

use std::sync::Arc;

use axum::{
    Json as JsonExtractor,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::{Map, Value};

use super::pipe::{Pipe, PipeOutput};
use super::types::ModelEntry;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub pipe: Arc<Pipe>,
}

impl AppState {
    pub fn new(pipe: Pipe) -> Self {
        Self {
            pipe: Arc::new(pipe),
        }
    }
}

/// POST /v1/chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    JsonExtractor(payload): JsonExtractor<Map<String, Value>>,
) -> Response {
    match state.pipe.pipe(&payload).await {
        PipeOutput::Completion(data) => (StatusCode::OK, Json(data)).into_response(),
        PipeOutput::Failed(error) => (
            StatusCode::BAD_GATEWAY,
            [(header::CONTENT_TYPE, "application/json")],
            error,
        )
            .into_response(),
        PipeOutput::Stream(chunks) => {
            // 流中途出错时直接中断响应体
            let body = chunks.map_ok(Bytes::from);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONNECTION, "keep-alive"),
                ],
                Body::from_stream(body),
            )
                .into_response()
        }
    }
}

/// GET /v1/models
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelEntry>> {
    Json(state.pipe.pipes().await)
}
