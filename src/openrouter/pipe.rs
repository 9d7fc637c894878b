//! 宿主调用入口
//!
//! `pipe` 处理一次 chat completion，`pipes` 返回模型列表。
//! 两者都不会把错误抛给宿主。

use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;

use super::converter::{inline_reasoning, normalize_request};
use super::error::Result;
use super::provider::OpenRouterProvider;
use super::stream::{ChunkStream, LineReader, reshape_stream};
use super::types::{ErrorBody, ModelEntry};

/// 模型列表失败时的占位 ID
const FALLBACK_MODEL_ID: &str = "openrouter";

/// 一次调用的结果
pub enum PipeOutput {
    /// 非流式：推理已内联的完整响应
    Completion(Value),
    /// 失败：`{"error": "..."}` JSON 字符串
    Failed(String),
    /// 流式：SSE 格式的 chunk 流
    Stream(ChunkStream),
}

impl std::fmt::Debug for PipeOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeOutput::Completion(data) => f.debug_tuple("Completion").field(data).finish(),
            PipeOutput::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
            PipeOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

pub struct Pipe {
    provider: OpenRouterProvider,
    free_only: bool,
}

impl Pipe {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            provider: OpenRouterProvider::new(config)?,
            free_only: config.free_only,
        })
    }

    /// 可用模型列表
    ///
    /// 失败时返回单个占位条目，name 为错误信息。
    pub async fn pipes(&self) -> Vec<ModelEntry> {
        match self.provider.list_models().await {
            Ok(models) => models
                .into_iter()
                .filter(|model| !self.free_only || is_free(model.id.as_deref()))
                .map(ModelEntry::from)
                .collect(),
            Err(e) => {
                tracing::warn!("获取模型列表失败: {}", e);
                vec![ModelEntry::new(FALLBACK_MODEL_ID, e.to_string())]
            }
        }
    }

    /// 处理一次 chat completion 请求
    pub async fn pipe(&self, body: &Map<String, Value>) -> PipeOutput {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("pipe", %request_id);

        async move {
            match self.try_pipe(body).await {
                Ok(output) => output,
                Err(e) => {
                    let message = format!("Error processing request: {e}");
                    tracing::error!("{}", message);
                    PipeOutput::Failed(ErrorBody::new(message).to_json_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_pipe(&self, body: &Map<String, Value>) -> Result<PipeOutput> {
        let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);
        let normalized = normalize_request(body);
        let model = normalized
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let message_count = body.get("messages").and_then(Value::as_array).map(Vec::len);

        tracing::info!(
            model = %model,
            stream = %stream,
            message_count = ?message_count,
            "Received chat completion request"
        );

        if stream {
            let response = self.provider.call_api_stream(&normalized).await?;
            let lines = LineReader::new(response.bytes_stream());
            Ok(PipeOutput::Stream(reshape_stream(lines, model)))
        } else {
            let data = self.provider.call_api(&normalized).await?;
            Ok(PipeOutput::Completion(inline_reasoning(data)))
        }
    }
}

/// 模型 ID 是否包含 "free"（不区分大小写）
fn is_free(id: Option<&str>) -> bool {
    id.is_some_and(|id| id.to_lowercase().contains("free"))
}
