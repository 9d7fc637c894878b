//! OpenRouter 流式响应处理模块
//!
//! 将上游 SSE 中的 `reasoning` / `content` 增量重塑为单一文本流，
//! 推理部分包在 `<think>...</think>` 中。

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, TryStreamExt};

use super::converter::{THINK_CLOSE, THINK_OPEN};
use super::error::{PipeError, Result};
use super::types::{ChatCompletionChunk, ChunkChoice, ChunkEvent, Delta, EventChoice, EventDelta};

/// SSE 数据行前缀
pub const DATA_PREFIX: &str = "data: ";

/// 上游结束哨兵
const DONE_SENTINEL: &str = "[DONE]";

/// 推理块结束后插入的分隔
const CLOSE_MARKER: &str = "\n\n";

/// 发往宿主的 chunk 流
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// 推理阶段，只向前推进
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReasoningPhase {
    #[default]
    NotStarted,
    Reasoning,
    Answered,
}

impl ReasoningPhase {
    /// 根据增量推进阶段，返回新阶段和需要先发送的标记
    pub fn advance(self, delta: &EventDelta) -> (Self, Option<String>) {
        match self {
            Self::NotStarted if delta.reasoning().is_some() => {
                (Self::Reasoning, Some(THINK_OPEN.to_string()))
            }
            Self::Reasoning if delta.reasoning().is_none() && delta.content().is_some() => {
                (Self::Answered, Some(format!("{THINK_CLOSE}{CLOSE_MARKER}")))
            }
            phase => (phase, None),
        }
    }
}

/// 流处理上下文
pub struct StreamContext {
    /// 请求的模型名称
    pub model: String,
    /// 当前推理阶段
    pub phase: ReasoningPhase,
}

impl StreamContext {
    /// 创建新的流处理上下文
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            phase: ReasoningPhase::NotStarted,
        }
    }

    /// 处理一条上游事件，返回按顺序发送的 chunk
    pub fn process_event(&mut self, event: &ChunkEvent) -> Vec<ChatCompletionChunk> {
        let empty = EventDelta::default();
        let delta = event
            .first_choice()
            .and_then(|choice| choice.delta.as_ref())
            .unwrap_or(&empty);
        let id = event.id.as_deref().unwrap_or_default();

        let mut chunks = Vec::new();

        let (phase, marker) = self.phase.advance(delta);
        if phase != self.phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "推理阶段切换");
            self.phase = phase;
        }
        if let Some(marker) = marker {
            chunks.push(self.content_chunk(id, marker));
        }

        if let Some(content) = delta.reasoning().or(delta.content()) {
            chunks.push(self.content_chunk(id, content));
        }

        chunks
    }

    fn content_chunk(&self, id: &str, content: impl Into<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: Delta {
                    content: content.into(),
                    role: "assistant".to_string(),
                },
                finish_reason: None,
            }],
        }
    }
}

/// 按行读取上游响应体
///
/// 只在缓冲区中没有完整行时才继续拉取下一块数据。
pub struct LineReader {
    body: BoxStream<'static, Result<Bytes>>,
    buffer: BytesMut,
    eof: bool,
}

impl LineReader {
    pub fn new<S, E>(body: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<PipeError>,
    {
        Self {
            body: body.map_err(|err| -> PipeError { err.into() }).boxed(),
            buffer: BytesMut::new(),
            eof: false,
        }
    }

    /// 下一行（不含换行符），响应体结束时返回 None
    pub async fn next_line(&mut self) -> Option<Result<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                return Some(Ok(decode_line(&line)));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return None;
                }
                let rest = self.buffer.split();
                return Some(Ok(decode_line(&rest)));
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.eof = true;
                    self.buffer.clear();
                    return Some(Err(e));
                }
                None => self.eof = true,
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// 将上游 SSE 行流重塑为宿主的 chunk 流
///
/// 遇到真值 finish_reason 时发送 `[DONE]` 并结束，不再读取后续行；
/// 上游在此之前结束则直接结束。解析或网络错误作为最后一项返回。
pub fn reshape_stream(lines: LineReader, model: impl Into<String>) -> ChunkStream {
    let ctx = StreamContext::new(model);

    stream::unfold(
        (lines, ctx, false),
        |(mut lines, mut ctx, finished)| async move {
            if finished {
                return None;
            }

            loop {
                let line = match lines.next_line().await {
                    Some(Ok(line)) => line,
                    None => return None,
                    Some(Err(e)) => {
                        tracing::error!("读取上游流失败: {}", e);
                        return Some((stream::iter(vec![Err(e)]), (lines, ctx, true)));
                    }
                };

                let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                    continue;
                };
                if payload.trim() == DONE_SENTINEL {
                    tracing::debug!("上游在 finish_reason 之前发送了 [DONE]");
                    return None;
                }

                let event: ChunkEvent = match serde_json::from_str(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!("解析上游事件失败: {}", e);
                        let error = PipeError::from(e);
                        return Some((stream::iter(vec![Err(error)]), (lines, ctx, true)));
                    }
                };

                let mut sse_data: Vec<Result<String>> = ctx
                    .process_event(&event)
                    .iter()
                    .map(|chunk| Ok(chunk_to_sse(chunk)))
                    .collect();

                let finished = event.first_choice().is_some_and(EventChoice::is_finished);
                if finished {
                    sse_data.push(Ok(done_sse()));
                }

                if !sse_data.is_empty() {
                    return Some((stream::iter(sse_data), (lines, ctx, finished)));
                }
            }
        },
    )
    .flatten()
    .boxed()
}

/// 将 chunk 转换为 SSE 字符串
pub fn chunk_to_sse(chunk: &ChatCompletionChunk) -> String {
    format!(
        "data: {}\n\n",
        serde_json::to_string(chunk).unwrap_or_default()
    )
}

/// 生成 [DONE] SSE 字符串
pub fn done_sse() -> String {
    "data: [DONE]\n\n".to_string()
}
