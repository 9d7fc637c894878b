//! OpenRouter / OpenAI 兼容 API 类型定义

use serde::{Deserialize, Serialize};
use serde_json::Value;

// === 错误响应 ===

/// 返回给宿主的错误负载：`{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// 序列化为 JSON 字符串
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.error))
    }
}

// === 模型列表 ===

/// 宿主模型选择器中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
}

impl ModelEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// `GET /models` 响应体
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<UpstreamModel>,
}

/// 上游模型条目，只关心 id 和 name
#[derive(Debug, Deserialize)]
pub struct UpstreamModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<UpstreamModel> for ModelEntry {
    fn from(model: UpstreamModel) -> Self {
        Self {
            id: model.id.unwrap_or_else(|| "unknown".to_string()),
            name: model.name.unwrap_or_else(|| "Unknown Model".to_string()),
        }
    }
}

// === 上游流式事件 ===

/// 上游 SSE 中一条 `data:` 事件
#[derive(Debug, Default, Deserialize)]
pub struct ChunkEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<EventChoice>>,
}

impl ChunkEvent {
    /// 第一个 choice；缺失或为空时视为空 delta
    pub fn first_choice(&self) -> Option<&EventChoice> {
        self.choices.as_ref().and_then(|choices| choices.first())
    }
}

/// 上游事件中的 choice
#[derive(Debug, Default, Deserialize)]
pub struct EventChoice {
    #[serde(default)]
    pub delta: Option<EventDelta>,
    #[serde(default)]
    pub finish_reason: Option<Value>,
}

impl EventChoice {
    /// finish_reason 是否为真值（非 null、非空字符串、非 false、非 0）
    pub fn is_finished(&self) -> bool {
        match &self.finish_reason {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }
}

/// 增量内容：推理片段与回答片段
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EventDelta {
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl EventDelta {
    /// 非空的推理片段
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|s| !s.is_empty())
    }

    /// 非空的回答片段
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|s| !s.is_empty())
    }
}

// === 发往宿主的流式响应 ===

/// 流式响应 chunk
#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

/// 流式选择
#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    pub index: i32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// 增量内容
#[derive(Debug, Serialize)]
pub struct Delta {
    pub content: String,
    pub role: String,
}
