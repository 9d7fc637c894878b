//! OpenRouter 调用错误类型

use reqwest::StatusCode;

/// 规范化、上游调用、响应重塑过程中的错误
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// 上游返回非 2xx 状态码
    #[error("上游返回错误状态 {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// 网络层错误（连接、超时、读取响应体）
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),

    /// 响应体不是合法 JSON
    #[error("无效的 JSON 响应: {0}")]
    Json(#[from] serde_json::Error),

    /// 读取流时的 I/O 错误
    #[error("读取响应流失败: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipeError>;
