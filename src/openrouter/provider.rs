//! OpenRouter API 调用
//!
//! 负责 HTTP 请求的构建、状态码检查和响应体解析，不做重试。

use std::time::Duration;

use http::header;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Map, Value};

use crate::config::Config;

use super::error::{PipeError, Result};
use super::types::{ModelsResponse, UpstreamModel};

/// 模型列表请求超时
const MODELS_TIMEOUT_SECS: u64 = 30;

/// OpenRouter API Provider
pub struct OpenRouterProvider {
    client: Client,
    base_url: String,
    api_key: String,
    referer: String,
    title: String,
    debug: bool,
}

impl OpenRouterProvider {
    /// 创建 Provider，超时覆盖整个请求（含读取响应体）
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: config.api_key.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            debug: config.debug,
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    /// 附加认证和标识请求头
    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
    }

    /// 非 2xx 状态码转换为错误
    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if self.debug {
            tracing::debug!(%status, body = %body, "上游返回错误状态");
        }
        Err(PipeError::Http { status, body })
    }

    /// 解析 JSON 响应体，debug 模式下记录原始内容
    async fn read_json<T: serde::de::DeserializeOwned>(&self, response: Response) -> Result<T> {
        let text = response.text().await?;
        if self.debug {
            tracing::debug!(body = %text, "上游响应体");
        }

        serde_json::from_str(&text).map_err(|e| {
            if self.debug {
                tracing::debug!("无效的 JSON 响应: {}", text);
            }
            PipeError::from(e)
        })
    }

    /// 非流式调用 `POST /chat/completions`
    pub async fn call_api(&self, body: &Map<String, Value>) -> Result<Value> {
        let url = self.chat_completions_url();
        tracing::debug!(url = %url, "调用上游 chat completions");

        let response = self
            .with_headers(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        let response = self.check_status(response).await?;
        self.read_json(response).await
    }

    /// 流式调用 `POST /chat/completions`
    ///
    /// 状态码检查在返回前完成，错误响应不会交给流处理。
    pub async fn call_api_stream(&self, body: &Map<String, Value>) -> Result<Response> {
        let url = self.chat_completions_url();
        tracing::debug!(url = %url, "调用上游 chat completions（流式）");

        let response = self
            .with_headers(self.client.post(&url))
            .header(header::ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await?;
        self.check_status(response).await
    }

    /// `GET /models`
    pub async fn list_models(&self) -> Result<Vec<UpstreamModel>> {
        let url = self.models_url();
        if self.debug {
            tracing::debug!("获取模型列表: {}", url);
        }

        let response = self
            .with_headers(self.client.get(&url))
            .timeout(Duration::from_secs(MODELS_TIMEOUT_SECS))
            .send()
            .await?;
        let response = self.check_status(response).await?;
        let models: ModelsResponse = self.read_json(response).await?;

        if self.debug {
            tracing::debug!("获取到 {} 个模型", models.data.len());
        }
        Ok(models.data)
    }
}
