//! 测试用的进程内上游模拟

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::stream;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::config::Config;

/// 模拟上游对所有请求的固定响应
pub enum UpstreamReply {
    Json(Value),
    Sse(String),
    Status(u16, String),
    /// 发送响应头和给定内容后保持连接不再写入
    Stall(String),
}

/// 响应体被丢弃（连接关闭）时发出通知
struct CloseGuard(Arc<Notify>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

#[derive(Clone)]
struct UpstreamState {
    reply: Arc<UpstreamReply>,
    requests: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    closed: Arc<Notify>,
}

async fn handle(State(state): State<UpstreamState>, headers: HeaderMap, body: Bytes) -> Response {
    let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.requests.lock().await.push(payload);
    state.headers.lock().await.push(headers);

    match state.reply.as_ref() {
        UpstreamReply::Json(value) => axum::Json(value.clone()).into_response(),
        UpstreamReply::Sse(text) => {
            ([(header::CONTENT_TYPE, "text/event-stream")], text.clone()).into_response()
        }
        UpstreamReply::Status(code, text) => {
            let status = StatusCode::from_u16(*code).unwrap();
            (status, text.clone()).into_response()
        }
        UpstreamReply::Stall(text) => {
            let guard = CloseGuard(state.closed.clone());
            let first = Some(Bytes::from(text.clone()));
            let body = stream::unfold((guard, first), |(guard, first)| async move {
                match first {
                    Some(bytes) => Some((Ok::<_, std::io::Error>(bytes), (guard, None))),
                    None => {
                        futures::future::pending::<()>().await;
                        drop(guard);
                        None
                    }
                }
            });
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(body),
            )
                .into_response()
        }
    }
}

pub struct MockUpstream {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    closed: Arc<Notify>,
    join: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start(reply: UpstreamReply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let headers = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Notify::new());
        let state = UpstreamState {
            reply: Arc::new(reply),
            requests: requests.clone(),
            headers: headers.clone(),
            closed: closed.clone(),
        };

        let app = Router::new()
            .route("/api/v1/models", get(handle))
            .route("/api/v1/chat/completions", post(handle))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}/api/v1", addr);

        let join = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("upstream server error");
        });

        Self {
            base_url,
            requests,
            headers,
            closed,
            join,
        }
    }

    pub async fn last_request(&self) -> Value {
        let guard = self.requests.lock().await;
        guard.last().cloned().unwrap_or_else(|| json!({}))
    }

    pub async fn last_headers(&self) -> HeaderMap {
        let guard = self.headers.lock().await;
        guard.last().cloned().unwrap_or_default()
    }

    /// 等待一个 `Stall` 响应的连接被客户端关闭
    pub async fn wait_closed(&self) {
        self.closed.notified().await;
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// 指向模拟上游的配置
pub fn config_for(upstream: &MockUpstream, free_only: bool) -> Config {
    Config {
        base_url: upstream.base_url.clone(),
        api_key: "sk-or-test".to_string(),
        free_only,
        debug: true,
        request_timeout: 10,
        ..Config::default()
    }
}
