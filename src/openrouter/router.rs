//! HTTP 路由配置

use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{AppState, chat_completions, list_models};
use super::pipe::Pipe;

/// CORS 中间件层
fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 创建路由
///
/// # 端点
/// - `POST /v1/chat/completions` - 推理内联后的聊天完成
/// - `GET /v1/models` - 模型列表（失败时返回占位条目）
pub fn create_router(pipe: Pipe) -> Router {
    let state = AppState::new(pipe);

    let v1_routes = Router::new()
        .route("/chat/completions", post(chat_completions))
        .route("/models", get(list_models));

    Router::new()
        .nest("/v1", v1_routes)
        .layer(cors_layer())
        .with_state(state)
}
