mod config;
mod openrouter;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::Config;
use openrouter::{Pipe, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 中的值作为环境变量参与参数解析
    let _ = dotenvy::dotenv();
    let config = Config::parse();

    init_tracing(config.debug);

    let pipe = Pipe::new(&config).context("创建 OpenRouter 客户端失败")?;
    let app = create_router(pipe);

    let addr = config.bind_addr();
    tracing::info!("启动 OpenRouter 适配服务: {}", addr);
    tracing::info!("上游地址: {}", config.base_url());
    tracing::info!("可用 API:");
    tracing::info!("  GET  /v1/models");
    tracing::info!("  POST /v1/chat/completions");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 初始化日志；DEBUG 打开时本 crate 输出 debug 级别
fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "info,openrouter_pipe=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
