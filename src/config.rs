//! 配置
//!
//! 命令行参数优先，其次环境变量（可由 `.env` 提供），最后默认值。

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8990;
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REFERER: &str = "https://chat.aionx.be/";
pub const DEFAULT_TITLE: &str = "Aionx Open WebUI";

/// 服务与上游连接配置
#[derive(Debug, Clone, Parser)]
#[command(name = "openrouter-pipe")]
#[command(version)]
#[command(about = "OpenRouter adapter that inlines reasoning traces as <think> blocks")]
pub struct Config {
    /// 监听地址
    #[arg(long, env = "PIPE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// 监听端口
    #[arg(long, env = "PIPE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// OpenRouter API 基础地址
    #[arg(long, env = "OPENROUTER_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// OpenRouter API Key
    #[arg(long, env = "OPENROUTER_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// 模型列表只保留免费模型
    #[arg(long, env = "FREE_ONLY", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub free_only: bool,

    /// 记录原始响应体
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// 单次请求总超时（秒）
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// HTTP-Referer 请求头
    #[arg(long, env = "OPENROUTER_REFERER", default_value = DEFAULT_REFERER)]
    pub referer: String,

    /// X-Title 请求头
    #[arg(long, env = "OPENROUTER_TITLE", default_value = DEFAULT_TITLE)]
    pub title: String,
}

impl Config {
    /// 去掉末尾 `/` 的基础地址
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            free_only: false,
            debug: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}
