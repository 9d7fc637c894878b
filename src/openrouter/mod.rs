//! OpenRouter 适配模块
//!
//! 将宿主的 Chat Completions 请求转发到 OpenRouter，
//! 并把上游返回的推理内容以 `<think>` 块内联到回答中。

mod converter;
mod error;
mod handlers;
mod pipe;
mod provider;
mod router;
mod stream;
#[cfg(test)]
mod test_support;
mod types;

pub use pipe::Pipe;
pub use router::create_router;
