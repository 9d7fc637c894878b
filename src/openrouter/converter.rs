//! 宿主 → OpenRouter 请求转换，以及非流式响应的推理内联
//!
//! 请求侧只改写 `model` 并强制 `include_reasoning`，其余字段原样透传。

use serde_json::{Map, Value};

/// 推理块起始标记
pub const THINK_OPEN: &str = "<think>";
/// 推理块结束标记
pub const THINK_CLOSE: &str = "</think>";

/// 宿主内部使用的推理模型前缀
const REASONING_PREFIX: &str = "reasoning/";

/// 模型 ID 规范化
///
/// 1. 按第一个 `.` 切分，取后半段（去掉宿主侧的命名空间前缀）
/// 2. 去掉第一次出现的 `reasoning/`
///
/// - `openrouter.deepseek/deepseek-r1` → `deepseek/deepseek-r1`
/// - `openrouter.reasoning/deepseek/deepseek-r1` → `deepseek/deepseek-r1`
pub fn normalize_model_id(model: &str) -> String {
    let tail = model.split_once('.').map_or(model, |(_, tail)| tail);
    tail.replacen(REASONING_PREFIX, "", 1)
}

/// 将宿主请求转换为上游请求
///
/// 浅拷贝输入，不修改调用方的对象。
pub fn normalize_request(body: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = body.clone();

    if let Some(Value::String(model)) = normalized.get("model") {
        let model_id = normalize_model_id(model);
        normalized.insert("model".to_string(), Value::String(model_id));
    }

    normalized.insert("include_reasoning".to_string(), Value::Bool(true));
    normalized
}

/// 将 `message.reasoning` 内联到 `message.content`
///
/// 对每个带推理字段的 choice：`<think>{reasoning}</think>\n{content}`，
/// 其余 choice 不变。
pub fn inline_reasoning(mut data: Value) -> Value {
    let Some(choices) = data.get_mut("choices").and_then(Value::as_array_mut) else {
        return data;
    };

    for choice in choices {
        let Some(message) = choice.get_mut("message").and_then(Value::as_object_mut) else {
            continue;
        };

        let reasoning = match message.get("reasoning") {
            None | Some(Value::Null) => continue,
            Some(value) => text_of(value),
        };
        let content = message.get("content").map(text_of).unwrap_or_default();

        message.insert(
            "content".to_string(),
            Value::String(format!("{THINK_OPEN}{reasoning}{THINK_CLOSE}\n{content}")),
        );
    }

    data
}

/// 字符串取原值，null 为空，其余按 JSON 文本
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manual(model: &str) -> String {
        let tail = match model.find('.') {
            Some(idx) => &model[idx + 1..],
            None => model,
        };
        tail.replacen("reasoning/", "", 1)
    }

    #[test]
    fn test_normalize_model_id() {
        let cases = [
            ("openrouter.reasoning/deepseek/deepseek-r1", "deepseek/deepseek-r1"),
            ("openrouter.meta-llama/llama-3.1-8b", "meta-llama/llama-3.1-8b"),
            ("reasoning/qwen/qwq-32b", "qwen/qwq-32b"),
            ("plain-model", "plain-model"),
            ("a.b.reasoning/c", "b.c"),
            ("x.reasoning/reasoning/y", "reasoning/y"),
            ("providerX.llama", "llama"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_model_id(input), expected, "input: {input}");
            assert_eq!(normalize_model_id(input), manual(input), "input: {input}");
        }
    }

    #[test]
    fn test_normalize_request_sets_include_reasoning() {
        let body = json!({
            "model": "openrouter.reasoning/deepseek/deepseek-r1",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true,
            "temperature": 0.2
        });
        let body = body.as_object().unwrap();

        let normalized = normalize_request(body);
        assert_eq!(normalized["model"], "deepseek/deepseek-r1");
        assert_eq!(normalized["include_reasoning"], true);
        assert_eq!(normalized["messages"], body["messages"]);
        assert_eq!(normalized["stream"], true);
        assert_eq!(normalized["temperature"], 0.2);
    }

    #[test]
    fn test_normalize_request_does_not_mutate_input() {
        let body = json!({"model": "openrouter.reasoning/x", "include_reasoning": false});
        let original = body.clone();
        let map = body.as_object().unwrap();

        let normalized = normalize_request(map);
        assert_eq!(body, original);
        assert_eq!(normalized["include_reasoning"], true);
    }

    #[test]
    fn test_normalize_request_without_model() {
        let body = json!({"messages": []});
        let normalized = normalize_request(body.as_object().unwrap());
        assert!(!normalized.contains_key("model"));
        assert_eq!(normalized["include_reasoning"], true);
    }

    #[test]
    fn test_inline_reasoning() {
        let data = json!({
            "id": "gen-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "reasoning": "R", "content": "C"}},
                {"index": 1, "message": {"role": "assistant", "content": "plain"}}
            ],
            "usage": {"total_tokens": 3}
        });

        let result = inline_reasoning(data);
        assert_eq!(result["choices"][0]["message"]["content"], "<think>R</think>\nC");
        assert_eq!(result["choices"][1]["message"]["content"], "plain");
        assert_eq!(result["usage"]["total_tokens"], 3);
        assert_eq!(result["id"], "gen-1");
    }

    #[test]
    fn test_inline_reasoning_null_reasoning_untouched() {
        let data = json!({
            "choices": [{"message": {"reasoning": null, "content": "C"}}]
        });
        let result = inline_reasoning(data);
        assert_eq!(result["choices"][0]["message"]["content"], "C");
    }

    #[test]
    fn test_inline_reasoning_without_choices() {
        let data = json!({"error": {"message": "x"}});
        assert_eq!(inline_reasoning(data.clone()), data);
    }
}
