//! 对话消息与补全请求/响应的线上格式（OpenAI Chat Completions 兼容）

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolDescriptor;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 单条消息；tool 消息必须携带 tool_call_id，指向此前某条 assistant 消息中的同名调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// 只含工具调用、不含文本的 assistant 消息
    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::with_role(Role::Assistant, None)
        }
    }

    /// 工具结果消息，原样回显调用 id
    pub fn tool(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, Some(content.into()))
        }
    }

    /// 非空文本内容
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// 线上格式的工具调用：arguments 是 JSON 编码的字符串
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }

    /// 解析 arguments；空字符串视为无参数
    pub fn to_request(&self) -> Result<ToolCallRequest, serde_json::Error> {
        let raw = self.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Map::new()
        } else {
            serde_json::from_str::<Map<String, Value>>(raw)?
        };
        Ok(ToolCallRequest {
            id: self.id.clone(),
            name: self.function.name.clone(),
            arguments,
        })
    }
}

/// 解析后的工具调用请求：id 在一次响应内唯一，结果消息原样回显
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// 补全请求体
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool<'a>>,
}

impl<'a> ChatRequest<'a> {
    pub fn new(model: &'a str, messages: &'a [Message], tools: &'a [ToolDescriptor]) -> Self {
        Self {
            model,
            messages,
            tools: tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WireTool<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: &'a ToolDescriptor,
}

/// 补全响应：choices 顺序与线上一致
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatResponse {
    /// 以给定消息构造响应（每条消息一个 choice），供脚本化传输与测试使用
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let choices = messages
            .into_iter()
            .enumerate()
            .map(|(index, message)| Choice {
                index: index as u32,
                finish_reason: Some(
                    if message.tool_calls().is_empty() { "stop" } else { "tool_calls" }.to_string(),
                ),
                message,
            })
            .collect();
        Self {
            choices,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_preserves_tool_call_order() {
        let raw = json!({
            "id": "chatcmpl-1",
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_b", "type": "function", "function": {"name": "second", "arguments": "{}"}},
                        {"id": "call_a", "type": "function", "function": {"name": "first", "arguments": "{\"x\": 1}"}}
                    ]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let resp: ChatResponse = serde_json::from_value(raw).unwrap();
        let calls = resp.choices[0].message.tool_calls();
        assert_eq!(calls[0].id, "call_b");
        assert_eq!(calls[1].id, "call_a");
        assert!(resp.choices[0].message.text().is_none());
        assert_eq!(resp.usage.unwrap().total_tokens, 15);

        let req = calls[1].to_request().unwrap();
        assert_eq!(req.arguments.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_empty_arguments_parse_as_empty_map() {
        let call = ToolCall {
            id: "1".into(),
            kind: "function".into(),
            function: FunctionCall {
                name: "end_chat".into(),
                arguments: String::new(),
            },
        };
        assert!(call.to_request().unwrap().arguments.is_empty());
    }

    #[test]
    fn test_tool_message_serialization_omits_unset_fields() {
        let msg = Message::tool("call_1", "echo", "HELLO");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "tool");
        assert_eq!(v["tool_call_id"], "call_1");
        assert!(v.get("tool_calls").is_none());

        let user = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(user.get("name").is_none());
    }

    #[test]
    fn test_request_omits_tools_when_empty() {
        let messages = vec![Message::user("hi")];
        let req = ChatRequest::new("m", &messages, &[]);
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("tools").is_none());
    }
}
