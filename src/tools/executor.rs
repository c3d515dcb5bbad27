//! 工具执行器
//!
//! 持有 ToolRegistry 与会话能力容器，execute(tool_call) 完成一次调用的全部分派：
//! 解析参数 -> 查表 -> 解析注入参数 -> 调用 -> 结果转 tool 消息。
//! 未知工具名转为 system 消息，工具错误（含 panic）转为带错误链的 tool 消息，均不中断循环；
//! 只有 ToolOutput::EndSession 产生 Dispatch::Terminate。每次调用输出结构化审计日志（JSON）。

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;

use crate::llm::{Message, ToolCall};
use crate::tools::{Capabilities, ToolArgs, ToolDescriptor, ToolOutput, ToolRegistry};

/// 单次分派的结果：继续（附结果消息）或终止会话
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Continue(Message),
    Terminate,
}

/// 工具执行器：注册表 + 能力容器
#[derive(Clone, Default)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    capabilities: Capabilities,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, capabilities: Capabilities) -> Self {
        Self {
            registry,
            capabilities,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut Capabilities {
        &mut self.capabilities
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.all_descriptors()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// 分派一次工具调用
    pub async fn execute(&self, call: &ToolCall) -> Dispatch {
        let name = call.function.name.as_str();
        let start = Instant::now();

        let Some(entry) = self.registry.lookup(name) else {
            tracing::warn!(tool = %name, call_id = %call.id, "model requested unknown tool");
            audit(name, "unknown_tool", start, &call.function.arguments);
            return Dispatch::Continue(Message::system(format!(
                "Invalid tool name `{name}`: no such tool is registered. Available tools: {}",
                self.registry.tool_names().join(", ")
            )));
        };

        let request = match call.to_request() {
            Ok(r) => r,
            Err(e) => {
                audit(name, "bad_arguments", start, &call.function.arguments);
                return Dispatch::Continue(Message::tool(
                    &call.id,
                    name,
                    format!("Error: arguments for `{name}` are not a valid JSON object: {e}"),
                ));
            }
        };

        for param in entry
            .injected()
            .iter()
            .filter(|p| !self.capabilities.contains(&p.capability))
        {
            tracing::warn!(
                tool = %name,
                param = %param.name,
                capability = param.capability.type_name(),
                "injected capability not bound"
            );
        }
        let injected = self.capabilities.resolve(entry.injected());
        let args = ToolArgs::new(request.arguments, injected);
        let result = AssertUnwindSafe(entry.tool().call(args)).catch_unwind().await;

        let (outcome, content) = match result {
            Ok(Ok(ToolOutput::EndSession)) => {
                audit(name, "end_session", start, &call.function.arguments);
                return Dispatch::Terminate;
            }
            Ok(Ok(output)) => ("ok", output.render().unwrap_or_default()),
            Ok(Err(e)) => ("error", format!("Error: tool `{name}` failed\n{e:?}")),
            Err(panic) => (
                "panic",
                format!("Error: tool `{name}` panicked: {}", panic_message(panic.as_ref())),
            ),
        };
        audit(name, outcome, start, &call.function.arguments);
        Dispatch::Continue(Message::tool(&call.id, name, content))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

fn audit(tool: &str, outcome: &str, start: Instant, raw_args: &str) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool,
        "ok": outcome == "ok",
        "outcome": outcome,
        "duration_ms": start.elapsed().as_millis() as u64,
        "args_preview": args_preview(raw_args),
    });
    tracing::info!(audit = %audit.to_string(), "tool");
}

fn args_preview(raw: &str) -> String {
    if raw.chars().count() > 200 {
        format!("{}...", raw.chars().take(200).collect::<String>())
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anyhow::Context;
    use serde_json::json;

    use crate::llm::Role;
    use crate::tools::Param;

    struct Prefix(String);

    fn explode() -> anyhow::Result<ToolOutput> {
        panic!("kaboom")
    }

    fn executor() -> ToolExecutor {
        let mut reg = ToolRegistry::new();
        reg.register_fn(
            "shout",
            "Upper-cases text",
            vec![Param::text("text").describe("Text to shout")],
            |args| async move { Ok(ToolOutput::text(args.text("text")?.to_uppercase())) },
        )
        .unwrap();
        reg.register_fn(
            "prefixed",
            "Prefixes text with an injected prefix",
            vec![
                Param::text("text").describe("Text"),
                Param::injected::<Prefix>("prefix"),
            ],
            |args| async move {
                let prefix = args.injected::<Prefix>("prefix")?;
                Ok(ToolOutput::text(format!("{}{}", prefix.0, args.text("text")?)))
            },
        )
        .unwrap();
        reg.register_fn("fail", "Always fails", vec![], |_| async {
            Err::<ToolOutput, _>(std::io::Error::other("disk on fire")).context("while failing")
        })
        .unwrap();
        reg.register_fn("boom", "Panics", vec![], |_| async { explode() })
            .unwrap();
        reg.register_fn("quit", "Ends the session", vec![], |_| async { Ok(ToolOutput::EndSession) })
            .unwrap();
        ToolExecutor::new(reg, Capabilities::new())
    }

    fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall::new(id, name, args)
    }

    #[tokio::test]
    async fn test_successful_call_echoes_id() {
        let out = executor().execute(&call("c1", "shout", json!({"text": "hello"}))).await;
        assert_eq!(out, Dispatch::Continue(Message::tool("c1", "shout", "HELLO")));
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_system_message() {
        let Dispatch::Continue(msg) = executor().execute(&call("c1", "nope", json!({}))).await else {
            panic!("expected Continue");
        };
        assert_eq!(msg.role, Role::System);
        assert!(msg.content.unwrap().contains("`nope`"));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_tool_message_with_chain() {
        let Dispatch::Continue(msg) = executor().execute(&call("c2", "fail", json!({}))).await else {
            panic!("expected Continue");
        };
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("c2"));
        let content = msg.content.unwrap();
        assert!(content.contains("while failing"));
        assert!(content.contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let Dispatch::Continue(msg) = executor().execute(&call("c3", "boom", json!({}))).await else {
            panic!("expected Continue");
        };
        assert!(msg.content.unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_end_session_terminates() {
        assert_eq!(executor().execute(&call("c4", "quit", json!({}))).await, Dispatch::Terminate);
    }

    #[tokio::test]
    async fn test_injection_resolved_at_call_time() {
        let mut ex = executor();
        let Dispatch::Continue(missing) = ex.execute(&call("c5", "prefixed", json!({"text": "x"}))).await else {
            panic!("expected Continue");
        };
        assert!(missing.content.unwrap().contains("missing required argument `prefix`"));

        ex.capabilities_mut().insert(Arc::new(Prefix(">> ".into())));
        let out = ex.execute(&call("c6", "prefixed", json!({"text": "x"}))).await;
        assert_eq!(out, Dispatch::Continue(Message::tool("c6", "prefixed", ">> x")));
    }

    #[tokio::test]
    async fn test_malformed_arguments_reported_to_model() {
        let mut bad = call("c7", "shout", json!({}));
        bad.function.arguments = "{not json".into();
        let Dispatch::Continue(msg) = executor().execute(&bad).await else {
            panic!("expected Continue");
        };
        assert_eq!(msg.role, Role::Tool);
        assert!(msg.content.unwrap().contains("not a valid JSON object"));
    }
}
