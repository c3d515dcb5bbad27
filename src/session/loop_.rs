//! 会话主循环
//!
//! 用户输入 -> 入队 -> 刷入历史 -> 携带全部历史与工具描述请求补全 -> 响应逐 choice 追加到历史 ->
//! 文本投递给输出端，工具调用逐个分派，结果按请求顺序入队 -> 本轮有工具调用则回到请求，否则结束。
//! 工具返回终止信号时立即结束会话；传输错误向调用方传播。

use std::sync::Arc;

use chrono::Utc;

use crate::core::SessionError;
use crate::llm::{ChatTransport, Message, TokenUsage, Usage};
use crate::session::prompt::system_prompt;
use crate::session::sink::normalize_text;
use crate::session::{ConversationState, NullSink, ResponseSink, SessionHandle};
use crate::tools::{Capabilities, Dispatch, ToolExecutor, ToolRegistry};

/// 一轮 make_request 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 模型给出最终回答：本轮最后一条 assistant 文本（可能为空）
    Finished(Option<String>),
    /// 某个工具发出终止信号，会话结束
    Ended,
}

/// 会话：拥有对话状态、工具执行器与输出端；同一时刻只由一个调用方驱动
pub struct Session {
    transport: Arc<dyn ChatTransport>,
    model: String,
    system_prompt: String,
    executor: ToolExecutor,
    state: ConversationState,
    sink: Box<dyn ResponseSink>,
    usage: TokenUsage,
    ended: bool,
}

impl Session {
    /// 以默认提示词（无用户名/位置）创建会话，并把会话句柄绑定进能力容器
    pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>, registry: ToolRegistry) -> Self {
        let prompt = system_prompt(None, None, Utc::now());
        let mut session = Self {
            transport,
            model: model.into(),
            state: ConversationState::new(Message::system(prompt.clone())),
            system_prompt: prompt,
            executor: ToolExecutor::new(registry, Capabilities::new()),
            sink: Box::new(NullSink),
            usage: TokenUsage::new(),
            ended: false,
        };
        session.bind_handle();
        session
    }

    /// 替换种子 system 提示词；对话开始后调用无效
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if self.state.reseed(Message::system(prompt.clone())) {
            self.system_prompt = prompt;
            self.bind_handle();
        } else {
            tracing::warn!("system prompt ignored: conversation already started");
        }
        self
    }

    /// 设置能力容器（会话句柄会被重新绑定）
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        *self.executor.capabilities_mut() = capabilities;
        self.bind_handle();
        self
    }

    pub fn with_sink(mut self, sink: impl ResponseSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    fn bind_handle(&mut self) {
        let handle = SessionHandle::new(
            Arc::clone(&self.transport),
            self.model.clone(),
            self.system_prompt.clone(),
            self.usage.clone(),
        );
        self.executor.capabilities_mut().insert(Arc::new(handle));
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[Message] {
        self.state.history()
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// 累计 token，含嵌套补全
    pub fn usage(&self) -> Usage {
        self.usage.totals()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// 处理一条用户输入直到模型给出最终回答或会话被终止；历史跨轮保留
    pub async fn make_request(&mut self, input: &str) -> Result<TurnOutcome, SessionError> {
        if self.ended {
            return Err(SessionError::Ended);
        }
        self.state.push_input(Message::user(input));

        let mut round = 0usize;
        loop {
            round += 1;
            self.state.flush();

            let tools = self.executor.descriptors();
            tracing::debug!(
                round,
                history = self.state.history().len(),
                tools = tools.len(),
                "sending completion request"
            );
            let response = self
                .transport
                .send(&self.model, self.state.history(), &tools)
                .await?;
            if let Some(u) = response.usage {
                self.usage.record(&u);
                tracing::debug!(
                    prompt_tokens = u.prompt_tokens,
                    completion_tokens = u.completion_tokens,
                    "completion usage"
                );
            }

            self.state
                .record_response(response.choices.iter().map(|c| c.message.clone()));
            let calls: usize = response
                .choices
                .iter()
                .map(|c| c.message.tool_calls().len())
                .sum();
            self.state.expect_batch(calls);

            for choice in &response.choices {
                if let Some(text) = choice.message.text() {
                    self.sink.deliver(&normalize_text(text), &self.model);
                }
                for call in choice.message.tool_calls() {
                    tracing::debug!(tool = %call.function.name, call_id = %call.id, "dispatching tool call");
                    match self.executor.execute(call).await {
                        Dispatch::Continue(result) => self.state.enqueue_result(result),
                        Dispatch::Terminate => {
                            tracing::info!(tool = %call.function.name, "session terminated by tool");
                            self.ended = true;
                            return Ok(TurnOutcome::Ended);
                        }
                    }
                }
            }

            if calls == 0 {
                return Ok(TurnOutcome::Finished(self.state.last_assistant_text()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::llm::{ChatResponse, Role, ScriptedTransport, ToolCall};
    use crate::session::CollectingSink;
    use crate::tools::{Param, ToolOutput};

    fn echo_registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register_fn(
            "echo",
            "Echoes text back upper-cased",
            vec![Param::text("text").describe("Text to echo")],
            |args| async move { Ok(ToolOutput::text(args.text("text")?.to_uppercase())) },
        )
        .unwrap();
        reg
    }

    #[tokio::test]
    async fn test_plain_answer_finishes_turn() {
        let transport = Arc::new(ScriptedTransport::from_turns([vec![Message::assistant("Hi there")]]));
        let sink = CollectingSink::new();
        let mut session = Session::new(transport.clone(), "m", echo_registry()).with_sink(sink.clone());

        let out = session.make_request("hello").await.unwrap();
        assert_eq!(out, TurnOutcome::Finished(Some("Hi there".into())));
        assert_eq!(sink.delivered(), vec![("Hi there".to_string(), "m".to_string())]);

        let roles: Vec<_> = session.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(transport.requests()[0].tools, vec!["echo"]);
    }

    #[tokio::test]
    async fn test_echo_scenario() {
        let transport = Arc::new(ScriptedTransport::from_turns([
            vec![Message::assistant_tool_calls(vec![ToolCall::new(
                "call_1",
                "echo",
                json!({"text": "hello"}),
            )])],
            vec![Message::assistant("It says HELLO")],
        ]));
        let mut session = Session::new(transport.clone(), "m", echo_registry());

        let out = session.make_request("please echo hello").await.unwrap();
        assert_eq!(out, TurnOutcome::Finished(Some("It says HELLO".into())));

        let second = &transport.requests()[1].messages;
        let tool_msg = second.last().unwrap();
        assert_eq!(tool_msg, &Message::tool("call_1", "echo", "HELLO"));
    }

    #[tokio::test]
    async fn test_text_and_tool_call_in_same_message() {
        let mut msg = Message::assistant("Let me check\u{2026} \u{201C}quoted\u{201D}");
        msg.tool_calls = Some(vec![ToolCall::new("c", "echo", json!({"text": "x"}))]);
        let transport = Arc::new(ScriptedTransport::from_turns([vec![msg], vec![Message::assistant("done")]]));
        let sink = CollectingSink::new();
        let mut session = Session::new(transport, "m", echo_registry()).with_sink(sink.clone());

        session.make_request("go").await.unwrap();
        assert_eq!(sink.texts(), vec!["Let me check\u{2026} \"quoted\"", "done"]);
        // 历史保留模型原文
        assert!(session.history()[2].content.as_deref().unwrap().contains('\u{201C}'));
    }

    #[tokio::test]
    async fn test_ended_session_rejects_input() {
        let mut reg = ToolRegistry::new();
        reg.register(crate::tools::control::EndChatTool).unwrap();
        let transport = Arc::new(ScriptedTransport::from_turns([vec![Message::assistant_tool_calls(vec![
            ToolCall::new("bye", "end_chat", json!({})),
        ])]]));
        let mut session = Session::new(transport, "m", reg);

        assert_eq!(session.make_request("bye").await.unwrap(), TurnOutcome::Ended);
        assert!(session.is_ended());
        assert!(matches!(session.make_request("again").await, Err(SessionError::Ended)));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut session = Session::new(transport, "m", ToolRegistry::new());
        assert!(matches!(
            session.make_request("hi").await,
            Err(SessionError::Transport(_))
        ));
        assert!(!session.is_ended());
    }

    #[tokio::test]
    async fn test_responses_queued_between_turns_and_usage_totals() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut session = Session::new(transport.clone(), "m", echo_registry());

        let mut first = ChatResponse::from_messages(vec![Message::assistant("one")]);
        first.usage = Some(Usage {
            prompt_tokens: 12,
            completion_tokens: 3,
            total_tokens: 15,
        });
        transport.push(first);
        session.make_request("first").await.unwrap();

        let mut second = ChatResponse::from_messages(vec![Message::assistant("two")]);
        second.usage = Some(Usage {
            prompt_tokens: 20,
            completion_tokens: 5,
            total_tokens: 25,
        });
        transport.push(second);
        let out = session.make_request("second").await.unwrap();
        assert_eq!(out, TurnOutcome::Finished(Some("two".into())));

        let usage = session.usage();
        assert_eq!(usage.prompt_tokens, 32);
        assert_eq!(usage.completion_tokens, 8);
        assert_eq!(usage.total_tokens, 40);
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_system_prompt_override_seeds_history() {
        let transport = Arc::new(ScriptedTransport::from_turns([vec![Message::assistant("ok")]]));
        let mut session = Session::new(transport.clone(), "m", ToolRegistry::new()).with_system_prompt("be brief");
        session.make_request("hi").await.unwrap();
        assert_eq!(transport.requests()[0].messages[0].content.as_deref(), Some("be brief"));
        assert!(transport.requests()[0].tools.is_empty());
    }
}
