//! 会话句柄：会话把自身映射进能力容器的形式
//!
//! 工具通过注入 SessionHandle 发起嵌套补全（不带工具、不读写外层历史），
//! 因此外层循环中尚未应答的工具调用不会被嵌套请求看到。

use std::sync::Arc;

use crate::core::TransportError;
use crate::llm::{ChatTransport, Message, TokenUsage};

#[derive(Clone)]
pub struct SessionHandle {
    transport: Arc<dyn ChatTransport>,
    model: String,
    system_prompt: String,
    usage: TokenUsage,
}

impl SessionHandle {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            transport,
            model: model.into(),
            system_prompt: system_prompt.into(),
            usage,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 嵌套补全：返回各 choice 文本按序拼接的结果
    pub async fn complete(&self, messages: &[Message]) -> Result<String, TransportError> {
        let response = self.transport.send(&self.model, messages, &[]).await?;
        if let Some(u) = response.usage {
            self.usage.record(&u);
        }
        Ok(response
            .choices
            .iter()
            .filter_map(|c| c.message.text())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// 以会话的 system 提示词加一条用户提问发起嵌套补全
    pub async fn ask(&self, prompt: &str) -> Result<String, TransportError> {
        let messages = [Message::system(self.system_prompt.clone()), Message::user(prompt)];
        self.complete(&messages).await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").field("model", &self.model).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ScriptedTransport};

    #[tokio::test]
    async fn test_ask_sends_system_and_prompt_without_tools() {
        let transport = Arc::new(ScriptedTransport::from_turns([vec![Message::assistant("short summary")]]));
        let handle = SessionHandle::new(transport.clone(), "m", "sys", TokenUsage::new());
        assert_eq!(handle.ask("summarize").await.unwrap(), "short summary");

        let req = &transport.requests()[0];
        assert!(req.tools.is_empty());
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].content.as_deref(), Some("summarize"));
    }
}
