//! 补全传输抽象
//!
//! 会话只依赖 ChatTransport：发送完整历史与工具描述，返回按线上顺序排列的 choices。
//! 实现方必须在非 2xx 时返回错误，不得重排消息或工具调用。

use async_trait::async_trait;

use crate::core::TransportError;
use crate::llm::{ChatResponse, Message};
use crate::tools::ToolDescriptor;

/// 补全传输 trait：一次请求-响应往返，无重试、无流式
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ChatResponse, TransportError>;
}
