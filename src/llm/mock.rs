//! 脚本化传输（用于测试与离线演示，无需 API）
//!
//! 按顺序回放预置的响应，并记录每次收到的请求（历史快照与工具名），便于断言消息顺序。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::TransportError;
use crate::llm::{ChatResponse, ChatTransport, Message};
use crate::tools::ToolDescriptor;

/// 一次被记录的请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// 脚本化传输：响应队列耗尽后返回 Exhausted
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 便捷构造：每个元素是一轮响应中的全部消息（每条消息一个 choice）
    pub fn from_turns(turns: impl IntoIterator<Item = Vec<Message>>) -> Self {
        Self::new(turns.into_iter().map(ChatResponse::from_messages))
    }

    pub fn push(&self, response: ChatResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ChatResponse, TransportError> {
        let served = {
            let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
            requests.push(RecordedRequest {
                model: model.to_string(),
                messages: messages.to_vec(),
                tools: tools.iter().map(|t| t.name.clone()).collect(),
            });
            requests.len()
        };
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or(TransportError::Exhausted(served - 1))
    }
}
