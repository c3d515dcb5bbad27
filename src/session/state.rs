//! 会话对话状态
//!
//! history：只追加的有序消息记录（端点对顺序敏感）；outbox：待发送消息的 FIFO 队列；
//! awaiting：本轮响应中尚未产出结果的工具调用数。只有 awaiting 归零时 outbox 才会被整体
//! 刷入 history，从而保证同一批工具结果在下一次请求前全部落入历史。

use std::collections::VecDeque;

use crate::llm::{Message, Role};

#[derive(Debug, Clone)]
pub struct ConversationState {
    history: Vec<Message>,
    outbox: VecDeque<Message>,
    awaiting: usize,
    turn_start: usize,
}

impl ConversationState {
    /// 以 system 消息为种子创建
    pub fn new(system: Message) -> Self {
        Self {
            history: vec![system],
            outbox: VecDeque::new(),
            awaiting: 0,
            turn_start: 1,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.outbox.iter()
    }

    pub fn awaiting(&self) -> usize {
        self.awaiting
    }

    /// 替换种子 system 消息（仅在对话开始前有效）
    pub fn reseed(&mut self, system: Message) -> bool {
        if self.history.len() == 1 && self.outbox.is_empty() {
            self.history[0] = system;
            true
        } else {
            false
        }
    }

    /// 新一轮用户输入
    pub fn push_input(&mut self, message: Message) {
        self.turn_start = self.history.len();
        self.outbox.push_back(message);
    }

    /// 响应含 n 个工具调用：在 n 个结果全部入队前禁止发送
    pub fn expect_batch(&mut self, n: usize) {
        self.awaiting = n;
    }

    /// 一个工具调用的结果入队
    pub fn enqueue_result(&mut self, message: Message) {
        self.awaiting = self.awaiting.saturating_sub(1);
        self.outbox.push_back(message);
    }

    pub fn ready_to_send(&self) -> bool {
        self.awaiting == 0
    }

    /// 按入队顺序把 outbox 刷入 history，返回刷入条数；批次未齐时不刷
    pub fn flush(&mut self) -> usize {
        if !self.ready_to_send() {
            tracing::warn!(awaiting = self.awaiting, "flush requested with an incomplete tool batch");
            return 0;
        }
        let n = self.outbox.len();
        self.history.extend(self.outbox.drain(..));
        n
    }

    /// 模型返回的消息按 choice 顺序追加到 history
    pub fn record_response(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.history.extend(messages);
    }

    /// 本轮最后一条带文本的 assistant 消息
    pub fn last_assistant_text(&self) -> Option<String> {
        self.history[self.turn_start.min(self.history.len())..]
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.text().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_held_until_complete() {
        let mut state = ConversationState::new(Message::system("sys"));
        state.push_input(Message::user("hi"));
        assert_eq!(state.flush(), 1);

        state.expect_batch(2);
        state.enqueue_result(Message::tool("a", "t", "1"));
        assert!(!state.ready_to_send());
        assert_eq!(state.flush(), 0);
        state.enqueue_result(Message::tool("b", "t", "2"));
        assert_eq!(state.flush(), 2);

        let ids: Vec<_> = state.history()[2..]
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_last_assistant_text_scoped_to_turn() {
        let mut state = ConversationState::new(Message::system("sys"));
        state.push_input(Message::user("one"));
        state.flush();
        state.record_response([Message::assistant("first answer")]);

        state.push_input(Message::user("two"));
        state.flush();
        assert_eq!(state.last_assistant_text(), None);
        state.record_response([Message::assistant("second answer")]);
        assert_eq!(state.last_assistant_text().as_deref(), Some("second answer"));
    }

    #[test]
    fn test_reseed_only_before_conversation() {
        let mut state = ConversationState::new(Message::system("old"));
        assert!(state.reseed(Message::system("new")));
        state.push_input(Message::user("hi"));
        assert!(!state.reseed(Message::system("late")));
        assert_eq!(state.history()[0].content.as_deref(), Some("new"));
    }
}
