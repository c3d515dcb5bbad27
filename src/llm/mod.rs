//! LLM 层：消息模型、补全传输抽象与实现（OpenAI 兼容 / 脚本化 Mock）

pub mod mock;
pub mod openai;
pub mod traits;
pub mod types;

pub use mock::{RecordedRequest, ScriptedTransport};
pub use openai::{OpenAiTransport, TokenUsage, OPENAI_BASE_URL};
pub use traits::ChatTransport;
pub use types::{
    ChatRequest, ChatResponse, Choice, FunctionCall, Message, Role, ToolCall, ToolCallRequest,
    Usage, WireTool,
};
