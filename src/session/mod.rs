//! 会话层：对话状态机、主循环、会话句柄、回复输出端与系统提示词

pub mod handle;
pub mod loop_;
pub mod prompt;
pub mod sink;
pub mod state;

pub use handle::SessionHandle;
pub use loop_::{Session, TurnOutcome};
pub use prompt::{system_prompt, ASSISTANT_PERSONA};
pub use sink::{normalize_text, CollectingSink, NullSink, ResponseSink, StdoutSink};
pub use state::ConversationState;
