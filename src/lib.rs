//! Eris - 对话式工具调度引擎
//!
//! 模块划分：
//! - **agent**: 由配置装配完整会话（内置工具组 + 会话级能力）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型（注册期 / 传输 / 会话 / 内置工具）
//! - **llm**: 消息模型与补全传输（OpenAI 兼容 / 脚本化 Mock）
//! - **observability**: 日志初始化
//! - **session**: 会话主循环、对话状态、会话句柄、回复输出端
//! - **tools**: 工具描述生成、注册表、能力注入、执行器与内置工具组

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod session;
pub mod tools;

pub use session::{Session, TurnOutcome};
pub use tools::{Tool, ToolRegistry};
