//! 错误类型
//!
//! 按阶段划分：注册期（SchemaError，启动即失败）、传输层（TransportError，当前轮致命）、
//! 会话层（SessionError，向 make_request 调用方传播）。工具执行错误不在此列：
//! 它们被序列化进 tool 消息交还模型，不会中断循环。

use thiserror::Error;

/// 工具注册期错误：参数缺少描述、类型不受支持、参数重名
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("tool `{tool}`: parameter `{param}` has neither a description nor an injection tag")]
    MissingDescription { tool: String, param: String },

    #[error("tool `{tool}`: parameter `{param}` has unsupported type {found}")]
    UnsupportedType {
        tool: String,
        param: String,
        found: String,
    },

    #[error("tool `{tool}`: parameter `{param}` declared more than once")]
    DuplicateParam { tool: String, param: String },

    #[error("tool name must not be empty")]
    EmptyName,
}

/// 补全端点传输错误（非 2xx、响应体无法解析、缺少凭据等）
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion payload: {0}")]
    Decode(String),

    #[error("no API credential configured")]
    MissingCredential,

    /// 脚本化传输（测试用）的响应已耗尽
    #[error("scripted transport exhausted after {0} responses")]
    Exhausted(usize),
}

/// 内置工具组的领域错误（作为工具结果交还模型，不中断会话）
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("Keywords cannot contain a space: {0:?}")]
    InvalidKeyword(String),

    #[error("Unknown room number: {0}")]
    UnknownRoom(i64),

    #[error("Room number must be a whole number: {0}")]
    InvalidRoomNumber(f64),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// 会话层错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// 会话已被工具的终止信号结束，不再接受输入
    #[error("session has already ended")]
    Ended,
}
