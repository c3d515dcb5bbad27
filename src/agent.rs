//! 会话装配
//!
//! 由配置构建完整会话：注册全部内置工具组（control / file / time / home / memory），
//! 绑定会话级能力（HouseState、MemoryStore），并用用户名/位置生成 system 提示词。
//! 传输由调用方注入，命令行用 OpenAiTransport，测试用 ScriptedTransport。

use std::sync::Arc;

use chrono::Utc;

use crate::config::AppConfig;
use crate::core::SchemaError;
use crate::llm::ChatTransport;
use crate::session::{system_prompt, Session};
use crate::tools::{control, filesystem, home, memory, time};
use crate::tools::{Capabilities, HouseState, MemoryStore, ToolRegistry};

/// 按固定顺序注册全部内置工具组；后注册的同名工具覆盖先前的
pub fn build_registry(cfg: &AppConfig) -> Result<ToolRegistry, SchemaError> {
    let mut registry = ToolRegistry::new();
    registry.register_group(control::group())?;
    registry.register_group(filesystem::group(&cfg.tools.workspace_root))?;
    registry.register_group(time::group())?;
    registry.register_group(home::group())?;
    registry.register_group(memory::group())?;
    Ok(registry)
}

/// 会话级能力；SessionHandle 由 Session 自行绑定
pub fn build_capabilities(cfg: &AppConfig) -> Capabilities {
    Capabilities::new()
        .with(Arc::new(HouseState::default()))
        .with(Arc::new(MemoryStore::new(&cfg.tools.memory_path)))
}

/// 创建会话；注册期错误在任何对话开始前返回
pub fn create_session(cfg: &AppConfig, transport: Arc<dyn ChatTransport>) -> Result<Session, SchemaError> {
    let registry = build_registry(cfg)?;
    tracing::info!(tools = ?registry.tool_names(), model = %cfg.llm.model, "session assembled");
    let prompt = system_prompt(cfg.user.name.as_deref(), cfg.user.location.as_deref(), Utc::now());
    Ok(Session::new(transport, cfg.llm.model.clone(), registry)
        .with_system_prompt(prompt)
        .with_capabilities(build_capabilities(cfg)))
}
