//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / params / call），注册时一次性生成描述并校验；
//! 同名再次注册时覆盖（后注册者胜出，便于后加载的工具组替换先前的桩实现）。
//! 描述按注册顺序输出，随每次补全请求发送。

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::SchemaError;
use crate::tools::schema::{build_schema, InjectedParam, Param, ToolDescriptor, ToolSchema};
use crate::tools::{ToolArgs, ToolOutput};

/// 工具 trait：名称、描述（供 LLM 理解）、参数声明、异步调用
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（模型调用时使用）
    fn name(&self) -> &str;

    /// 一行描述
    fn description(&self) -> &str;

    /// 参数声明；默认无参数
    fn params(&self) -> Vec<Param> {
        Vec::new()
    }

    /// 执行工具；Err 会连同错误链作为结果交还模型，返回 ToolOutput::EndSession 则结束会话
    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput>;
}

type ToolFn = dyn Fn(ToolArgs) -> BoxFuture<'static, anyhow::Result<ToolOutput>> + Send + Sync;

/// 以闭包实现的工具
pub struct FnTool {
    name: String,
    description: String,
    params: Vec<Param>,
    f: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, params: Vec<Param>, f: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params,
            f: Box::new(move |args| f(args).boxed()),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn params(&self) -> Vec<Param> {
        self.params.clone()
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        (self.f)(args).await
    }
}

/// 注册表条目：工具 + 注册期生成的 schema，注册后不可变
#[derive(Clone)]
pub struct RegistryEntry {
    tool: Arc<dyn Tool>,
    schema: ToolSchema,
}

impl RegistryEntry {
    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.schema.descriptor
    }

    pub fn injected(&self) -> &[InjectedParam] {
        &self.schema.injected
    }
}

/// 工具注册表：按名称查找，按注册顺序输出描述
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), SchemaError> {
        self.register_boxed(Box::new(tool))
    }

    /// 以闭包注册：`register_fn(name, description, params, |args| async move { ... })`
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<Param>,
        f: F,
    ) -> Result<(), SchemaError>
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        self.register(FnTool::new(name, description, params, f))
    }

    /// 批量注册一个工具组；遇到第一个 SchemaError 即返回
    pub fn register_group(&mut self, group: Vec<Box<dyn Tool>>) -> Result<(), SchemaError> {
        group.into_iter().try_for_each(|tool| self.register_boxed(tool))
    }

    pub fn register_boxed(&mut self, tool: Box<dyn Tool>) -> Result<(), SchemaError> {
        let schema = build_schema(tool.name(), tool.description(), &tool.params())?;
        let name = schema.descriptor.name.clone();
        let entry = RegistryEntry {
            tool: Arc::from(tool),
            schema,
        };
        match self.index.get(&name) {
            Some(&i) => {
                tracing::debug!(tool = %name, "overriding previously registered tool");
                self.entries[i] = entry;
            }
            None => {
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&RegistryEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// 全部工具描述，按注册顺序
    pub fn all_descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor().clone()).collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.descriptor().name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
