//! 长期记忆工具：关键词索引的扁平 JSON 文件存储
//!
//! MemoryStore 作为会话能力注入；记录以随机 id 为键写入单个 JSON 对象文件。
//! 关键词不得含空格，检索时大小写不敏感。summarize_memories 另外注入 SessionHandle，
//! 用一次嵌套补全把检索结果压缩成摘要。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::ToolError;
use crate::session::SessionHandle;
use crate::tools::{Param, ParamType, Tool, ToolArgs, ToolOutput};

const NO_RESULTS: &str = "No results remembered please try again";

/// 单条记忆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub summary: String,
    pub keywords: Vec<String>,
}

/// 扁平文件记忆存储；文件读写由内部锁串行化
#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

fn validate_keywords(keywords: &[String]) -> Result<(), ToolError> {
    match keywords.iter().find(|kw| kw.contains(' ')) {
        Some(kw) => Err(ToolError::InvalidKeyword(kw.clone())),
        None => Ok(()),
    }
}

impl MemoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> anyhow::Result<BTreeMap<String, MemoryRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt memory file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }

    /// 写入一条记忆，返回其 id
    pub async fn store(&self, summary: &str, keywords: Vec<String>) -> anyhow::Result<String> {
        validate_keywords(&keywords)?;
        let _guard = self.lock.lock().await;
        let mut memories = self.load().await?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        memories.insert(
            id.clone(),
            MemoryRecord {
                summary: summary.to_string(),
                keywords,
            },
        );
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&memories)?)
            .await
            .with_context(|| format!("write {}", self.path.display()))?;
        tracing::debug!(id = %id, total = memories.len(), "memory stored");
        Ok(id)
    }

    /// 任一关键词命中（大小写不敏感）的记忆摘要
    pub async fn recall(&self, keywords: &[String]) -> anyhow::Result<Vec<String>> {
        validate_keywords(keywords)?;
        let _guard = self.lock.lock().await;
        let wanted: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        Ok(self
            .load()
            .await?
            .into_values()
            .filter(|m| m.keywords.iter().any(|k| wanted.contains(&k.to_lowercase())))
            .map(|m| m.summary)
            .collect())
    }
}

fn keywords_param(description: &str) -> Param {
    Param::list("keywords", ParamType::Text).describe(description)
}

pub struct StoreMemoryTool;

#[async_trait]
impl Tool for StoreMemoryTool {
    fn name(&self) -> &str {
        "store_memory"
    }

    fn description(&self) -> &str {
        "Store a memory and keyword list describing the memory"
    }

    fn params(&self) -> Vec<Param> {
        vec![
            Param::text("detailed_summary")
                .describe("Detailed summary of the conversation this memory is about"),
            keywords_param("List of single words without a space to be associated with this memory"),
            Param::injected::<MemoryStore>("store"),
        ]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let summary = args.text("detailed_summary")?;
        let keywords: Vec<String> = args.get("keywords")?;
        let store = args.injected::<MemoryStore>("store")?;
        store.store(&summary, keywords).await?;
        Ok(ToolOutput::none())
    }
}

pub struct RecallMemoryTool;

#[async_trait]
impl Tool for RecallMemoryTool {
    fn name(&self) -> &str {
        "recall_memory_keyword"
    }

    fn description(&self) -> &str {
        "Recall a set of memories from a given list of keywords"
    }

    fn params(&self) -> Vec<Param> {
        vec![
            keywords_param("List of keywords to use to search for a given memory"),
            Param::injected::<MemoryStore>("store"),
        ]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let keywords: Vec<String> = args.get("keywords")?;
        let store = args.injected::<MemoryStore>("store")?;
        let found = store.recall(&keywords).await?;
        if found.is_empty() {
            Ok(ToolOutput::text(NO_RESULTS))
        } else {
            Ok(ToolOutput::text(serde_json::to_string(&found)?))
        }
    }
}

pub struct SummarizeMemoriesTool;

#[async_trait]
impl Tool for SummarizeMemoriesTool {
    fn name(&self) -> &str {
        "summarize_memories"
    }

    fn description(&self) -> &str {
        "Recall memories for a list of keywords and return a short combined summary of them"
    }

    fn params(&self) -> Vec<Param> {
        vec![
            keywords_param("List of keywords to use to search for memories to summarize"),
            Param::injected::<MemoryStore>("store"),
            Param::injected::<SessionHandle>("session"),
        ]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let keywords: Vec<String> = args.get("keywords")?;
        let store = args.injected::<MemoryStore>("store")?;
        let session = args.injected::<SessionHandle>("session")?;
        let found = store.recall(&keywords).await?;
        if found.is_empty() {
            return Ok(ToolOutput::text(NO_RESULTS));
        }
        let prompt = format!(
            "Summarize the following memories in at most three sentences:\n- {}",
            found.join("\n- ")
        );
        let summary = session.ask(&prompt).await.context("nested summary completion failed")?;
        Ok(ToolOutput::text(summary))
    }
}

pub fn group() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(StoreMemoryTool),
        Box::new(RecallMemoryTool),
        Box::new(SummarizeMemoriesTool),
    ]
}
