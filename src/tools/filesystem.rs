//! 沙箱文件系统工具
//!
//! SafeFs 绑定 root_dir，所有路径必须落在 root 下（禁止绝对路径与 ../ 逃逸）；
//! ReadFileTool / WriteFileTool 基于 SafeFs 提供 read_file / write_file 能力。

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use crate::core::ToolError;
use crate::tools::{Param, Tool, ToolArgs, ToolOutput};

/// 沙箱文件系统：绑定根目录，校验路径在根下，防止路径逃逸
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 词法校验：只允许普通路径段与 `.`
    fn join_checked(&self, path: &str) -> Result<PathBuf, ToolError> {
        let rel = Path::new(path.trim());
        let clean = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean || rel.as_os_str().is_empty() {
            return Err(ToolError::PathEscape(path.to_string()));
        }
        Ok(self.root_dir.join(rel))
    }

    /// 解析已存在的路径（符号链接展开后仍须在根下）
    pub fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let full = self.join_checked(path)?;
        let canonical = full
            .canonicalize()
            .with_context(|| format!("Path not found: {path}"))?;
        if canonical.starts_with(&self.root_dir) {
            Ok(canonical)
        } else {
            Err(ToolError::PathEscape(path.to_string()).into())
        }
    }

    fn check_existing_ancestor(&self, dir: &Path, path: &str) -> Result<(), ToolError> {
        match dir.ancestors().find(|a| a.exists()).map(Path::canonicalize) {
            Some(Ok(canon)) if canon.starts_with(&self.root_dir) => Ok(()),
            _ => Err(ToolError::PathEscape(path.to_string())),
        }
    }

    pub async fn read_file(&self, path: &str) -> anyhow::Result<String> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .with_context(|| format!("Read failed: {path}"))
    }

    /// 覆盖写入；父目录不存在时在根下创建
    pub async fn write_file(&self, path: &str, content: &str) -> anyhow::Result<()> {
        let full = self.join_checked(path)?;
        if let Some(parent) = full.parent() {
            // 建目录前先确认已存在的最深祖先仍在根下
            self.check_existing_ancestor(parent, path)?;
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Create directory failed: {}", parent.display()))?;
            let parent_canon = parent.canonicalize()?;
            if !parent_canon.starts_with(&self.root_dir) {
                return Err(ToolError::PathEscape(path.to_string()).into());
            }
        }
        if let Ok(meta) = tokio::fs::symlink_metadata(&full).await {
            if meta.file_type().is_symlink() {
                let target = full
                    .canonicalize()
                    .map_err(|_| ToolError::PathEscape(path.to_string()))?;
                if !target.starts_with(&self.root_dir) {
                    return Err(ToolError::PathEscape(path.to_string()).into());
                }
            }
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("Write failed: {path}"))
    }
}

/// read_file 工具
pub struct ReadFileTool {
    fs: SafeFs,
}

impl ReadFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a file on the computer at a given path"
    }

    fn params(&self) -> Vec<Param> {
        vec![Param::text("file_path").describe("The relative path to the file to read")]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let path = args.text("file_path")?;
        tracing::info!(path = %path, "read_file tool execute");
        Ok(ToolOutput::text(self.fs.read_file(&path).await?))
    }
}

/// write_file 工具
pub struct WriteFileTool {
    fs: SafeFs,
}

impl WriteFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes a file on the computer at a given path overwriting everything in the file"
    }

    fn params(&self) -> Vec<Param> {
        vec![
            Param::text("file_path").describe("The relative path to the file to write"),
            Param::text("content").describe("The content to write to the given file"),
        ]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let path = args.text("file_path")?;
        let content = args.text("content")?;
        tracing::info!(path = %path, bytes = content.len(), "write_file tool execute");
        self.fs.write_file(&path, &content).await?;
        Ok(ToolOutput::none())
    }
}

/// 文件工具组
pub fn group(root_dir: impl AsRef<Path>) -> Vec<Box<dyn Tool>> {
    let fs = SafeFs::new(root_dir);
    vec![
        Box::new(ReadFileTool::new(fs.clone())),
        Box::new(WriteFileTool::new(fs)),
    ]
}
