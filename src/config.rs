//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：默认 TOML 文件、命令行指定的文件，最后用环境变量 `ERIS__*` 覆盖（双下划线表示嵌套，如 `ERIS__LLM__MODEL=gpt-4o`）。
//! 会话核心只接收这里解析出的普通值，自身不读取环境变量。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::llm::OPENAI_BASE_URL;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub user: UserSection,
    pub tools: ToolsSection,
}

/// [llm] 段：模型、端点、凭据与请求超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 未设置时回退到环境变量 OPENAI_API_KEY
    pub api_key: Option<String>,
    /// 单次补全请求超时（秒）；未设置则不设超时
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo-0613".to_string()
}

fn default_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}

impl LlmSection {
    /// 配置中的凭据，缺省时取 OPENAI_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// [user] 段：写入系统提示词的展示信息
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserSection {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// [tools] 段：文件工具根目录、记忆文件路径
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    #[serde(default = "default_memory_path")]
    pub memory_path: PathBuf,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            memory_path: default_memory_path(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_memory_path() -> PathBuf {
    PathBuf::from("model_output/memories.json")
}

/// 默认配置文件的候选位置，按顺序取第一个存在的
const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["config/default.toml", "eris.toml"];

fn default_config_file() -> Option<PathBuf> {
    DEFAULT_CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// 加载配置：默认文件（可缺省）-> 显式指定的文件（必须存在）-> 环境变量 ERIS__*
///
/// 显式路径不存在时报错，而不是静默退回默认值。
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = default_config_file() {
        tracing::debug!(path = %path.display(), "loading default config");
        builder = builder.add_source(config::File::from(path).required(false));
    }
    if let Some(path) = config_path {
        tracing::debug!(path = %path.display(), "loading config override");
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder
        .add_source(
            config::Environment::with_prefix("ERIS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo-0613");
        assert_eq!(cfg.llm.base_url, OPENAI_BASE_URL);
        assert!(cfg.llm.request_timeout().is_none());
        assert_eq!(cfg.tools.memory_path, PathBuf::from("model_output/memories.json"));
    }

    #[test]
    fn test_explicit_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[llm]\nmodel = \"gpt-4o-mini\"\nrequest_timeout_secs = 30\n\n[user]\nname = \"Ada\"\n"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.user.name.as_deref(), Some("Ada"));
        assert_eq!(cfg.tools.workspace_root, PathBuf::from("."));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_configured_key_wins_over_env() {
        let llm = LlmSection {
            api_key: Some("sk-configured".into()),
            ..LlmSection::default()
        };
        assert_eq!(llm.resolved_api_key().as_deref(), Some("sk-configured"));
    }
}
