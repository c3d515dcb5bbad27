//! 工具入参与返回值
//!
//! ToolArgs 合并了模型提供的 JSON 参数与注入的会话能力；取参失败返回缺参/类型错误，
//! 该错误会作为工具结果交还模型。ToolOutput 的 EndSession 即终止信号。

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// 一次调用的参数：模型参数 + 已解析的注入实例
#[derive(Clone, Default)]
pub struct ToolArgs {
    values: Map<String, Value>,
    injected: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ToolArgs {
    pub fn new(values: Map<String, Value>, injected: HashMap<String, Arc<dyn Any + Send + Sync>>) -> Self {
        Self { values, injected }
    }

    pub fn from_values(values: Map<String, Value>) -> Self {
        Self::new(values, HashMap::new())
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    fn raw(&self, name: &str) -> anyhow::Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| anyhow!("missing required argument `{name}`"))
    }

    pub fn text(&self, name: &str) -> anyhow::Result<String> {
        match self.raw(name)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(anyhow!("argument `{name}` must be a string, got {other}")),
        }
    }

    /// 布尔参数；容忍 "true"/"false"/"on"/"off" 字符串
    pub fn boolean(&self, name: &str) -> anyhow::Result<bool> {
        match self.raw(name)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "on" => Ok(true),
                "false" | "off" => Ok(false),
                _ => Err(anyhow!("argument `{name}` must be a boolean, got {s:?}")),
            },
            other => Err(anyhow!("argument `{name}` must be a boolean, got {other}")),
        }
    }

    pub fn number(&self, name: &str) -> anyhow::Result<f64> {
        match self.raw(name)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| anyhow!("argument `{name}` is not representable as f64")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .with_context(|| format!("argument `{name}` must be a number")),
            other => Err(anyhow!("argument `{name}` must be a number, got {other}")),
        }
    }

    /// 任意可反序列化类型，如 `args.get::<Vec<String>>("keywords")`
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let raw = self.raw(name)?.clone();
        serde_json::from_value(raw).with_context(|| format!("invalid value for argument `{name}`"))
    }

    /// 注入的会话能力；未绑定时视为缺参
    pub fn injected<T: Any + Send + Sync>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        let instance = self
            .injected
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument `{name}` (capability not bound)"))?;
        instance
            .downcast::<T>()
            .map_err(|_| anyhow!("injected argument `{name}` is not a {}", std::any::type_name::<T>()))
    }
}

impl std::fmt::Debug for ToolArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolArgs")
            .field("values", &self.values)
            .field("injected", &self.injected.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 工具返回值：任意可转文本的值，或终止会话
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    Value(Value),
    EndSession,
}

impl ToolOutput {
    pub fn text(s: impl Into<String>) -> Self {
        ToolOutput::Value(Value::String(s.into()))
    }

    pub fn none() -> Self {
        ToolOutput::Value(Value::Null)
    }

    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(ToolOutput::Value(serde_json::to_value(value)?))
    }

    /// 结果文本：字符串原样，null 为 "null"，其余为紧凑 JSON；EndSession 无文本
    pub fn render(&self) -> Option<String> {
        match self {
            ToolOutput::Value(Value::String(s)) => Some(s.clone()),
            ToolOutput::Value(v) => Some(v.to_string()),
            ToolOutput::EndSession => None,
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        ToolOutput::text(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        ToolOutput::text(s)
    }
}

impl From<bool> for ToolOutput {
    fn from(b: bool) -> Self {
        ToolOutput::Value(Value::Bool(b))
    }
}

impl From<Value> for ToolOutput {
    fn from(v: Value) -> Self {
        ToolOutput::Value(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> ToolArgs {
        ToolArgs::from_values(v.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_typed_accessors() {
        let a = args(json!({"s": "hi", "b": "off", "n": 3, "list": ["x", "y"]}));
        assert_eq!(a.text("s").unwrap(), "hi");
        assert!(!a.boolean("b").unwrap());
        assert_eq!(a.number("n").unwrap(), 3.0);
        assert_eq!(a.get::<Vec<String>>("list").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_missing_argument_errors() {
        let a = args(json!({}));
        let err = a.text("path").unwrap_err();
        assert!(err.to_string().contains("missing required argument `path`"));
        assert!(a.injected::<String>("session").is_err());
    }

    #[test]
    fn test_injected_downcast() {
        let mut injected: HashMap<String, Arc<dyn Any + Send + Sync>> = HashMap::new();
        injected.insert("label".into(), Arc::new("bound".to_string()));
        let a = ToolArgs::new(Map::new(), injected);
        assert_eq!(a.injected::<String>("label").unwrap().as_str(), "bound");
        assert!(a.injected::<u32>("label").is_err());
    }

    #[test]
    fn test_render() {
        assert_eq!(ToolOutput::text("plain").render().as_deref(), Some("plain"));
        assert_eq!(ToolOutput::none().render().as_deref(), Some("null"));
        assert_eq!(ToolOutput::from(true).render().as_deref(), Some("true"));
        assert_eq!(ToolOutput::from(json!(["a"])).render().as_deref(), Some("[\"a\"]"));
        assert_eq!(ToolOutput::EndSession.render(), None);
    }
}
