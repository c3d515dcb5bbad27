//! 工具描述生成
//!
//! 每个工具以声明式的 Param 列表描述参数：要么带描述（模型可见），要么带能力标签（注入，模型不可见）。
//! 注册时一次性生成 ToolDescriptor；注入参数不进入对外 schema。
//! 参数类型可直接给出 ParamType，也可由 Rust 类型经 schemars 推导（不支持的类型在注册期报错）。

use std::any::{type_name, Any, TypeId};
use std::collections::HashSet;

use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::SchemaError;

/// 模型可见参数的值类型：text / boolean / number / list-of-T
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Boolean,
    /// 整数与浮点统一映射为 "number"
    Number,
    List(Box<ParamType>),
}

impl ParamType {
    pub fn list(item: ParamType) -> Self {
        ParamType::List(Box::new(item))
    }

    /// 由 Rust 类型推导；Err 携带不受支持类型的 schema 文本
    pub fn of<T: JsonSchema>() -> Result<Self, String> {
        let root = SchemaGenerator::default().into_root_schema_for::<T>();
        let value = serde_json::to_value(&root).map_err(|e| e.to_string())?;
        Self::from_json_schema(&value)
    }

    fn from_json_schema(schema: &Value) -> Result<Self, String> {
        match schema.get("type") {
            Some(Value::String(ty)) => match ty.as_str() {
                "string" => Ok(ParamType::Text),
                "boolean" => Ok(ParamType::Boolean),
                "number" | "integer" => Ok(ParamType::Number),
                "array" => match schema.get("items") {
                    Some(items @ Value::Object(_)) => Ok(ParamType::list(Self::from_json_schema(items)?)),
                    _ => Err("array without a single item type".to_string()),
                },
                other => Err(other.to_string()),
            },
            Some(other) => Err(other.to_string()),
            None => Err(schema
                .get("$ref")
                .and_then(Value::as_str)
                .unwrap_or("untyped schema")
                .to_string()),
        }
    }

    /// 对外 schema 片段；数组必带 items.type
    pub fn to_schema(&self) -> Value {
        match self {
            ParamType::Text => json!({ "type": "string" }),
            ParamType::Boolean => json!({ "type": "boolean" }),
            ParamType::Number => json!({ "type": "number" }),
            ParamType::List(item) => json!({ "type": "array", "items": item.to_schema() }),
        }
    }
}

/// 能力标签：按 Rust 类型区分的注入对象
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capability {
    id: TypeId,
    type_name: &'static str,
}

impl Capability {
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

#[derive(Clone, Debug)]
enum ParamKind {
    Model {
        ty: Result<ParamType, String>,
        description: Option<String>,
    },
    Injected(Capability),
}

/// 单个参数声明
#[derive(Clone, Debug)]
pub struct Param {
    name: String,
    kind: ParamKind,
}

impl Param {
    /// 模型可见参数；需再调用 describe，否则注册时报 MissingDescription
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Model {
                ty: Ok(ty),
                description: None,
            },
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    pub fn list(name: impl Into<String>, item: ParamType) -> Self {
        Self::new(name, ParamType::list(item))
    }

    /// 由 Rust 类型推导参数类型，如 `Param::typed::<Vec<String>>("keywords")`
    pub fn typed<T: JsonSchema>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Model {
                ty: ParamType::of::<T>(),
                description: None,
            },
        }
    }

    /// 注入参数：由会话能力容器提供，不出现在对外 schema
    pub fn injected<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Injected(Capability::of::<T>()),
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        if let ParamKind::Model { description, .. } = &mut self.kind {
            *description = Some(text.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_injected(&self) -> bool {
        matches!(self.kind, ParamKind::Injected(_))
    }
}

/// 模型侧看到的工具描述
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    /// parameters.properties 中的参数名
    pub fn param_names(&self) -> Vec<&str> {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// 注入参数：参数名 -> 所需能力
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectedParam {
    pub name: String,
    pub capability: Capability,
}

/// 注册期生成结果：对外描述 + 注入参数清单
#[derive(Clone, Debug)]
pub struct ToolSchema {
    pub descriptor: ToolDescriptor,
    pub injected: Vec<InjectedParam>,
}

/// 生成工具描述；所有模型可见参数均为 required（不支持可选参数）
pub fn build_schema(name: &str, description: &str, params: &[Param]) -> Result<ToolSchema, SchemaError> {
    if name.trim().is_empty() {
        return Err(SchemaError::EmptyName);
    }

    let mut seen = HashSet::new();
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut injected = Vec::new();

    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(SchemaError::DuplicateParam {
                tool: name.to_string(),
                param: param.name.clone(),
            });
        }
        match &param.kind {
            ParamKind::Injected(capability) => injected.push(InjectedParam {
                name: param.name.clone(),
                capability: *capability,
            }),
            ParamKind::Model { ty, description } => {
                let description = description
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| SchemaError::MissingDescription {
                        tool: name.to_string(),
                        param: param.name.clone(),
                    })?;
                let ty = ty.as_ref().map_err(|found| SchemaError::UnsupportedType {
                    tool: name.to_string(),
                    param: param.name.clone(),
                    found: found.clone(),
                })?;
                let mut schema = ty.to_schema();
                if let Value::Object(obj) = &mut schema {
                    obj.insert("description".to_string(), Value::String(description.to_string()));
                }
                properties.insert(param.name.clone(), schema);
                required.push(Value::String(param.name.clone()));
            }
        }
    }

    Ok(ToolSchema {
        descriptor: ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        },
        injected,
    })
}
