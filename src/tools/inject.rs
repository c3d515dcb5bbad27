//! 依赖注入：能力容器
//!
//! 扁平的「能力类型 -> 会话级实例」映射，仅作用于单个 Session。
//! resolve 只查表：缺失的能力静默跳过，由工具取参时报缺参错误。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::tools::schema::{Capability, InjectedParam};

type Instance = Arc<dyn Any + Send + Sync>;

/// 能力容器
#[derive(Clone, Default)]
pub struct Capabilities {
    instances: HashMap<TypeId, Instance>,
    names: HashMap<TypeId, &'static str>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定能力实例；同一类型再次绑定时覆盖
    pub fn insert<T: Any + Send + Sync>(&mut self, instance: Arc<T>) {
        let cap = Capability::of::<T>();
        self.instances.insert(cap.id(), instance);
        self.names.insert(cap.id(), cap.type_name());
    }

    pub fn with<T: Any + Send + Sync>(mut self, instance: Arc<T>) -> Self {
        self.insert(instance);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instances
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|i| i.downcast::<T>().ok())
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.instances.contains_key(&capability.id())
    }

    /// 已绑定能力的类型名（日志用）
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.names.values().copied().collect();
        names.sort_unstable();
        names
    }

    /// 为一个工具的注入参数解析实例：参数名 -> 实例
    pub fn resolve(&self, injected: &[InjectedParam]) -> HashMap<String, Instance> {
        injected
            .iter()
            .filter_map(|p| {
                self.instances
                    .get(&p.capability.id())
                    .map(|i| (p.name.clone(), Arc::clone(i)))
            })
            .collect()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("types", &self.type_names())
            .finish()
    }
}
