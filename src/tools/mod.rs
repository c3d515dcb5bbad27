pub mod args;
pub mod control;
pub mod executor;
pub mod filesystem;
pub mod home;
pub mod inject;
pub mod memory;
pub mod registry;
pub mod schema;
pub mod time;

pub use args::{ToolArgs, ToolOutput};
pub use executor::{Dispatch, ToolExecutor};
pub use filesystem::{ReadFileTool, SafeFs, WriteFileTool};
pub use home::HouseState;
pub use inject::Capabilities;
pub use memory::{MemoryRecord, MemoryStore};
pub use registry::{FnTool, RegistryEntry, Tool, ToolRegistry};
pub use schema::{
    build_schema, Capability, InjectedParam, Param, ParamType, ToolDescriptor, ToolSchema,
};
