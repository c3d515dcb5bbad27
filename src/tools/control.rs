//! 会话控制工具：end_chat 结束当前会话

use async_trait::async_trait;

use crate::tools::{Tool, ToolArgs, ToolOutput};

/// end_chat：返回终止信号，循环据此结束会话
pub struct EndChatTool;

#[async_trait]
impl Tool for EndChatTool {
    fn name(&self) -> &str {
        "end_chat"
    }

    fn description(&self) -> &str {
        "Ends the current chat thread"
    }

    async fn call(&self, _args: ToolArgs) -> anyhow::Result<ToolOutput> {
        Ok(ToolOutput::EndSession)
    }
}

pub fn group() -> Vec<Box<dyn Tool>> {
    vec![Box::new(EndChatTool)]
}
