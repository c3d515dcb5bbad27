//! 系统提示词构建

use chrono::{DateTime, Utc};

/// 助手人设
pub const ASSISTANT_PERSONA: &str = "You are Eris my AI assistant, you are here to help me with my general life tasks to free up \
my time to focus on my technical endeavours. Remind me of things I have coming up and tasks that I have not yet completed.

Your personality is precise and to the point, but also understanding and kind. You value progress and getting things done.

Use the available tools whenever they help. When the conversation is over, call end_chat.";

/// 种子 system 消息：人设 + 可选的用户名/位置 + 当前 UTC 时间
pub fn system_prompt(user_name: Option<&str>, location: Option<&str>, now: DateTime<Utc>) -> String {
    let mut prompt = String::from(ASSISTANT_PERSONA);
    prompt.push_str("\n\n");
    if let Some(name) = user_name.filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!("The user's name is {}.\n", name.trim()));
    }
    if let Some(loc) = location.filter(|l| !l.trim().is_empty()) {
        prompt.push_str(&format!("The user is located in {}.\n", loc.trim()));
    }
    prompt.push_str(&format!("The current UTC time is {}.", now.to_rfc3339()));
    prompt
}
