//! 时间工具：按 IANA 时区返回当前时间（ISO-8601）

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;

use crate::core::ToolError;
use crate::tools::{Param, Tool, ToolArgs, ToolOutput};

pub struct CurrentTimeTool;

/// 指定时区的当前时间
pub fn current_time_in(tz_name: &str) -> Result<String, ToolError> {
    let tz: Tz = tz_name
        .trim()
        .parse()
        .map_err(|_| ToolError::UnknownTimezone(tz_name.to_string()))?;
    Ok(Utc::now().with_timezone(&tz).to_rfc3339())
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time in ISO-8601 format for a given timezone"
    }

    fn params(&self) -> Vec<Param> {
        vec![Param::text("tz_name")
            .describe("Olson tz name of the timezone to get the current time of, e.g. Europe/London")]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let tz_name = args.text("tz_name")?;
        Ok(ToolOutput::text(current_time_in(&tz_name)?))
    }
}

pub fn group() -> Vec<Box<dyn Tool>> {
    vec![Box::new(CurrentTimeTool)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_zone_has_offset() {
        let t = current_time_in("Asia/Tokyo").unwrap();
        assert!(t.ends_with("+09:00"), "{t}");
    }

    #[test]
    fn test_unknown_zone_rejected() {
        assert!(matches!(
            current_time_in("Mars/Olympus"),
            Err(ToolError::UnknownTimezone(_))
        ));
    }
}
