//! 模拟家居工具：查看房屋状态、开关房间灯光
//!
//! 状态保存在会话能力 HouseState 中，两个工具通过注入参数共享同一实例。

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::ToolError;
use crate::tools::{Param, ParamType, Tool, ToolArgs, ToolOutput};

/// 模拟的房屋灯光状态：房间号 -> 是否亮灯
#[derive(Debug)]
pub struct HouseState {
    rooms: Mutex<BTreeMap<i64, bool>>,
}

impl Default for HouseState {
    fn default() -> Self {
        Self::new([(1, true), (2, true), (3, false)])
    }
}

impl HouseState {
    pub fn new(rooms: impl IntoIterator<Item = (i64, bool)>) -> Self {
        Self {
            rooms: Mutex::new(rooms.into_iter().collect()),
        }
    }

    pub fn set_light(&self, room: i64, on: bool) -> Result<(), ToolError> {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let light = rooms.get_mut(&room).ok_or(ToolError::UnknownRoom(room))?;
        *light = on;
        Ok(())
    }

    pub fn light(&self, room: i64) -> Option<bool> {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&room)
            .copied()
    }

    pub fn render(&self) -> String {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(room, on)| format!("Room {room} ({})", if *on { "on" } else { "off" }))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct HouseStateTool;

#[async_trait]
impl Tool for HouseStateTool {
    fn name(&self) -> &str {
        "get_house_state"
    }

    fn description(&self) -> &str {
        "Gets the current state of the house and its rooms"
    }

    fn params(&self) -> Vec<Param> {
        vec![Param::injected::<HouseState>("house")]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let house = args.injected::<HouseState>("house")?;
        Ok(ToolOutput::text(house.render()))
    }
}

pub struct RoomLightTool;

#[async_trait]
impl Tool for RoomLightTool {
    fn name(&self) -> &str {
        "control_room_light"
    }

    fn description(&self) -> &str {
        "Turns the lights on or off in a given room number"
    }

    fn params(&self) -> Vec<Param> {
        vec![
            Param::new("room_number", ParamType::Number).describe("The room number to target"),
            Param::boolean("state").describe("true to turn the light on, false to turn it off"),
            Param::injected::<HouseState>("house"),
        ]
    }

    async fn call(&self, args: ToolArgs) -> anyhow::Result<ToolOutput> {
        let room = room_number(args.number("room_number")?)?;
        let on = args.boolean("state")?;
        let house = args.injected::<HouseState>("house")?;
        house.set_light(room, on)?;
        tracing::info!(room, on, "room light switched");
        Ok(ToolOutput::from(true))
    }
}

/// 房间号须为 i64 范围内的整数，不做截断
fn room_number(n: f64) -> Result<i64, ToolError> {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Ok(n as i64)
    } else {
        Err(ToolError::InvalidRoomNumber(n))
    }
}

pub fn group() -> Vec<Box<dyn Tool>> {
    vec![Box::new(HouseStateTool), Box::new(RoomLightTool)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;

    use serde_json::json;

    fn args(v: serde_json::Value, house: &Arc<HouseState>) -> ToolArgs {
        let mut injected: HashMap<String, Arc<dyn Any + Send + Sync>> = HashMap::new();
        injected.insert("house".into(), house.clone());
        ToolArgs::new(v.as_object().cloned().unwrap_or_default(), injected)
    }

    #[tokio::test]
    async fn test_switch_light() {
        let house = Arc::new(HouseState::default());
        let out = RoomLightTool
            .call(args(json!({"room_number": 3, "state": true}), &house))
            .await
            .unwrap();
        assert_eq!(out.render().as_deref(), Some("true"));
        assert_eq!(house.light(3), Some(true));

        let state = HouseStateTool.call(args(json!({}), &house)).await.unwrap();
        assert!(state.render().unwrap().contains("Room 3 (on)"));
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let house = Arc::new(HouseState::default());
        let err = RoomLightTool
            .call(args(json!({"room_number": 9, "state": false}), &house))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown room number: 9"));
    }

    #[tokio::test]
    async fn test_fractional_room_rejected() {
        let house = Arc::new(HouseState::default());
        let err = RoomLightTool
            .call(args(json!({"room_number": 3.9, "state": true}), &house))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("whole number: 3.9"));
        assert_eq!(house.light(3), Some(false));

        assert!(room_number(1e300).is_err());
        assert!(room_number(f64::NAN).is_err());
        assert_eq!(room_number(2.0).unwrap(), 2);
    }

    #[test]
    fn test_house_is_hidden_from_schema() {
        let schema = crate::tools::build_schema("control_room_light", "x", &RoomLightTool.params()).unwrap();
        let mut names = schema.descriptor.param_names();
        names.sort();
        assert_eq!(names, vec!["room_number", "state"]);
    }
}
