// Message types exchanged with the runtime

use serde::{Deserialize, Serialize};

use crate::drivetrain::MoveDirection;

// Stick input from teleop -> runtime, applied every tick until it goes stale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TeleopCommand {
    /// Drive `y`, rotate `rx`, strafe `x`
    Holonomic {
        y: f32,
        rx: f32,
        x: f32,
        #[serde(default)]
        speed_divisor: Option<f32>,
    },
    Tank {
        left: f32,
        right: f32,
    },
}

impl TeleopCommand {
    pub fn holonomic(y: f32, rx: f32, x: f32) -> Self {
        TeleopCommand::Holonomic {
            y,
            rx,
            x,
            speed_divisor: None,
        }
    }
}

fn default_speed() -> f32 {
    0.5
}

// Autonomous point-to-point move, executed to completion before the next tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub direction: MoveDirection,
    pub inches: f64,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    /// Last command was rejected or a driver call failed
    Fault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teleop_json_shapes() {
        let cmd: TeleopCommand =
            serde_json::from_str(r#"{"kind":"holonomic","y":0.5,"rx":0.0,"x":-0.25}"#).unwrap();
        assert_eq!(cmd, TeleopCommand::holonomic(0.5, 0.0, -0.25));

        let cmd: TeleopCommand =
            serde_json::from_str(r#"{"kind":"tank","left":1.0,"right":-1.0}"#).unwrap();
        assert_eq!(
            cmd,
            TeleopCommand::Tank {
                left: 1.0,
                right: -1.0
            }
        );
    }

    #[test]
    fn test_move_command_default_speed() {
        let cmd: MoveCommand =
            serde_json::from_str(r#"{"direction":"forward_left","inches":24}"#).unwrap();
        assert_eq!(cmd.direction, MoveDirection::ForwardLeft);
        assert!((cmd.speed - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_health_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RuntimeHealth::CmdStale).unwrap(),
            "\"cmd_stale\""
        );
    }
}
