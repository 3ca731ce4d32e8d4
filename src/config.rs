// Timeouts, topics and drivetrain configuration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drivetrain::{DistanceConversion, KinematicsKind, MotorModel, SettlePolicy};
use crate::error::{DriveError, Result};
use crate::motor::Polarity;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Teleop commands older than this stop the base
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_TELEOP: &str = "omnidrive/cmd/teleop"; // stick input
pub const TOPIC_CMD_MOVE: &str = "omnidrive/cmd/move"; // autonomous moves
pub const TOPIC_MOTION: &str = "omnidrive/state/motion"; // executor phases
pub const TOPIC_HEALTH: &str = "omnidrive/state/health";

// Serial port for the Feetech servo bus
pub const MOTOR_PORT: &str = "/dev/ttyUSB0";

/// One motor's wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelBinding {
    pub name: String,
    /// Servo id on the bus
    pub id: u8,
    #[serde(default)]
    pub reversed: bool,
}

impl WheelBinding {
    pub fn new(name: &str, id: u8, reversed: bool) -> Self {
        Self {
            name: name.to_string(),
            id,
            reversed,
        }
    }

    pub fn polarity(&self) -> Polarity {
        if self.reversed {
            Polarity::Reverse
        } else {
            Polarity::Forward
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelBindings {
    pub back_left: WheelBinding,
    pub back_right: WheelBinding,
    pub front_left: WheelBinding,
    pub front_right: WheelBinding,
    #[serde(default)]
    pub auxiliary: Option<WheelBinding>,
}

impl Default for WheelBindings {
    fn default() -> Self {
        // Right-side motors face the other way on a typical chassis
        Self {
            back_left: WheelBinding::new("backLeft", 1, false),
            back_right: WheelBinding::new("backRight", 2, true),
            front_left: WheelBinding::new("frontLeft", 3, false),
            front_right: WheelBinding::new("frontRight", 4, true),
            auxiliary: None,
        }
    }
}

/// Runtime configuration, loaded from JSON; every field is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub kinematics: KinematicsKind,
    pub wheel_diameter_in: f64,
    /// Motor-output revolutions per wheel revolution
    pub gear_ratio: f64,
    pub motor_model: MotorModel,
    /// Overrides the motor model's encoder resolution
    pub pulses_per_revolution: Option<f64>,
    pub tolerance_ticks: u32,
    pub settle: SettlePolicy,
    pub port: String,
    pub simulate: bool,
    /// Feetech goal speed at full power
    pub max_raw_speed: i16,
    pub wheels: WheelBindings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            kinematics: KinematicsKind::Holonomic,
            wheel_diameter_in: 3.78,
            gear_ratio: 1.0,
            motor_model: MotorModel::FeetechSts3215,
            pulses_per_revolution: None,
            tolerance_ticks: 10,
            settle: SettlePolicy::Unbounded,
            port: MOTOR_PORT.to_string(),
            simulate: false,
            max_raw_speed: 3000,
            wheels: WheelBindings::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DriveError::Config(format!("reading {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| DriveError::Config(format!("parsing {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match (self.kinematics.has_auxiliary(), &self.wheels.auxiliary) {
            (true, None) => Err(DriveError::Config(format!(
                "{} drivetrain needs an auxiliary wheel binding",
                self.kinematics
            ))),
            (false, Some(aux)) => Err(DriveError::Config(format!(
                "auxiliary wheel {} given for a {} drivetrain",
                aux.name, self.kinematics
            ))),
            _ => self.conversion().map(|_| ()),
        }
    }

    /// Ticks-per-inch for the configured wheels, fixed for the process
    pub fn conversion(&self) -> Result<DistanceConversion> {
        let ppr = self
            .pulses_per_revolution
            .unwrap_or_else(|| self.motor_model.pulses_per_revolution());
        DistanceConversion::from_mechanics(self.wheel_diameter_in, self.gear_ratio, ppr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "kinematics": "holonomic_with_auxiliary",
            "motor_model": "go_bilda312",
            "settle": { "max_polls": 5000 },
            "wheels": {
                "back_left": { "name": "backLeft", "id": 1 },
                "back_right": { "name": "backRight", "id": 2, "reversed": true },
                "front_left": { "name": "frontLeft", "id": 3 },
                "front_right": { "name": "frontRight", "id": 4, "reversed": true },
                "auxiliary": { "name": "strafe", "id": 5 }
            }
        }"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.kinematics, KinematicsKind::HolonomicWithAuxiliary);
        assert_eq!(config.settle, SettlePolicy::MaxPolls(5000));
        assert_eq!(config.wheels.back_right.polarity(), Polarity::Reverse);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_auxiliary_binding_must_match_kinematics() {
        let mut config = RuntimeConfig {
            kinematics: KinematicsKind::HolonomicWithAuxiliary,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());

        config.kinematics = KinematicsKind::Differential;
        config.wheels.auxiliary = Some(WheelBinding::new("strafe", 5, false));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_conversion_uses_override() {
        let config = RuntimeConfig {
            wheel_diameter_in: 4.0,
            pulses_per_revolution: Some(560.0),
            ..RuntimeConfig::default()
        };
        let conv = config.conversion().unwrap();
        assert!((conv.ticks_per_inch() - 560.0 / (4.0 * std::f64::consts::PI)).abs() < 1e-9);
    }
}
