// Driver contract consumed by every actuator
//
// A driver is the thinnest layer above a physical motor: it knows how to
// write power, targets and control mode, and how to read the raw encoder.
// Baselines, direction signs and grouping live above it in `Actuator`.

use serde::{Deserialize, Serialize};

/// Control mode of a motor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverMode {
    /// Open-loop: power is applied directly
    #[default]
    PowerOnly,
    /// Closed-loop: the driver seeks its target position, power caps speed
    PositionSeeking,
}

/// Hardware-facing motor driver
pub trait MotorDriver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Last power written to the driver
    fn power(&self) -> f32;

    /// Apply power in [-1, 1]; in position-seeking mode this is the speed cap
    fn set_power(&mut self, power: f32) -> Result<(), Self::Error>;

    /// Absolute encoder reading in ticks
    fn position(&mut self) -> Result<i32, Self::Error>;

    /// Absolute target for position-seeking mode, in ticks
    fn set_target_position(&mut self, ticks: i32) -> Result<(), Self::Error>;

    fn set_mode(&mut self, mode: DriverMode) -> Result<(), Self::Error>;

    /// True until the motor has settled within tolerance of its target
    fn is_busy(&mut self) -> Result<bool, Self::Error>;

    /// Width of the settle band used by [`MotorDriver::is_busy`]
    fn set_tolerance(&mut self, ticks: u32) -> Result<(), Self::Error>;
}
