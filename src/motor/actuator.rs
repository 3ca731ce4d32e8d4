// A single motorized wheel
//
// Wraps a driver with a direction sign, a software encoder baseline and the
// last commanded power/target, so drivetrain code can speak in wheel-relative
// ticks regardless of how the motor is mounted.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::driver::{DriverMode, MotorDriver};
use crate::error::{DriveError, Result};

/// Mounting direction of a motor relative to the wheel's forward rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    Forward,
    Reverse,
}

impl Polarity {
    pub fn sign(self) -> i32 {
        match self {
            Polarity::Forward => 1,
            Polarity::Reverse => -1,
        }
    }
}

/// Commanded state of an actuator, used for before/after comparisons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    pub mode: DriverMode,
    pub power: f32,
    pub target: i32,
}

/// A motorized wheel with baseline-relative position tracking
pub struct Actuator<D> {
    name: String,
    driver: D,
    polarity: Polarity,
    mode: DriverMode,
    power: f32,
    target: i32,
    tolerance: u32,
    baseline: i32,
}

impl<D: MotorDriver> Actuator<D> {
    pub fn new(name: impl Into<String>, driver: D) -> Self {
        Self::with_polarity(name, driver, Polarity::Forward)
    }

    pub fn with_polarity(name: impl Into<String>, driver: D, polarity: Polarity) -> Self {
        Self {
            name: name.into(),
            driver,
            polarity,
            mode: DriverMode::PowerOnly,
            power: 0.0,
            target: 0,
            tolerance: 0,
            baseline: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    /// Target in ticks relative to the last baseline
    pub fn target_position(&self) -> i32 {
        self.target
    }

    /// Last settle band written; 0 until one is set
    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn state(&self) -> ActuatorState {
        ActuatorState {
            mode: self.mode,
            power: self.power,
            target: self.target,
        }
    }

    /// Store and apply power. Clamping is the caller's job.
    pub fn set_power(&mut self, power: f32) -> Result<()> {
        debug!("{}: power {:.3}", self.name, power);
        let signed = power * self.polarity.sign() as f32;
        self.driver
            .set_power(signed)
            .map_err(|e| DriveError::driver(&self.name, e))?;
        self.power = power;
        Ok(())
    }

    /// Set a target relative to the current baseline.
    ///
    /// Only moves the wheel once the actuator is in position-seeking mode.
    pub fn set_target_position(&mut self, ticks: i32) -> Result<()> {
        let raw = ticks
            .checked_mul(self.polarity.sign())
            .and_then(|t| t.checked_add(self.baseline))
            .ok_or_else(|| DriveError::TargetOutOfRange {
                actuator: self.name.clone(),
                ticks,
            })?;
        debug!("{}: target {} (raw {})", self.name, ticks, raw);
        self.driver
            .set_target_position(raw)
            .map_err(|e| DriveError::driver(&self.name, e))?;
        self.target = ticks;
        Ok(())
    }

    /// Position in ticks relative to the last baseline
    pub fn current_position(&mut self) -> Result<i32> {
        let raw = self
            .driver
            .position()
            .map_err(|e| DriveError::driver(&self.name, e))?;
        Ok(raw
            .saturating_sub(self.baseline)
            .saturating_mul(self.polarity.sign()))
    }

    /// Capture the current raw encoder reading as the new zero reference
    pub fn reset_baseline(&mut self) -> Result<()> {
        self.baseline = self
            .driver
            .position()
            .map_err(|e| DriveError::driver(&self.name, e))?;
        self.target = 0;
        debug!("{}: baseline reset to raw {}", self.name, self.baseline);
        Ok(())
    }

    /// Switch control mode; repeated calls with the same mode do nothing
    pub fn set_mode(&mut self, mode: DriverMode) -> Result<()> {
        if self.mode == mode {
            return Ok(());
        }
        debug!("{}: mode {:?} -> {:?}", self.name, self.mode, mode);
        self.driver
            .set_mode(mode)
            .map_err(|e| DriveError::driver(&self.name, e))?;
        self.mode = mode;
        Ok(())
    }

    pub fn is_busy(&mut self) -> Result<bool> {
        self.driver
            .is_busy()
            .map_err(|e| DriveError::driver(&self.name, e))
    }

    pub fn set_tolerance(&mut self, ticks: u32) -> Result<()> {
        self.driver
            .set_tolerance(ticks)
            .map_err(|e| DriveError::driver(&self.name, e))?;
        self.tolerance = ticks;
        Ok(())
    }

    /// Total order by name, used for legacy corner-role assignment
    pub fn compare_by_name(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
