// Wheel driver for a Feetech STS servo on a shared bus
//
// Power-only maps to the servo's velocity mode (power scales the goal speed).
// Position-seeking maps to position mode with the goal speed as a cap.
// Position mode on the STS3215 is single-turn: the encoder reads 0..=4095 and
// goals outside that range are rejected, so one positioned move can cover at
// most one wheel revolution from wherever the shaft currently sits.

use std::io::{Read, Write};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};

use serialport::SerialPort;
use tracing::debug;

use super::driver::{DriverMode, MotorDriver};
use super::feetech::{FeetechBus, FeetechError, OperatingMode, Register};

/// Goal speed sent at full power
pub const DEFAULT_MAX_RAW_SPEED: i16 = 3000;

/// Encoder range of a single-turn position move
pub const POSITION_RANGE: RangeInclusive<i32> = 0..=4095;

/// Bus handle shared by every wheel on the same serial line
pub type SharedBus<P = Box<dyn SerialPort>> = Arc<Mutex<FeetechBus<P>>>;

pub fn shared<P: Read + Write>(bus: FeetechBus<P>) -> SharedBus<P> {
    Arc::new(Mutex::new(bus))
}

pub struct FeetechWheel<P = Box<dyn SerialPort>> {
    bus: SharedBus<P>,
    id: u8,
    mode: DriverMode,
    power: f32,
    goal: i32,
    tolerance: u32,
    max_raw_speed: i16,
}

impl<P: Read + Write> FeetechWheel<P> {
    pub fn new(bus: SharedBus<P>, id: u8) -> Self {
        Self {
            bus,
            id,
            mode: DriverMode::PowerOnly,
            power: 0.0,
            goal: 0,
            tolerance: 0,
            max_raw_speed: DEFAULT_MAX_RAW_SPEED,
        }
    }

    pub fn with_max_raw_speed(mut self, max_raw_speed: i16) -> Self {
        self.max_raw_speed = max_raw_speed.max(1);
        self
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    fn bus(&self) -> Result<MutexGuard<'_, FeetechBus<P>>, FeetechError> {
        self.bus.lock().map_err(|_| FeetechError::Poisoned)
    }

    fn raw_speed(&self, power: f32) -> i16 {
        let raw = (power * self.max_raw_speed as f32).round();
        raw.clamp(-(self.max_raw_speed as f32), self.max_raw_speed as f32) as i16
    }
}

impl<P: Read + Write> MotorDriver for FeetechWheel<P> {
    type Error = FeetechError;

    fn power(&self) -> f32 {
        self.power
    }

    fn set_power(&mut self, power: f32) -> Result<(), FeetechError> {
        let speed = match self.mode {
            DriverMode::PowerOnly => self.raw_speed(power),
            // The goal speed only caps travel in position mode
            DriverMode::PositionSeeking => self.raw_speed(power.abs()),
        };
        self.bus()?.write_i16(self.id, Register::GoalSpeed, speed)?;
        self.power = power;
        Ok(())
    }

    fn position(&mut self) -> Result<i32, FeetechError> {
        let raw = self.bus()?.read_i16(self.id, Register::PresentPosition)?;
        Ok(raw as i32)
    }

    fn set_target_position(&mut self, ticks: i32) -> Result<(), FeetechError> {
        if !POSITION_RANGE.contains(&ticks) {
            return Err(FeetechError::GoalOutOfRange {
                id: self.id,
                goal: ticks,
            });
        }
        debug!("Motor {}: goal position {}", self.id, ticks);
        self.bus()?
            .write_u16(self.id, Register::GoalPosition, ticks as u16)?;
        self.goal = ticks;
        Ok(())
    }

    fn set_mode(&mut self, mode: DriverMode) -> Result<(), FeetechError> {
        let servo_mode = match mode {
            DriverMode::PowerOnly => OperatingMode::Velocity,
            DriverMode::PositionSeeking => OperatingMode::Position,
        };
        self.bus()?.switch_mode(self.id, servo_mode)?;
        self.mode = mode;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, FeetechError> {
        if self.mode != DriverMode::PositionSeeking {
            return Ok(false);
        }
        let present = self.position()?;
        Ok((self.goal - present).unsigned_abs() > self.tolerance)
    }

    fn set_tolerance(&mut self, ticks: u32) -> Result<(), FeetechError> {
        self.tolerance = ticks;
        Ok(())
    }
}
