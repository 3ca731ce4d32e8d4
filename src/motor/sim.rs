// In-memory motor driver for tests and hardware-free runs
//
// SimMotor behaves like a position-seeking motor controller whose shaft moves a
// fixed number of ticks (scaled by power) every time it is polled with
// is_busy. Settling therefore happens in poll steps instead of wall-clock
// time, which keeps executor tests deterministic.

use std::convert::Infallible;

use super::driver::{DriverMode, MotorDriver};

/// Ticks travelled per busy poll at full power
pub const DEFAULT_TICKS_PER_POLL: i32 = 25;

#[derive(Debug, Clone)]
pub struct SimMotor {
    position: i32,
    target: i32,
    mode: DriverMode,
    power: f32,
    tolerance: u32,
    ticks_per_poll: i32,
    stalled: bool,
    mode_changes: u32,
    polls: u64,
}

impl Default for SimMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimMotor {
    pub fn new() -> Self {
        Self {
            position: 0,
            target: 0,
            mode: DriverMode::PowerOnly,
            power: 0.0,
            tolerance: 0,
            ticks_per_poll: DEFAULT_TICKS_PER_POLL,
            stalled: false,
            mode_changes: 0,
            polls: 0,
        }
    }

    /// Start with the encoder already at `ticks`
    pub fn at_position(ticks: i32) -> Self {
        Self {
            position: ticks,
            target: ticks,
            ..Self::new()
        }
    }

    /// Change how far the shaft travels per poll at full power
    pub fn with_ticks_per_poll(mut self, ticks: i32) -> Self {
        self.ticks_per_poll = ticks.max(1);
        self
    }

    /// A motor that never moves, for exercising settle limits
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::new()
        }
    }

    pub fn raw_position(&self) -> i32 {
        self.position
    }

    pub fn raw_target(&self) -> i32 {
        self.target
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Number of actual mode switches the driver received
    pub fn mode_changes(&self) -> u32 {
        self.mode_changes
    }

    /// Number of busy polls served
    pub fn polls(&self) -> u64 {
        self.polls
    }

    fn advance(&mut self) {
        if self.stalled || self.mode != DriverMode::PositionSeeking || self.power == 0.0 {
            return;
        }
        let step = ((self.ticks_per_poll as f32) * self.power.abs()).ceil().max(1.0) as i32;
        let remaining = self.target - self.position;
        self.position += remaining.signum() * remaining.abs().min(step);
    }

    fn settled(&self) -> bool {
        (self.target - self.position).unsigned_abs() <= self.tolerance
    }
}

impl MotorDriver for SimMotor {
    type Error = Infallible;

    fn power(&self) -> f32 {
        self.power
    }

    fn set_power(&mut self, power: f32) -> Result<(), Infallible> {
        self.power = power;
        Ok(())
    }

    fn position(&mut self) -> Result<i32, Infallible> {
        Ok(self.position)
    }

    fn set_target_position(&mut self, ticks: i32) -> Result<(), Infallible> {
        self.target = ticks;
        Ok(())
    }

    fn set_mode(&mut self, mode: DriverMode) -> Result<(), Infallible> {
        self.mode = mode;
        self.mode_changes += 1;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, Infallible> {
        self.polls += 1;
        self.advance();
        Ok(self.mode == DriverMode::PositionSeeking && !self.settled())
    }

    fn set_tolerance(&mut self, ticks: u32) -> Result<(), Infallible> {
        self.tolerance = ticks;
        Ok(())
    }
}
