// Motor layer for the drivetrain
//
// Provides:
// - The driver contract every wheel motor implements
// - `Actuator`, the baseline-aware wheel wrapper used by the drivetrain
// - Feetech STS serial protocol and a wheel driver on top of it
// - An in-memory simulated motor for tests and hardware-free runs

pub mod actuator;
pub mod driver;
pub mod feetech;
pub mod feetech_wheel;
pub mod sim;

pub use actuator::{Actuator, ActuatorState, Polarity};
pub use driver::{DriverMode, MotorDriver};
pub use feetech::{FeetechBus, FeetechError};
pub use feetech_wheel::{FeetechWheel, SharedBus};
pub use sim::SimMotor;
