// Drivetrain control engine for 4- and 5-motor wheeled bases.
//
// Provides:
// - Actuator abstraction over a pluggable motor driver (Feetech bus or simulator)
// - Symbolic wheel-group resolution per drivetrain kind
// - Differential, holonomic and holonomic-with-auxiliary kinematics
// - A blocking point-to-point motion executor
// - A Zenoh runtime that feeds teleop and move commands into the drivetrain

pub mod config;
pub mod drivetrain;
pub mod error;
pub mod messages;
pub mod motor;
pub mod runtime;

pub use drivetrain::Drivetrain;
pub use error::DriveError;
