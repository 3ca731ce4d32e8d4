// Error taxonomy for the drivetrain engine

use crate::drivetrain::group::GroupSelector;
use crate::drivetrain::kinematics::{KinematicsKind, MoveDirection};

/// Boxed error returned by a motor driver implementation
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by drivetrain operations
///
/// `InvalidSelector`, `InvalidDirection` and `UnsupportedInput` are raised
/// before any actuator is written, so the drivetrain is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Selector {selector} is not available on a {kinematics} drivetrain")]
    InvalidSelector {
        selector: GroupSelector,
        kinematics: KinematicsKind,
    },

    #[error("Direction {direction} is not supported by a {kinematics} drivetrain")]
    InvalidDirection {
        direction: MoveDirection,
        kinematics: KinematicsKind,
    },

    #[error("{input} input is not accepted by a {kinematics} drivetrain")]
    UnsupportedInput {
        input: &'static str,
        kinematics: KinematicsKind,
    },

    #[error("Speed divisor must be a positive finite number, got {0}")]
    InvalidSpeedDivisor(f32),

    #[error("Distance {0} in does not map to a representable tick count")]
    InvalidDistance(f64),

    #[error("Target {ticks} on actuator {actuator} overflows the encoder range")]
    TargetOutOfRange { actuator: String, ticks: i32 },

    #[error("Motion did not settle after {polls} polls")]
    SettleTimeout { polls: u64 },

    #[error("Driver error on actuator {actuator}: {source}")]
    Driver {
        actuator: String,
        #[source]
        source: DriverError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriveError {
    /// Wrap a driver failure with the name of the actuator it came from
    pub fn driver<E>(actuator: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Driver {
            actuator: actuator.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_message() {
        let err = DriveError::InvalidSelector {
            selector: GroupSelector::Auxiliary,
            kinematics: KinematicsKind::Holonomic,
        };
        let msg = err.to_string();
        assert!(msg.contains("auxiliary"), "unexpected message: {}", msg);
        assert!(msg.contains("holonomic"), "unexpected message: {}", msg);
    }

    #[test]
    fn test_driver_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply");
        let err = DriveError::driver("frontLeft", io);
        assert!(err.to_string().contains("frontLeft"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
