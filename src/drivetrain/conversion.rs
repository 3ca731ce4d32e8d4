// Distance to encoder-tick conversion
//
// ticks per inch = pulses per output revolution * gear ratio / wheel circumference

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{DriveError, Result};

/// Gearmotors with known encoder resolution at the output shaft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorModel {
    /// goBILDA 5202/5203 19.2:1 (312 rpm)
    GoBilda312,
    /// goBILDA 5202/5203 13.7:1 (435 rpm)
    GoBilda435,
    /// REV HD Hex with 20:1 gearbox
    RevHdHex20,
    /// REV Core Hex
    RevCoreHex,
    /// AndyMark NeveRest 40
    NeveRest40,
    /// Feetech STS3215 serial servo (12-bit magnetic encoder)
    FeetechSts3215,
}

impl MotorModel {
    /// Encoder pulses per revolution of the output shaft
    pub const fn pulses_per_revolution(self) -> f64 {
        match self {
            MotorModel::GoBilda312 => 537.7,
            MotorModel::GoBilda435 => 384.5,
            MotorModel::RevHdHex20 => 560.0,
            MotorModel::RevCoreHex => 288.0,
            MotorModel::NeveRest40 => 1120.0,
            MotorModel::FeetechSts3215 => 4096.0,
        }
    }
}

/// Immutable ticks-per-inch scalar for one drivetrain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConversion {
    ticks_per_inch: f64,
}

impl DistanceConversion {
    /// Build from mechanical constants.
    ///
    /// `gear_ratio` is motor-output revolutions per wheel revolution.
    pub fn from_mechanics(
        wheel_diameter_in: f64,
        gear_ratio: f64,
        pulses_per_revolution: f64,
    ) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(wheel_diameter_in) || !valid(gear_ratio) || !valid(pulses_per_revolution) {
            return Err(DriveError::Config(format!(
                "mechanical constants must be positive (diameter={}, gearing={}, ppr={})",
                wheel_diameter_in, gear_ratio, pulses_per_revolution
            )));
        }
        let circumference = wheel_diameter_in * PI;
        Ok(Self {
            ticks_per_inch: pulses_per_revolution * gear_ratio / circumference,
        })
    }

    pub fn for_model(model: MotorModel, wheel_diameter_in: f64, gear_ratio: f64) -> Result<Self> {
        Self::from_mechanics(wheel_diameter_in, gear_ratio, model.pulses_per_revolution())
    }

    /// Wrap an already-computed scalar
    pub fn from_ticks_per_inch(ticks_per_inch: f64) -> Result<Self> {
        if !(ticks_per_inch.is_finite() && ticks_per_inch > 0.0) {
            return Err(DriveError::Config(format!(
                "ticks per inch must be positive, got {}",
                ticks_per_inch
            )));
        }
        Ok(Self { ticks_per_inch })
    }

    pub fn ticks_per_inch(&self) -> f64 {
        self.ticks_per_inch
    }

    /// Encoder ticks for a signed distance, rounded half away from zero.
    ///
    /// Saturates at `±i32::MAX` and maps NaN to 0; motion planning goes
    /// through [`DistanceConversion::checked_ticks`] instead.
    pub fn ticks(&self, inches: f64) -> i32 {
        (inches * self.ticks_per_inch).round().clamp(-MAX_TICKS, MAX_TICKS) as i32
    }

    /// Like [`DistanceConversion::ticks`], but fails for non-finite distances
    /// and for distances whose tick count does not fit in `±i32::MAX`
    pub fn checked_ticks(&self, inches: f64) -> Result<i32> {
        let ticks = (inches * self.ticks_per_inch).round();
        if !ticks.is_finite() || ticks.abs() > MAX_TICKS {
            return Err(DriveError::InvalidDistance(inches));
        }
        Ok(ticks as i32)
    }
}

// Symmetric bound so every tick count can be negated
const MAX_TICKS: f64 = i32::MAX as f64;

#[cfg(test)]
mod tests {
    use super::*;

    fn gobilda_mecanum() -> DistanceConversion {
        // 96 mm wheels, direct drive
        DistanceConversion::for_model(MotorModel::GoBilda312, 3.78, 1.0).unwrap()
    }

    #[test]
    fn test_ticks_per_inch_from_mechanics() {
        let conv = DistanceConversion::from_mechanics(4.0, 1.0, 560.0).unwrap();
        let expected = 560.0 / (4.0 * PI);
        assert!((conv.ticks_per_inch() - expected).abs() < 1e-9);
        assert_eq!(conv.ticks(4.0 * PI), 560);
    }

    #[test]
    fn test_ticks_is_sign_preserving() {
        let conv = gobilda_mecanum();
        for d in [0.0, 0.3, 1.0, 12.0, 17.25, 48.0, 100.5] {
            assert_eq!(conv.ticks(-d), -conv.ticks(d), "distance {}", d);
        }
    }

    #[test]
    fn test_ticks_is_linear_within_rounding() {
        let conv = gobilda_mecanum();
        for (d1, d2) in [(1.0, 2.0), (12.0, 6.5), (0.4, 0.4), (30.0, -10.0)] {
            let sum = conv.ticks(d1 + d2);
            let parts = conv.ticks(d1) + conv.ticks(d2);
            assert!((sum - parts).abs() <= 1, "{} + {}: {} vs {}", d1, d2, sum, parts);
        }
    }

    #[test]
    fn test_checked_ticks_rejects_unrepresentable_distances() {
        let conv = gobilda_mecanum();
        assert_eq!(conv.checked_ticks(12.0).unwrap(), conv.ticks(12.0));
        for d in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e9, -1e9] {
            assert!(
                matches!(conv.checked_ticks(d), Err(DriveError::InvalidDistance(_))),
                "distance {}",
                d
            );
        }
        assert_eq!(conv.ticks(-1e9), -i32::MAX);
    }

    #[test]
    fn test_rejects_non_positive_constants() {
        assert!(DistanceConversion::from_mechanics(0.0, 1.0, 560.0).is_err());
        assert!(DistanceConversion::from_mechanics(4.0, -1.0, 560.0).is_err());
        assert!(DistanceConversion::from_ticks_per_inch(f64::NAN).is_err());
    }
}
