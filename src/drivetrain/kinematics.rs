// Wheel mixing and direction tables for the three drivetrain kinds
//
// Teleop mixing turns stick input into per-wheel power. Motion planning turns
// an autonomous (direction, distance) request into per-wheel tick targets.

use std::f64::consts::SQRT_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::conversion::DistanceConversion;
use super::roles::CornerSet;
use crate::error::{DriveError, Result};

/// Strafe gain compensating for roller friction on mecanum wheels
pub const STRAFE_COMPENSATION: f32 = 1.1;

/// Gain on the perpendicular auxiliary axis
pub const AUXILIARY_LEVERAGE: f32 = 1.5;

/// Drivetrain kinematics variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicsKind {
    /// Two independently driven sides
    Differential,
    /// Four mixed wheels (mecanum / X-drive)
    #[default]
    Holonomic,
    /// Four wheels plus a perpendicular lateral wheel
    HolonomicWithAuxiliary,
}

impl KinematicsKind {
    pub const ALL: [KinematicsKind; 3] = [
        KinematicsKind::Differential,
        KinematicsKind::Holonomic,
        KinematicsKind::HolonomicWithAuxiliary,
    ];

    pub fn has_auxiliary(self) -> bool {
        self == KinematicsKind::HolonomicWithAuxiliary
    }

    pub fn supports(self, direction: MoveDirection) -> bool {
        match self {
            KinematicsKind::Differential => {
                matches!(direction, MoveDirection::Forward | MoveDirection::Backward)
            }
            KinematicsKind::Holonomic | KinematicsKind::HolonomicWithAuxiliary => true,
        }
    }

    /// Per-wheel tick targets for an autonomous move.
    ///
    /// Fails with [`DriveError::InvalidDirection`] when the direction is not
    /// available on this kind, and with [`DriveError::InvalidDistance`] when
    /// the distance is not finite or its tick count overflows.
    /// Nothing is computed in either case.
    pub fn plan(
        self,
        direction: MoveDirection,
        inches: f64,
        conversion: &DistanceConversion,
    ) -> Result<MotionPlan> {
        if !self.supports(direction) {
            return Err(DriveError::InvalidDirection {
                direction,
                kinematics: self,
            });
        }

        // Both magnitudes fit in ±i32::MAX, so sign flips below cannot overflow
        let full = conversion.checked_ticks(inches)?;
        let split = conversion.checked_ticks(inches / SQRT_2)?;

        let plan = match self {
            KinematicsKind::Differential => MotionPlan {
                corners: CornerSet::splat(direction.components().0 * full),
                auxiliary: None,
            },
            KinematicsKind::Holonomic => holonomic_plan(direction, full, split),
            KinematicsKind::HolonomicWithAuxiliary => auxiliary_plan(direction, full, split),
        };
        Ok(plan)
    }
}

impl fmt::Display for KinematicsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KinematicsKind::Differential => "differential",
            KinematicsKind::Holonomic => "holonomic",
            KinematicsKind::HolonomicWithAuxiliary => "holonomic-with-auxiliary",
        };
        f.write_str(name)
    }
}

/// Direction of an autonomous move, relative to the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 8] = [
        MoveDirection::Forward,
        MoveDirection::Backward,
        MoveDirection::Left,
        MoveDirection::Right,
        MoveDirection::ForwardLeft,
        MoveDirection::ForwardRight,
        MoveDirection::BackwardLeft,
        MoveDirection::BackwardRight,
    ];

    pub fn is_diagonal(self) -> bool {
        let (cardinal, lateral) = self.components();
        cardinal != 0 && lateral != 0
    }

    /// (forward, right) unit signs
    fn components(self) -> (i32, i32) {
        match self {
            MoveDirection::Forward => (1, 0),
            MoveDirection::Backward => (-1, 0),
            MoveDirection::Left => (0, -1),
            MoveDirection::Right => (0, 1),
            MoveDirection::ForwardLeft => (1, -1),
            MoveDirection::ForwardRight => (1, 1),
            MoveDirection::BackwardLeft => (-1, -1),
            MoveDirection::BackwardRight => (-1, 1),
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveDirection::Forward => "forward",
            MoveDirection::Backward => "backward",
            MoveDirection::Left => "left",
            MoveDirection::Right => "right",
            MoveDirection::ForwardLeft => "forward_left",
            MoveDirection::ForwardRight => "forward_right",
            MoveDirection::BackwardLeft => "backward_left",
            MoveDirection::BackwardRight => "backward_right",
        };
        f.write_str(name)
    }
}

/// Per-wheel tick targets for one autonomous move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPlan {
    pub corners: CornerSet<i32>,
    /// Present only on drivetrains with an auxiliary axis
    pub auxiliary: Option<i32>,
}

/// Sign each corner takes when crabbing right
const CRAB_RIGHT: CornerSet<i32> = CornerSet {
    back_left: -1,
    back_right: 1,
    front_left: 1,
    front_right: -1,
};

fn holonomic_plan(direction: MoveDirection, full: i32, split: i32) -> MotionPlan {
    let (cardinal, lateral) = direction.components();
    let corners = if direction.is_diagonal() {
        // Wheels whose cardinal and crab contributions agree carry the move,
        // the others cancel to zero.
        CRAB_RIGHT.map(|crab| (cardinal + lateral * crab).signum() * split)
    } else if lateral != 0 {
        CRAB_RIGHT.map(|crab| lateral * crab * full)
    } else {
        CornerSet::splat(cardinal * full)
    };
    MotionPlan {
        corners,
        auxiliary: None,
    }
}

fn auxiliary_plan(direction: MoveDirection, full: i32, split: i32) -> MotionPlan {
    // (corner ticks, auxiliary ticks)
    let (corner, auxiliary) = match direction {
        MoveDirection::Forward => (full, 0),
        MoveDirection::Backward => (-full, 0),
        MoveDirection::Left => (0, full),
        MoveDirection::Right => (0, -full),
        MoveDirection::ForwardRight => (split, split),
        MoveDirection::BackwardLeft => (-split, -split),
        MoveDirection::ForwardLeft => (-split, split),
        MoveDirection::BackwardRight => (split, -split),
    };
    MotionPlan {
        corners: CornerSet::splat(corner),
        auxiliary: Some(auxiliary),
    }
}

/// Unnormalized holonomic wheel power for drive `y`, rotate `rx`, strafe `x`
pub fn holonomic_mix_raw(y: f32, rx: f32, x: f32) -> CornerSet<f32> {
    let strafe = x * STRAFE_COMPENSATION;
    CornerSet {
        front_left: y + strafe + rx,
        back_left: y - strafe + rx,
        front_right: y - strafe - rx,
        back_right: y + strafe - rx,
    }
}

/// Holonomic wheel power scaled so no wheel exceeds full power.
///
/// The common divisor is `max(|y| + |1.1 x| + |rx|, 1)`: small inputs pass
/// through untouched, large inputs shrink together and keep their ratios.
pub fn holonomic_mix(y: f32, rx: f32, x: f32) -> CornerSet<f32> {
    let denominator = (y.abs() + (x * STRAFE_COMPENSATION).abs() + rx.abs()).max(1.0);
    holonomic_mix_raw(y, rx, x).map(|p| p / denominator)
}

/// Corner and auxiliary power for a holonomic base with a lateral wheel.
///
/// Strafe goes entirely to the auxiliary axis, so the corners only see drive
/// and rotation.
pub fn auxiliary_mix(y: f32, rx: f32, x: f32) -> (CornerSet<f32>, f32) {
    let corners = CornerSet {
        front_left: y + rx,
        back_left: y + rx,
        front_right: y - rx,
        back_right: y - rx,
    };
    (corners, x * AUXILIARY_LEVERAGE)
}

/// Tank input: each side gets its stick directly
pub fn differential_mix(left: f32, right: f32) -> CornerSet<f32> {
    CornerSet {
        back_left: left,
        front_left: left,
        back_right: right,
        front_right: right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn conv() -> DistanceConversion {
        DistanceConversion::from_ticks_per_inch(45.28).unwrap()
    }

    fn as_array(set: &CornerSet<f32>) -> [f32; 4] {
        [set.back_left, set.back_right, set.front_left, set.front_right]
    }

    #[test]
    fn test_mix_unchanged_below_unit_sum() {
        let inputs = [
            (0.0, 0.0, 0.0),
            (0.5, 0.2, 0.0),
            (-0.3, 0.1, 0.4),
            (0.0, -0.6, 0.3),
            (1.0, 0.0, 0.0),
            (0.2, -0.2, -0.2),
        ];
        for (y, rx, x) in inputs {
            let mixed = as_array(&holonomic_mix(y, rx, x));
            let raw = as_array(&holonomic_mix_raw(y, rx, x));
            for (m, r) in mixed.iter().zip(raw.iter()) {
                assert!((m - r).abs() < EPS, "({}, {}, {}): {} vs {}", y, rx, x, m, r);
            }
        }
    }

    #[test]
    fn test_mix_normalizes_large_input() {
        let inputs = [
            (1.0, 1.0, 0.0),
            (1.0, 0.0, 1.0),
            (-0.8, 0.7, 0.6),
            (0.9, -0.9, -0.9),
            (0.0, 1.0, 1.0),
        ];
        for (y, rx, x) in inputs {
            let mixed = as_array(&holonomic_mix(y, rx, x));
            let raw = as_array(&holonomic_mix_raw(y, rx, x));

            let max = mixed.iter().fold(0.0f32, |m, p| m.max(p.abs()));
            assert!((max - 1.0).abs() < EPS, "({}, {}, {}): max {}", y, rx, x, max);

            // Every wheel shrinks by the same factor
            let raw_max = raw.iter().fold(0.0f32, |m, p| m.max(p.abs()));
            for (m, r) in mixed.iter().zip(raw.iter()) {
                assert!((m * raw_max - r).abs() < 1e-4, "ratio broken: {} vs {}", m, r);
            }
        }
    }

    #[test]
    fn test_mix_directions() {
        let forward = holonomic_mix(1.0, 0.0, 0.0);
        assert_eq!(as_array(&forward), [1.0; 4]);

        let spin = holonomic_mix(0.0, 0.5, 0.0);
        assert!(spin.front_left > 0.0 && spin.back_left > 0.0);
        assert!(spin.front_right < 0.0 && spin.back_right < 0.0);

        let strafe = holonomic_mix_raw(0.0, 0.0, 0.5);
        assert!((strafe.front_left - 0.55).abs() < EPS);
        assert!((strafe.back_right - 0.55).abs() < EPS);
        assert!((strafe.front_right + 0.55).abs() < EPS);
        assert!((strafe.back_left + 0.55).abs() < EPS);
    }

    #[test]
    fn test_auxiliary_mix() {
        let (corners, aux) = auxiliary_mix(0.5, 0.25, -0.4);
        assert!((corners.front_left - 0.75).abs() < EPS);
        assert!((corners.back_left - 0.75).abs() < EPS);
        assert!((corners.front_right - 0.25).abs() < EPS);
        assert!((corners.back_right - 0.25).abs() < EPS);
        assert!((aux + 0.6).abs() < EPS);
    }

    #[test]
    fn test_differential_mix() {
        let mixed = differential_mix(0.3, -0.7);
        assert_eq!(as_array(&mixed), [0.3, -0.7, 0.3, -0.7]);
    }

    #[test]
    fn test_differential_rejects_lateral_and_diagonal() {
        for direction in MoveDirection::ALL {
            let result = KinematicsKind::Differential.plan(direction, 10.0, &conv());
            match direction {
                MoveDirection::Forward | MoveDirection::Backward => assert!(result.is_ok()),
                _ => assert!(matches!(
                    result,
                    Err(DriveError::InvalidDirection { .. })
                )),
            }
        }
    }

    #[test]
    fn test_unrepresentable_distance_rejected() {
        for kind in KinematicsKind::ALL {
            for inches in [f64::NAN, f64::INFINITY, -1e9, 1e9] {
                assert!(
                    matches!(
                        kind.plan(MoveDirection::Backward, inches, &conv()),
                        Err(DriveError::InvalidDistance(_))
                    ),
                    "{} {}",
                    kind,
                    inches
                );
            }
        }
    }

    #[test]
    fn test_holonomic_forward_backward() {
        let ticks = conv().ticks(12.0);
        let forward = KinematicsKind::Holonomic
            .plan(MoveDirection::Forward, 12.0, &conv())
            .unwrap();
        assert_eq!(forward.corners, CornerSet::splat(ticks));
        assert_eq!(forward.auxiliary, None);

        let backward = KinematicsKind::Holonomic
            .plan(MoveDirection::Backward, 12.0, &conv())
            .unwrap();
        assert_eq!(backward.corners, CornerSet::splat(-ticks));
    }

    #[test]
    fn test_holonomic_crab() {
        let ticks = conv().ticks(12.0);
        let left = KinematicsKind::Holonomic
            .plan(MoveDirection::Left, 12.0, &conv())
            .unwrap()
            .corners;
        assert_eq!(left.front_left, left.back_right);
        assert_eq!(left.front_right, left.back_left);
        assert_eq!(left.front_left.abs(), ticks);
        assert_eq!(left.front_left, -left.front_right);

        let right = KinematicsKind::Holonomic
            .plan(MoveDirection::Right, 12.0, &conv())
            .unwrap()
            .corners;
        assert_eq!(right, left.map(|t| -t));
    }

    #[test]
    fn test_holonomic_diagonal_uses_split_distance() {
        let split = conv().ticks(20.0 / SQRT_2);
        for direction in MoveDirection::ALL.into_iter().filter(|d| d.is_diagonal()) {
            let plan = KinematicsKind::Holonomic
                .plan(direction, 20.0, &conv())
                .unwrap();
            let moving: Vec<i32> = plan
                .corners
                .iter()
                .map(|(_, t)| *t)
                .filter(|t| *t != 0)
                .collect();
            assert_eq!(moving.len(), 2, "{}", direction);
            assert!(moving.iter().all(|t| t.abs() == split), "{}", direction);
        }

        let fr = KinematicsKind::Holonomic
            .plan(MoveDirection::ForwardRight, 20.0, &conv())
            .unwrap()
            .corners;
        assert_eq!(fr.front_left, split);
        assert_eq!(fr.back_right, split);
        assert_eq!(fr.front_right, 0);
        assert_eq!(fr.back_left, 0);
    }

    #[test]
    fn test_auxiliary_lateral_moves_only_auxiliary() {
        let ticks = conv().ticks(12.0);
        let left = KinematicsKind::HolonomicWithAuxiliary
            .plan(MoveDirection::Left, 12.0, &conv())
            .unwrap();
        assert_eq!(left.corners, CornerSet::splat(0));
        assert_eq!(left.auxiliary, Some(ticks));

        let right = KinematicsKind::HolonomicWithAuxiliary
            .plan(MoveDirection::Right, 12.0, &conv())
            .unwrap();
        assert_eq!(right.auxiliary, Some(-ticks));
    }

    #[test]
    fn test_auxiliary_diagonal_signs() {
        let split = conv().ticks(10.0 / SQRT_2);
        let cases = [
            (MoveDirection::ForwardRight, split, split),
            (MoveDirection::BackwardLeft, -split, -split),
            (MoveDirection::ForwardLeft, -split, split),
            (MoveDirection::BackwardRight, split, -split),
        ];
        for (direction, corner, aux) in cases {
            let plan = KinematicsKind::HolonomicWithAuxiliary
                .plan(direction, 10.0, &conv())
                .unwrap();
            assert_eq!(plan.corners, CornerSet::splat(corner), "{}", direction);
            assert_eq!(plan.auxiliary, Some(aux), "{}", direction);
        }
    }
}
