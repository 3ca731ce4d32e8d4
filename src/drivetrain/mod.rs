// Drivetrain control: group resolution, kinematics and blocking moves
//
// A Drivetrain owns four corner actuators (and, for the holonomic-with-auxiliary
// kind, a fifth lateral actuator). Control loops call one of the teleop entry
// points once per tick, or `drive` for a blocking autonomous move.

pub mod conversion;
pub mod executor;
pub mod group;
pub mod kinematics;
pub mod roles;
pub mod wheels;

use tracing::info;

pub use conversion::{DistanceConversion, MotorModel};
pub use executor::{
    EventLog, MotionEvent, MotionExecutor, MotionObserver, MotionPhase, MotionReport,
    SettlePolicy, SpinTicker, Ticker, TracingObserver,
};
pub use group::{GroupSelector, GroupTable};
pub use kinematics::{KinematicsKind, MotionPlan, MoveDirection};
pub use roles::{CornerSet, Role};
pub use wheels::Wheels;

use crate::error::{DriveError, Result};
use crate::motor::{Actuator, ActuatorState, DriverMode, MotorDriver};

/// A 4- or 5-actuator wheeled base
pub struct Drivetrain<D> {
    kinematics: KinematicsKind,
    wheels: Wheels<D>,
    groups: GroupTable,
    conversion: DistanceConversion,
    executor: MotionExecutor,
}

impl<D: MotorDriver> Drivetrain<D> {
    /// Tank-style base: left and right sides driven independently
    pub fn differential(corners: CornerSet<Actuator<D>>, conversion: DistanceConversion) -> Self {
        Self::build(KinematicsKind::Differential, corners, None, conversion)
    }

    /// Four-wheel omnidirectional base
    pub fn holonomic(corners: CornerSet<Actuator<D>>, conversion: DistanceConversion) -> Self {
        Self::build(KinematicsKind::Holonomic, corners, None, conversion)
    }

    /// Four-wheel base with a perpendicular actuator for lateral motion
    pub fn holonomic_with_auxiliary(
        corners: CornerSet<Actuator<D>>,
        auxiliary: Actuator<D>,
        conversion: DistanceConversion,
    ) -> Self {
        Self::build(
            KinematicsKind::HolonomicWithAuxiliary,
            corners,
            Some(auxiliary),
            conversion,
        )
    }

    fn build(
        kinematics: KinematicsKind,
        corners: CornerSet<Actuator<D>>,
        auxiliary: Option<Actuator<D>>,
        conversion: DistanceConversion,
    ) -> Self {
        info!(
            "Drivetrain ready: {} ({:.2} ticks/in, corners {:?}{})",
            kinematics,
            conversion.ticks_per_inch(),
            corners.iter().map(|(_, a)| a.name()).collect::<Vec<_>>(),
            auxiliary
                .as_ref()
                .map(|a| format!(", auxiliary {}", a.name()))
                .unwrap_or_default()
        );
        Self {
            kinematics,
            wheels: Wheels::new(corners, auxiliary),
            groups: GroupTable::new(kinematics),
            conversion,
            executor: MotionExecutor::new(),
        }
    }

    pub fn kinematics(&self) -> KinematicsKind {
        self.kinematics
    }

    pub fn conversion(&self) -> DistanceConversion {
        self.conversion
    }

    pub fn actuator(&self, role: Role) -> Option<&Actuator<D>> {
        self.wheels.get(role)
    }

    pub fn executor_mut(&mut self) -> &mut MotionExecutor {
        &mut self.executor
    }

    pub fn set_observer(&mut self, observer: impl MotionObserver + Send + 'static) {
        self.executor.set_observer(observer);
    }

    pub fn set_ticker(&mut self, ticker: impl Ticker + Send + 'static) {
        self.executor.set_ticker(ticker);
    }

    pub fn set_settle_policy(&mut self, policy: SettlePolicy) {
        self.executor.set_policy(policy);
    }

    /// Commanded state of every actuator, corners first
    pub fn snapshot(&self) -> Vec<(Role, ActuatorState)> {
        self.wheels.states()
    }

    // === Teleop ===

    /// Holonomic stick input: drive `y`, rotate `rx`, strafe `x`
    pub fn teleop_drive(&mut self, y: f32, rx: f32, x: f32) -> Result<()> {
        self.teleop_drive_scaled(y, rx, x, 1.0)
    }

    /// Holonomic stick input with every output divided by `speed_divisor`
    pub fn teleop_drive_scaled(
        &mut self,
        y: f32,
        rx: f32,
        x: f32,
        speed_divisor: f32,
    ) -> Result<()> {
        if !(speed_divisor.is_finite() && speed_divisor > 0.0) {
            return Err(DriveError::InvalidSpeedDivisor(speed_divisor));
        }
        let (corners, auxiliary) = match self.kinematics {
            KinematicsKind::Differential => {
                return Err(DriveError::UnsupportedInput {
                    input: "holonomic",
                    kinematics: self.kinematics,
                });
            }
            KinematicsKind::Holonomic => (kinematics::holonomic_mix(y, rx, x), None),
            KinematicsKind::HolonomicWithAuxiliary => {
                let (corners, aux) = kinematics::auxiliary_mix(y, rx, x);
                (corners, Some(aux))
            }
        };
        self.apply_powers(
            corners.map(|p| p / speed_divisor),
            auxiliary.map(|p| p / speed_divisor),
        )
    }

    /// Tank input for a differential base
    pub fn tank_drive(&mut self, left: f32, right: f32) -> Result<()> {
        if self.kinematics != KinematicsKind::Differential {
            return Err(DriveError::UnsupportedInput {
                input: "tank",
                kinematics: self.kinematics,
            });
        }
        self.apply_powers(kinematics::differential_mix(left, right), None)
    }

    fn apply_powers(&mut self, corners: CornerSet<f32>, auxiliary: Option<f32>) -> Result<()> {
        self.wheels.for_each(&Role::CORNERS, |role, actuator| {
            actuator.set_power(corners.get(role).copied().unwrap_or(0.0))
        })?;
        if let Some(power) = auxiliary {
            self.wheels
                .for_each(&[Role::Auxiliary], |_, actuator| actuator.set_power(power))?;
        }
        Ok(())
    }

    // === Autonomous ===

    /// Move `inches` in `direction` and block until every wheel settles.
    ///
    /// An unsupported direction or an unrepresentable distance is rejected
    /// before any actuator is touched.
    pub fn drive(
        &mut self,
        direction: MoveDirection,
        inches: f64,
        speed: f32,
    ) -> Result<MotionReport> {
        let plan = self.kinematics.plan(direction, inches, &self.conversion)?;
        let roles = self.groups.resolve(GroupSelector::All)?;
        info!(
            "Drive {} {:.1} in at {:.2} on {} ({} actuators)",
            direction,
            inches,
            speed,
            self.kinematics,
            roles.len()
        );
        self.executor.run(
            &mut self.wheels,
            GroupSelector::All,
            roles,
            direction,
            plan,
            speed,
        )
    }

    /// True while any actuator on the base is busy
    pub fn is_busy(&mut self) -> Result<bool> {
        self.is_busy_group(GroupSelector::All)
    }

    pub fn is_busy_group(&mut self, selector: GroupSelector) -> Result<bool> {
        let roles = self.groups.resolve(selector)?;
        self.wheels.poll_busy(roles)
    }

    // === Group primitives ===

    pub fn set_power(&mut self, selector: GroupSelector, power: f32) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels.for_each(roles, |_, a| a.set_power(power))
    }

    /// Same baseline-relative target on every actuator in the group
    pub fn set_target_position(&mut self, selector: GroupSelector, ticks: i32) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels.for_each(roles, |_, a| a.set_target_position(ticks))
    }

    /// Switch the group to position-seeking; with `wait`, block until settled
    pub fn run_to_position(&mut self, selector: GroupSelector, wait: bool) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels
            .for_each(roles, |_, a| a.set_mode(DriverMode::PositionSeeking))?;
        if wait {
            self.executor.settle(&mut self.wheels, selector, roles)?;
        }
        Ok(())
    }

    pub fn reset_baseline(&mut self, selector: GroupSelector) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels.for_each(roles, |_, a| a.reset_baseline())
    }

    pub fn set_power_only_mode(&mut self, selector: GroupSelector) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels.for_each(roles, |_, a| a.set_mode(DriverMode::PowerOnly))
    }

    pub fn set_position_seeking_mode(&mut self, selector: GroupSelector) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels
            .for_each(roles, |_, a| a.set_mode(DriverMode::PositionSeeking))
    }

    pub fn set_tolerance(&mut self, selector: GroupSelector, ticks: u32) -> Result<()> {
        let roles = self.groups.resolve(selector)?;
        self.wheels.for_each(roles, |_, a| a.set_tolerance(ticks))
    }

    /// Zero power on every actuator
    pub fn stop(&mut self) -> Result<()> {
        self.set_power(GroupSelector::All, 0.0)
    }
}
