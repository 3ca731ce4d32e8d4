// Blocking point-to-point motion executor
//
// A move runs through a fixed sequence of phases:
//
//   Idle -> Resetting -> Targeting -> Settling -> Done
//
// Resetting zeroes every encoder baseline in the group and drops the actuators
// back to power-only mode. Targeting writes the per-wheel tick targets,
// switches to position-seeking mode and applies the drive power. Settling polls
// the group until no actuator is busy, stepping the ticker between polls. Done
// cuts power to the group.
//
// Each transition is reported to a MotionObserver as a MotionEvent. With the
// default unbounded settle policy a motor that never settles blocks forever;
// the bounded policies end the move with DriveError::SettleTimeout instead.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::group::GroupSelector;
use super::kinematics::{MotionPlan, MoveDirection};
use super::roles::Role;
use super::wheels::Wheels;
use crate::error::{DriveError, Result};
use crate::motor::{DriverMode, MotorDriver};

/// Executor phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPhase {
    Idle,
    Resetting,
    Targeting,
    Settling,
    Done,
    /// Settle policy expired before the group settled
    TimedOut,
}

/// A phase transition of the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub phase: MotionPhase,
    pub group: GroupSelector,
    /// Set for autonomous moves, absent for bare group settles
    pub direction: Option<MoveDirection>,
    /// Busy polls performed so far
    pub polls: u64,
}

/// Receives executor phase transitions
pub trait MotionObserver {
    fn on_event(&mut self, event: &MotionEvent);
}

impl<F: FnMut(&MotionEvent)> MotionObserver for F {
    fn on_event(&mut self, event: &MotionEvent) {
        self(event)
    }
}

/// Logs every transition through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MotionObserver for TracingObserver {
    fn on_event(&mut self, event: &MotionEvent) {
        match event.direction {
            Some(direction) => info!(
                "Motion {} on {}: {:?} after {} polls",
                direction, event.group, event.phase, event.polls
            ),
            None => info!(
                "Group {}: {:?} after {} polls",
                event.group, event.phase, event.polls
            ),
        }
    }
}

/// Shared, clonable event recorder.
///
/// Clones see the same buffer, so one copy can be handed to the executor and
/// another kept by whoever publishes or inspects the events.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<MotionEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<MotionEvent> {
        self.lock().clone()
    }

    /// Take everything recorded so far, leaving the log empty
    pub fn drain(&self) -> Vec<MotionEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MotionEvent>> {
        // A panicking observer cannot leave a Vec half-written
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MotionObserver for EventLog {
    fn on_event(&mut self, event: &MotionEvent) {
        self.lock().push(event.clone());
    }
}

/// Called between busy polls while settling
pub trait Ticker {
    fn step(&mut self);
}

impl<F: FnMut()> Ticker for F {
    fn step(&mut self) {
        self()
    }
}

/// Busy-wait without yielding the thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinTicker;

impl Ticker for SpinTicker {
    fn step(&mut self) {
        std::hint::spin_loop();
    }
}

/// How long the executor waits for a group to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlePolicy {
    /// Poll until settled, however long that takes
    #[default]
    Unbounded,
    /// Give up after this many busy polls
    MaxPolls(u64),
    /// Give up after this many milliseconds of wall-clock time
    TimeoutMs(u64),
}

/// Outcome of a completed move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReport {
    pub plan: MotionPlan,
    pub polls: u64,
}

/// Runs moves and settles through the phase sequence
pub struct MotionExecutor {
    policy: SettlePolicy,
    phase: MotionPhase,
    ticker: Box<dyn Ticker + Send>,
    observer: Box<dyn MotionObserver + Send>,
}

impl Default for MotionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionExecutor {
    pub fn new() -> Self {
        Self {
            policy: SettlePolicy::Unbounded,
            phase: MotionPhase::Idle,
            ticker: Box::new(SpinTicker),
            observer: Box::new(TracingObserver),
        }
    }

    pub fn policy(&self) -> SettlePolicy {
        self.policy
    }

    /// Last phase entered; `Idle` until the first move
    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub fn set_policy(&mut self, policy: SettlePolicy) {
        self.policy = policy;
    }

    pub fn set_ticker(&mut self, ticker: impl Ticker + Send + 'static) {
        self.ticker = Box::new(ticker);
    }

    pub fn set_observer(&mut self, observer: impl MotionObserver + Send + 'static) {
        self.observer = Box::new(observer);
    }

    fn emit(
        &mut self,
        phase: MotionPhase,
        group: GroupSelector,
        direction: Option<MoveDirection>,
        polls: u64,
    ) {
        self.phase = phase;
        self.observer.on_event(&MotionEvent {
            phase,
            group,
            direction,
            polls,
        });
    }

    /// Execute a planned move on `roles` and block until it settles
    pub fn run<D: MotorDriver>(
        &mut self,
        wheels: &mut Wheels<D>,
        group: GroupSelector,
        roles: &[Role],
        direction: MoveDirection,
        plan: MotionPlan,
        speed: f32,
    ) -> Result<MotionReport> {
        self.emit(MotionPhase::Resetting, group, Some(direction), 0);
        wheels.for_each(roles, |_, actuator| {
            actuator.reset_baseline()?;
            actuator.set_mode(DriverMode::PowerOnly)
        })?;

        self.emit(MotionPhase::Targeting, group, Some(direction), 0);
        wheels.for_each(roles, |role, actuator| {
            actuator.set_target_position(plan_target(&plan, role))
        })?;
        wheels.for_each(roles, |_, actuator| {
            actuator.set_mode(DriverMode::PositionSeeking)
        })?;
        let power = speed.abs();
        wheels.for_each(roles, |_, actuator| actuator.set_power(power))?;

        let polls = self.wait(wheels, group, roles, Some(direction))?;

        wheels.for_each(roles, |_, actuator| actuator.set_power(0.0))?;
        self.emit(MotionPhase::Done, group, Some(direction), polls);
        Ok(MotionReport { plan, polls })
    }

    /// Block until no actuator in `roles` is busy, without touching power
    pub fn settle<D: MotorDriver>(
        &mut self,
        wheels: &mut Wheels<D>,
        group: GroupSelector,
        roles: &[Role],
    ) -> Result<u64> {
        let polls = self.wait(wheels, group, roles, None)?;
        self.emit(MotionPhase::Done, group, None, polls);
        Ok(polls)
    }

    fn wait<D: MotorDriver>(
        &mut self,
        wheels: &mut Wheels<D>,
        group: GroupSelector,
        roles: &[Role],
        direction: Option<MoveDirection>,
    ) -> Result<u64> {
        self.emit(MotionPhase::Settling, group, direction, 0);
        let started = Instant::now();
        let mut polls: u64 = 0;

        while wheels.poll_busy(roles)? {
            polls += 1;
            if self.expired(polls, started) {
                warn!(
                    "Group {} did not settle after {} polls ({:?}), stopping",
                    group,
                    polls,
                    started.elapsed()
                );
                wheels.for_each(roles, |_, actuator| actuator.set_power(0.0))?;
                self.emit(MotionPhase::TimedOut, group, direction, polls);
                return Err(DriveError::SettleTimeout { polls });
            }
            self.ticker.step();
        }

        debug!("Group {} settled after {} polls", group, polls);
        Ok(polls)
    }

    fn expired(&self, polls: u64, started: Instant) -> bool {
        match self.policy {
            SettlePolicy::Unbounded => false,
            SettlePolicy::MaxPolls(max) => polls >= max,
            SettlePolicy::TimeoutMs(ms) => started.elapsed() >= Duration::from_millis(ms),
        }
    }
}

fn plan_target(plan: &MotionPlan, role: Role) -> i32 {
    match role {
        Role::Auxiliary => plan.auxiliary.unwrap_or(0),
        corner => plan.corners.get(corner).copied().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::roles::CornerSet;
    use crate::motor::{Actuator, SimMotor};

    fn wheels(motor: impl Fn() -> SimMotor) -> Wheels<SimMotor> {
        Wheels::new(
            CornerSet::new(
                Actuator::new("backLeft", motor()),
                Actuator::new("backRight", motor()),
                Actuator::new("frontLeft", motor()),
                Actuator::new("frontRight", motor()),
            ),
            None,
        )
    }

    fn plan(ticks: i32) -> MotionPlan {
        MotionPlan {
            corners: CornerSet::splat(ticks),
            auxiliary: None,
        }
    }

    #[test]
    fn test_phases_in_order() {
        let log = EventLog::new();
        let mut executor = MotionExecutor::new();
        executor.set_observer(log.clone());
        assert_eq!(executor.phase(), MotionPhase::Idle);

        let mut wheels = wheels(SimMotor::new);
        let report = executor
            .run(
                &mut wheels,
                GroupSelector::Drivetrain,
                &Role::CORNERS,
                MoveDirection::Forward,
                plan(100),
                1.0,
            )
            .unwrap();

        let phases: Vec<MotionPhase> = log.events().iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            [
                MotionPhase::Resetting,
                MotionPhase::Targeting,
                MotionPhase::Settling,
                MotionPhase::Done
            ]
        );
        // 100 ticks at 25 per poll: busy on the first three polls
        assert_eq!(report.polls, 3);
        assert_eq!(log.events().last().unwrap().polls, 3);
        assert_eq!(executor.phase(), MotionPhase::Done);
    }

    #[test]
    fn test_done_cuts_power() {
        let mut executor = MotionExecutor::new();
        executor.set_observer(|_: &MotionEvent| {});
        let mut wheels = wheels(SimMotor::new);
        executor
            .run(
                &mut wheels,
                GroupSelector::Drivetrain,
                &Role::CORNERS,
                MoveDirection::Backward,
                plan(-60),
                0.8,
            )
            .unwrap();

        for (_, state) in wheels.states() {
            assert_eq!(state.power, 0.0);
            assert_eq!(state.target, -60);
            assert_eq!(state.mode, DriverMode::PositionSeeking);
        }
    }

    #[test]
    fn test_ticker_called_between_polls() {
        let steps = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&steps);

        let mut executor = MotionExecutor::new();
        executor.set_ticker(move || *counter.lock().unwrap() += 1);
        let mut wheels = wheels(|| SimMotor::new().with_ticks_per_poll(10));
        let report = executor
            .run(
                &mut wheels,
                GroupSelector::Drivetrain,
                &Role::CORNERS,
                MoveDirection::Forward,
                plan(50),
                1.0,
            )
            .unwrap();

        assert_eq!(report.polls, 4);
        assert_eq!(*steps.lock().unwrap(), 4);
    }

    #[test]
    fn test_max_polls_policy_times_out() {
        let log = EventLog::new();
        let mut executor = MotionExecutor::new();
        executor.set_observer(log.clone());
        executor.set_policy(SettlePolicy::MaxPolls(20));

        let mut wheels = wheels(SimMotor::stalled);
        let err = executor
            .run(
                &mut wheels,
                GroupSelector::Drivetrain,
                &Role::CORNERS,
                MoveDirection::Forward,
                plan(500),
                1.0,
            )
            .unwrap_err();

        assert!(matches!(err, DriveError::SettleTimeout { polls: 20 }));
        assert_eq!(log.events().last().unwrap().phase, MotionPhase::TimedOut);
        for (_, state) in wheels.states() {
            assert_eq!(state.power, 0.0);
        }
    }

    #[test]
    fn test_timeout_policy_times_out() {
        let mut executor = MotionExecutor::new();
        executor.set_observer(|_: &MotionEvent| {});
        executor.set_policy(SettlePolicy::TimeoutMs(5));
        executor.set_ticker(|| std::thread::sleep(Duration::from_millis(1)));

        let mut wheels = wheels(SimMotor::stalled);
        let result = executor.run(
            &mut wheels,
            GroupSelector::Drivetrain,
            &Role::CORNERS,
            MoveDirection::Forward,
            plan(500),
            1.0,
        );
        assert!(matches!(result, Err(DriveError::SettleTimeout { .. })));
    }

    #[test]
    fn test_event_log_drain() {
        let mut log = EventLog::new();
        log.on_event(&MotionEvent {
            phase: MotionPhase::Settling,
            group: GroupSelector::All,
            direction: None,
            polls: 0,
        });
        assert_eq!(log.drain().len(), 1);
        assert!(log.events().is_empty());
    }
}
