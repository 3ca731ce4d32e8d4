// 50 Hz drive loop with watchdog
// Teleop commands are re-applied every tick until they go stale, then the
// base is stopped. Move commands run the blocking executor to completion
// inside the tick that received them, off the async scheduler.

use std::time::{Duration, Instant};
use tokio::task::block_in_place;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::config::{
    CMD_TIMEOUT, LOOP_HZ, RuntimeConfig, TOPIC_CMD_MOVE, TOPIC_CMD_TELEOP, TOPIC_HEALTH,
    TOPIC_MOTION, WheelBinding,
};
use crate::drivetrain::{
    CornerSet, Drivetrain, EventLog, GroupSelector, KinematicsKind, MotionEvent,
};
use crate::error::{DriveError, Result};
use crate::messages::{MoveCommand, RuntimeHealth, TeleopCommand};
use crate::motor::{
    Actuator, FeetechBus, FeetechError, FeetechWheel, MotorDriver, SimMotor, feetech_wheel,
};

pub struct Runtime<D> {
    drivetrain: Drivetrain<D>,
    latest_cmd: Option<TeleopCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
    events: EventLog,
}

impl<D: MotorDriver> Runtime<D> {
    pub fn new(mut drivetrain: Drivetrain<D>) -> Self {
        let events = EventLog::new();
        drivetrain.set_observer(events.clone());
        Self {
            drivetrain,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            events,
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn drivetrain(&self) -> &Drivetrain<D> {
        &self.drivetrain
    }

    /// Executor events recorded since the last call
    pub fn take_events(&self) -> Vec<MotionEvent> {
        self.events.drain()
    }

    pub fn on_command(&mut self, cmd: TeleopCommand, now: Instant) {
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    /// Run a move to completion, then hand the base back to teleop.
    ///
    /// The base returns to power-only mode even when the move fails; the
    /// move's own error wins over a failure to switch modes.
    pub fn on_move(&mut self, cmd: MoveCommand) -> Result<()> {
        info!("Move command: {:?}", cmd);
        self.latest_cmd = None;
        let moved = self.drivetrain.drive(cmd.direction, cmd.inches, cmd.speed);
        let released = self.drivetrain.set_power_only_mode(GroupSelector::All);
        let result = moved.and(released);
        if let Err(e) = &result {
            warn!("Move failed: {}", e);
            self.health = RuntimeHealth::Fault;
        }
        result
    }

    /// Apply the latest teleop command, or stop if it is stale
    pub fn tick(&mut self, now: Instant) -> Result<RuntimeHealth> {
        let cmd_age = now.saturating_duration_since(self.cmd_received_at);

        match self.latest_cmd {
            Some(cmd) if cmd_age <= CMD_TIMEOUT => match self.apply(cmd) {
                Ok(()) => self.health = RuntimeHealth::Ok,
                Err(e) => {
                    warn!("Rejected teleop command {:?}: {}", cmd, e);
                    self.latest_cmd = None;
                    self.health = RuntimeHealth::Fault;
                    self.drivetrain.stop()?;
                }
            },
            _ => {
                // Watchdog triggered - stop the robot
                if self.health == RuntimeHealth::Ok {
                    warn!("Command stale ({:?} old), stopping robot", cmd_age);
                }
                if self.health != RuntimeHealth::Fault {
                    self.health = RuntimeHealth::CmdStale;
                }
                self.drivetrain.stop()?;
            }
        }
        Ok(self.health)
    }

    fn apply(&mut self, cmd: TeleopCommand) -> Result<()> {
        match cmd {
            TeleopCommand::Holonomic {
                y,
                rx,
                x,
                speed_divisor,
            } => self
                .drivetrain
                .teleop_drive_scaled(y, rx, x, speed_divisor.unwrap_or(1.0)),
            TeleopCommand::Tank { left, right } => self.drivetrain.tank_drive(left, right),
        }
    }
}

/// Build a drivetrain from config, creating one driver per binding
pub fn build_drivetrain<D, F>(config: &RuntimeConfig, mut make_driver: F) -> Result<Drivetrain<D>>
where
    D: MotorDriver,
    F: FnMut(&WheelBinding) -> Result<D>,
{
    config.validate()?;
    let mut actuator = |binding: &WheelBinding| -> Result<Actuator<D>> {
        let driver = make_driver(binding)?;
        Ok(Actuator::with_polarity(
            binding.name.clone(),
            driver,
            binding.polarity(),
        ))
    };

    let wheels = &config.wheels;
    let corners = CornerSet::new(
        actuator(&wheels.back_left)?,
        actuator(&wheels.back_right)?,
        actuator(&wheels.front_left)?,
        actuator(&wheels.front_right)?,
    );
    let conversion = config.conversion()?;

    let mut drivetrain = match (config.kinematics, &wheels.auxiliary) {
        (KinematicsKind::Differential, _) => Drivetrain::differential(corners, conversion),
        (KinematicsKind::Holonomic, _) => Drivetrain::holonomic(corners, conversion),
        (KinematicsKind::HolonomicWithAuxiliary, Some(aux)) => {
            Drivetrain::holonomic_with_auxiliary(corners, actuator(aux)?, conversion)
        }
        (KinematicsKind::HolonomicWithAuxiliary, None) => {
            return Err(DriveError::Config("missing auxiliary wheel binding".into()));
        }
    };
    drivetrain.set_settle_policy(config.settle);
    drivetrain.set_tolerance(GroupSelector::All, config.tolerance_ticks)?;
    Ok(drivetrain)
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Run the runtime until an error; needs a multi-threaded tokio runtime
pub async fn run(config: RuntimeConfig) -> std::result::Result<(), BoxError> {
    if config.simulate {
        info!("Running with simulated motors");
        let drivetrain = build_drivetrain(&config, |_| Ok(SimMotor::new()))?;
        return serve(Runtime::new(drivetrain)).await;
    }

    info!("Opening motor bus on {}", config.port);
    let bus = feetech_wheel::shared(FeetechBus::open(&config.port)?);
    let drivetrain = build_drivetrain(&config, |binding| {
        let responding = bus
            .lock()
            .map_err(|_| DriveError::driver(&binding.name, FeetechError::Poisoned))?
            .ping(binding.id)
            .map_err(|e| DriveError::driver(&binding.name, e))?;
        if !responding {
            warn!("Motor {} ({}) not responding to ping", binding.id, binding.name);
            return Err(DriveError::driver(
                &binding.name,
                FeetechError::Timeout { id: binding.id },
            ));
        }
        Ok(FeetechWheel::new(bus.clone(), binding.id).with_max_raw_speed(config.max_raw_speed))
    })?;
    serve(Runtime::new(drivetrain)).await
}

/// Run a blocking move without starving the other tasks on the scheduler
fn run_move<D: MotorDriver>(runtime: &mut Runtime<D>, cmd: MoveCommand) -> Result<()> {
    block_in_place(|| runtime.on_move(cmd))
}

async fn serve<D: MotorDriver>(mut runtime: Runtime<D>) -> std::result::Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_teleop = session.declare_subscriber(TOPIC_CMD_TELEOP).await?;
    let sub_move = session.declare_subscriber(TOPIC_CMD_MOVE).await?;
    let pub_motion = session.declare_publisher(TOPIC_MOTION).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    // A move can hold the loop for seconds; don't replay the missed ticks
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Runtime started: {} drivetrain, {}Hz loop, {}ms watchdog timeout",
        runtime.drivetrain().kinematics(),
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_TELEOP, TOPIC_CMD_MOVE);
    info!("Publishing to: {}, {}", TOPIC_MOTION, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain teleop commands (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_teleop.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<TeleopCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd, Instant::now()),
                Err(e) => warn!("Failed to parse teleop command: {}", e),
            }
        }

        // 2. Run at most one move per tick; it blocks this worker until
        // settled while Zenoh keeps running on the others
        if let Ok(Some(sample)) = sub_move.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<MoveCommand>(&payload) {
                Ok(cmd) => {
                    if run_move(&mut runtime, cmd).is_err() {
                        // Logged by on_move; report the fault without waiting a tick
                        pub_health.put(serde_json::to_string(&runtime.health())?).await?;
                    }
                }
                Err(e) => warn!("Failed to parse move command: {}", e),
            }
        }

        // 3. Apply teleop (includes watchdog logic)
        let health = runtime.tick(Instant::now())?;

        // 4. Publish motion events and health
        for event in runtime.take_events() {
            pub_motion.put(serde_json::to_string(&event)?).await?;
        }
        pub_health.put(serde_json::to_string(&health)?).await?;
    }
}
