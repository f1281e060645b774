//! Actor-based control engine: lifecycle state machine, shared parameter
//! vector, and routine execution.
//!
//! All state mutations happen in a single async task that processes commands
//! via message-passing. External callers (GUI, CLI, tests) talk to it through
//! a cloneable [`ControlHandle`]; the only state shared with the running
//! routine body is the parameter vector and the stop flag, both plain
//! atomics. This keeps a single-writer discipline for every piece of engine
//! state and makes cancellation purely cooperative.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --select--> Armed --start--> Running --stop--> StopRequested
//!   ^                |                                     |
//!   +-----stop-------+          (routine body returns)     |
//!   +------------------------------------------------------+
//! ```
//!
//! A routine that exits for any reason (stop flag, plan exhausted, replay
//! finished, internal error) returns the engine to `Idle` and emits a
//! [`EngineEvent::Finished`] broadcast. The subscriber owns any cleanup it
//! needs (clearing overlays, zeroing the field).

use crate::config::Settings;
use crate::field::FieldDriver;
use crate::gamepad::Gamepad;
use crate::routine::{Routine, RoutineContext};
use crate::vision::VisionHub;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Number of live-tunable parameter slots.
pub const PARAM_SLOTS: usize = 5;

/// The live-tunable parameter vector.
///
/// Five `f64` slots stored as atomic bit patterns so the routine body can
/// read them lock-free on every tick. Relaxed ordering is sufficient: the
/// contract is eventual visibility, and routines are designed to tolerate
/// parameter changes at arbitrary tick boundaries.
#[derive(Default)]
pub struct ParamTable {
    slots: [AtomicU64; PARAM_SLOTS],
}

impl ParamTable {
    /// Reads slot `index` (0..4). Out-of-range indices read as 0.
    pub fn get(&self, index: usize) -> f64 {
        self.slots
            .get(index)
            .map(|s| f64::from_bits(s.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    /// Writes slot `index`. Callers validate the index first.
    pub fn set(&self, index: usize, value: f64) {
        if let Some(slot) = self.slots.get(index) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// All five slots at once (each read individually; no cross-slot
    /// consistency is promised).
    pub fn snapshot(&self) -> [f64; PARAM_SLOTS] {
        [self.get(0), self.get(1), self.get(2), self.get(3), self.get(4)]
    }
}

/// State shared between the engine/routine task and external callers:
/// the parameter vector and the cooperative stop flag. Nothing else.
#[derive(Default)]
pub struct SharedControl {
    /// Live-tunable parameter slots.
    pub params: ParamTable,
    stop: AtomicBool,
}

impl SharedControl {
    /// Whether a stop has been requested. Routines poll this at the top of
    /// every tick.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Requests a cooperative stop.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn clear_stop(&self) {
        self.stop.store(false, Ordering::Relaxed);
    }
}

/// Engine lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No routine selected.
    Idle,
    /// Routine selected, not yet started.
    Armed(Routine),
    /// Routine body executing.
    Running(Routine),
    /// Stop flag set; waiting for the body to observe it and return.
    StopRequested(Routine),
}

/// Events broadcast to engine subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The routine body returned (normally or via stop). Carries no payload;
    /// the subscriber performs its own cleanup.
    Finished,
}

/// Errors for rejected engine commands.
///
/// All of these are no-ops from the engine's point of view: the state
/// machine is unchanged and the process keeps running. Callers log them.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    /// `start` while a routine is already running.
    #[error("a routine is already running; stop it first")]
    AlreadyRunning,
    /// `start` without a prior selection.
    #[error("no routine armed; select one first")]
    NotArmed,
    /// `select` outside the idle state.
    #[error("routine selection is only valid when idle")]
    NotIdle,
    /// Parameter index outside 0..5.
    #[error("parameter index {0} out of range (0..{PARAM_SLOTS})")]
    BadParamIndex(usize),
    /// The engine task has exited.
    #[error("engine task is no longer running")]
    ChannelClosed,
}

/// Commands consumed by the engine actor.
#[derive(Debug)]
enum EngineCommand {
    Select {
        name: String,
        response: oneshot::Sender<Result<Routine, EngineError>>,
    },
    Start {
        response: oneshot::Sender<Result<(), EngineError>>,
    },
    Stop {
        response: oneshot::Sender<Result<(), EngineError>>,
    },
    SetParam {
        index: usize,
        value: f64,
        response: oneshot::Sender<Result<(), EngineError>>,
    },
    State {
        response: oneshot::Sender<EngineState>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Cloneable async handle to the engine actor.
#[derive(Clone)]
pub struct ControlHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    events: broadcast::Sender<EngineEvent>,
}

impl ControlHandle {
    async fn send<T>(
        &self,
        cmd: EngineCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, EngineError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Arms the named routine. Valid only in `Idle`. Unknown names arm the
    /// no-op fallback routine rather than failing. Parameter values are
    /// not reset.
    pub async fn select_routine(&self, name: &str) -> Result<Routine, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(
            EngineCommand::Select {
                name: name.to_string(),
                response: tx,
            },
            rx,
        )
        .await?
    }

    /// Starts the armed routine on the runtime. Returns immediately.
    pub async fn start(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Start { response: tx }, rx).await?
    }

    /// Requests a cooperative stop. A no-op with a diagnostic from `Idle`.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Stop { response: tx }, rx).await?
    }

    /// Atomically updates parameter slot `index`. Valid in any state;
    /// visible to the routine body on its next read.
    pub async fn set_param(&self, index: usize, value: f64) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(
            EngineCommand::SetParam {
                index,
                value,
                response: tx,
            },
            rx,
        )
        .await?
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> Result<EngineState, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::State { response: tx }, rx).await
    }

    /// Subscribes to engine events (`Finished` notifications).
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Stops any running routine and ends the engine task.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown { response: tx }, rx).await
    }
}

/// The engine actor. Owns the lifecycle state machine; constructed and
/// spawned via [`ControlEngine::spawn`].
pub struct ControlEngine {
    settings: Arc<Settings>,
    shared: Arc<SharedControl>,
    field: FieldDriver,
    vision: VisionHub,
    gamepad: Option<Arc<dyn Gamepad>>,
    state: EngineState,
    events: broadcast::Sender<EngineEvent>,
    done_tx: mpsc::Sender<()>,
}

impl ControlEngine {
    /// Spawns the engine actor onto the current runtime and returns its
    /// handle plus the task join handle.
    pub fn spawn(
        settings: Arc<Settings>,
        field: FieldDriver,
        vision: VisionHub,
        gamepad: Option<Arc<dyn Gamepad>>,
    ) -> (ControlHandle, JoinHandle<()>) {
        let (command_tx, command_rx) =
            mpsc::channel(settings.engine.command_channel_capacity);
        let (events, _) = broadcast::channel(settings.engine.event_channel_capacity);
        let (done_tx, done_rx) = mpsc::channel(1);

        let engine = ControlEngine {
            settings,
            shared: Arc::new(SharedControl::default()),
            field,
            vision,
            gamepad,
            state: EngineState::Idle,
            events: events.clone(),
            done_tx,
        };
        let handle = ControlHandle { command_tx, events };
        let task = tokio::spawn(engine.run(command_rx, done_rx));
        (handle, task)
    }

    /// Runs the actor event loop, processing commands until shutdown.
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<EngineCommand>,
        mut done_rx: mpsc::Receiver<()>,
    ) {
        info!("Control engine started");
        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(cmd) => {
                            if self.handle_command(cmd) {
                                break;
                            }
                        }
                        None => break, // All handles dropped.
                    }
                }
                Some(()) = done_rx.recv() => {
                    self.on_routine_exited();
                }
            }
        }
        info!("Control engine shutting down");
    }

    /// Handles one command. Returns `true` when the actor should exit.
    fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::Select { name, response } => {
                let _ = response.send(self.select(&name));
            }
            EngineCommand::Start { response } => {
                let _ = response.send(self.start());
            }
            EngineCommand::Stop { response } => {
                let _ = response.send(self.stop());
            }
            EngineCommand::SetParam {
                index,
                value,
                response,
            } => {
                let result = if index < PARAM_SLOTS {
                    self.shared.params.set(index, value);
                    Ok(())
                } else {
                    warn!("Rejected parameter write to slot {}", index);
                    Err(EngineError::BadParamIndex(index))
                };
                let _ = response.send(result);
            }
            EngineCommand::State { response } => {
                let _ = response.send(self.state);
            }
            EngineCommand::Shutdown { response } => {
                if matches!(
                    self.state,
                    EngineState::Running(_) | EngineState::StopRequested(_)
                ) {
                    self.shared.request_stop();
                }
                let _ = response.send(());
                return true;
            }
        }
        false
    }

    fn select(&mut self, name: &str) -> Result<Routine, EngineError> {
        if self.state != EngineState::Idle {
            warn!("Rejected routine selection '{}': engine not idle", name);
            return Err(EngineError::NotIdle);
        }
        let routine = Routine::parse(name);
        if routine == Routine::Unknown {
            warn!("Routine '{}' is not defined; armed the no-op fallback", name);
        }
        info!("Armed routine '{}'", routine.name());
        self.state = EngineState::Armed(routine);
        Ok(routine)
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let routine = match self.state {
            EngineState::Armed(routine) => routine,
            EngineState::Running(_) | EngineState::StopRequested(_) => {
                warn!("Rejected start: a routine is already running");
                return Err(EngineError::AlreadyRunning);
            }
            EngineState::Idle => {
                warn!("Rejected start: no routine armed");
                return Err(EngineError::NotArmed);
            }
        };

        self.shared.clear_stop();
        let ctx = RoutineContext {
            control: self.shared.clone(),
            field: self.field.clone(),
            vision: self.vision.clone(),
            gamepad: self.gamepad.clone(),
            tick: self.settings.tick_period(),
            replay_path: self.settings.replay.waveform_path.clone(),
        };
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            routine.run(ctx).await;
            let _ = done_tx.send(()).await;
        });
        info!("Routine '{}' started", routine.name());
        self.state = EngineState::Running(routine);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Running(routine) => {
                info!("Stop requested for routine '{}'", routine.name());
                self.shared.request_stop();
                self.state = EngineState::StopRequested(routine);
            }
            EngineState::Armed(routine) => {
                info!("Disarmed routine '{}'", routine.name());
                self.state = EngineState::Idle;
            }
            EngineState::StopRequested(_) => {
                // Already stopping; nothing further to do.
            }
            EngineState::Idle => {
                warn!("Stop requested but no routine is active");
            }
        }
        Ok(())
    }

    fn on_routine_exited(&mut self) {
        match self.state {
            EngineState::Running(routine) | EngineState::StopRequested(routine) => {
                info!("Routine '{}' finished", routine.name());
            }
            _ => {
                // Late completion message after a disarm; harmless.
            }
        }
        self.state = EngineState::Idle;
        let _ = self.events.send(EngineEvent::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockDac;

    fn spawn_engine() -> (ControlHandle, JoinHandle<()>) {
        let settings = Arc::new(Settings::new(None).expect("defaults"));
        let dac = Arc::new(MockDac::new());
        let field = FieldDriver::new(dac, settings.coils);
        ControlEngine::spawn(settings, field, VisionHub::default(), None)
    }

    #[test]
    fn test_param_table_roundtrip() {
        let params = ParamTable::default();
        params.set(0, -20.5);
        params.set(4, 1e-9);
        assert_eq!(params.get(0), -20.5);
        assert_eq!(params.get(4), 1e-9);
        assert_eq!(params.get(2), 0.0);
        // Out-of-range reads are 0, writes are dropped.
        params.set(9, 7.0);
        assert_eq!(params.get(9), 0.0);
    }

    #[tokio::test]
    async fn test_select_requires_idle() {
        let (handle, _task) = spawn_engine();
        handle.select_routine("rotateXY").await.expect("select");
        let err = handle.select_routine("rotateXZ").await.expect_err("armed");
        assert_eq!(err, EngineError::NotIdle);
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_unknown_routine_arms_fallback_and_finishes() {
        let (handle, _task) = spawn_engine();
        let mut events = handle.subscribe();

        let routine = handle.select_routine("doesNotExist").await.expect("select");
        assert_eq!(routine, Routine::Unknown);

        handle.start().await.expect("start");
        // The fallback body returns immediately; expect the finished event.
        let event = tokio::time::timeout(std::time::Duration::from_secs(1), events.recv())
            .await
            .expect("event in time")
            .expect("event");
        assert_eq!(event, EngineEvent::Finished);
        assert_eq!(handle.state().await.expect("state"), EngineState::Idle);
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_start_without_arm_rejected() {
        let (handle, _task) = spawn_engine();
        assert_eq!(handle.start().await, Err(EngineError::NotArmed));
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_stop_from_idle_is_noop() {
        let (handle, _task) = spawn_engine();
        handle.stop().await.expect("stop is a no-op");
        assert_eq!(handle.state().await.expect("state"), EngineState::Idle);
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_stop_disarms_armed_routine() {
        let (handle, _task) = spawn_engine();
        handle.select_routine("osc_sin").await.expect("select");
        handle.stop().await.expect("stop");
        assert_eq!(handle.state().await.expect("state"), EngineState::Idle);
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_set_param_index_validated() {
        let (handle, _task) = spawn_engine();
        handle.set_param(4, 2.5).await.expect("in range");
        assert_eq!(
            handle.set_param(5, 1.0).await,
            Err(EngineError::BadParamIndex(5))
        );
        handle.shutdown().await.expect("shutdown");
    }
}
