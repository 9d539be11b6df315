use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use taggame::observation::{RlAction, Transition, action_space};
use taggame::shared::SharedEngine;
use taggame::steering::nearest_runner;
use taggame_core::{EngineError, EngineState, FrameSnapshot, Vector2};

use crate::config::{DriverConfig, RlController};

/// Commands sent from an RL controller (or the process) to the tick loop.
#[derive(Debug)]
pub enum DriverCommand {
    /// Replace the RL player's pending action.
    SetAction(Vector2),
    /// Same as `SetAction`, in the `{"x": .., "y": ..}` wire form.
    ActionJson(String),
    Stop,
}

/// Events emitted by the tick loop to observers.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// State after a completed tick.
    Frame(FrameSnapshot),
    /// What the RL player saw after a completed tick, in the observation
    /// JSON wire form.
    Transition {
        tick: u64,
        observation_json: String,
        reward: f64,
        terminal: bool,
    },
    /// The RL player was tagged.
    EpisodeEnded {
        episode: u64,
        tick: u64,
        reward: f64,
    },
    /// The loop has exited and the engine is terminated.
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    TickLimit,
    Requested,
    /// Someone else terminated the engine through a shared handle.
    Terminated,
    /// The engine refused a tick's input; the loop cannot make progress.
    Rejected(String),
    /// The engine hit a fatal fault.
    Fault(String),
}

/// Counters reported when the loop exits cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub ticks: u64,
    pub episodes: u64,
    pub tag_transfers: u64,
}

/// Spawn the tick loop as a tokio task.
/// Returns the command sender, the event receiver and the loop's join handle.
pub fn spawn_driver(
    engine: SharedEngine,
    config: DriverConfig,
) -> (
    mpsc::UnboundedSender<DriverCommand>,
    mpsc::UnboundedReceiver<DriverEvent>,
    JoinHandle<Result<DriverSummary, EngineError>>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(run_tick_loop(engine, config, cmd_rx, event_tx));

    (cmd_tx, event_rx, handle)
}

/// Velocity the built-in `Evade` controller picks for the RL player: the
/// action in `actions` that moves fastest away from the tagger, or towards
/// the nearest runner while tagged.
///
/// Falls back to a full-speed continuous heading when `actions` is empty.
pub fn evade_action(frame: &FrameSnapshot, actions: &[Vector2], max_velocity: f64) -> Vector2 {
    let Some(me) = frame
        .agents
        .iter()
        .position(|a| a.name == frame.rl_player_name)
    else {
        return Vector2::ZERO;
    };
    let agent = &frame.agents[me];

    let heading = if agent.is_tagger() {
        match nearest_runner(&frame.agents, me) {
            Some(target) => frame.agents[target].position - agent.position,
            None => Vector2::ZERO,
        }
    } else {
        match frame.tagger() {
            Some(tagger) => agent.position - tagger.position,
            None => Vector2::ZERO,
        }
    };
    let heading = heading.normalize_or_zero();
    if heading == Vector2::ZERO {
        return Vector2::ZERO;
    }

    let mut best: Option<(Vector2, f64)> = None;
    for action in actions {
        let action = action.clamp_length(max_velocity);
        let progress = action.dot(heading);
        if best.is_none_or(|(_, p)| progress > p) {
            best = Some((action, progress));
        }
    }
    best.map_or(heading * max_velocity, |(action, _)| action)
}

/// Per-run state of the tick loop.
struct Driver {
    engine: SharedEngine,
    controller: RlController,
    reset_on_tagged: bool,
    max_velocity: f64,
    actions: Vec<Vector2>,
    event_tx: mpsc::UnboundedSender<DriverEvent>,
    summary: DriverSummary,
    tagger_index: usize,
    rl_tagged: bool,
}

impl Driver {
    /// Step the engine once with the configured controller.
    fn advance(&self, elapsed_ms: f64) -> Result<Transition, EngineError> {
        match self.controller {
            RlController::External => {
                self.engine.step(elapsed_ms)?;
                Ok(Transition::from(self.engine.observation()?))
            },
            RlController::Idle => self.engine.step_with_action(elapsed_ms, Vector2::ZERO),
            RlController::Evade => {
                let frame = self.engine.frame()?;
                let action = evade_action(&frame, &self.actions, self.max_velocity);
                self.engine.step_with_action(elapsed_ms, action)
            },
        }
    }

    fn tick(&mut self, elapsed_ms: f64) -> Result<(), EngineError> {
        let transition = self.advance(elapsed_ms)?;
        let frame = self.engine.frame()?;
        let tick = frame.tick;
        self.summary.ticks += 1;

        let tagger_index = self.engine.read(|e| e.tagger_index())?;
        if tagger_index != self.tagger_index {
            self.summary.tag_transfers += 1;
            tracing::debug!(tick, from = self.tagger_index, to = tagger_index, "Tag transferred");
            self.tagger_index = tagger_index;
        }
        let _ = self.event_tx.send(DriverEvent::Frame(frame));
        match transition.observation.to_json() {
            Ok(observation_json) => {
                let _ = self.event_tx.send(DriverEvent::Transition {
                    tick,
                    observation_json,
                    reward: transition.reward,
                    terminal: transition.terminal,
                });
            },
            Err(e) => tracing::warn!(tick, error = %e, "Failed to encode observation"),
        }

        if transition.terminal && !self.rl_tagged {
            self.summary.episodes += 1;
            tracing::info!(
                episode = self.summary.episodes,
                tick,
                "RL player tagged, episode over"
            );
            let _ = self.event_tx.send(DriverEvent::EpisodeEnded {
                episode: self.summary.episodes,
                tick,
                reward: transition.reward,
            });
        }
        self.rl_tagged = transition.terminal;

        if self.rl_tagged && self.reset_on_tagged {
            self.engine.reset()?;
            self.tagger_index = self.engine.read(|e| e.tagger_index())?;
            self.rl_tagged = false;
        }
        Ok(())
    }

    fn apply(&self, action: Vector2) {
        if self.controller != RlController::External {
            tracing::debug!(controller = ?self.controller, "Ignoring RL action from channel");
            return;
        }
        if let Err(e) = self.engine.set_rl_action(action) {
            tracing::warn!(error = %e, "Dropped RL action");
        }
    }
}

/// Drive the engine at the configured tick rate until stopped, the tick limit
/// is reached, or the engine faults.
async fn run_tick_loop(
    engine: SharedEngine,
    config: DriverConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<DriverCommand>,
    event_tx: mpsc::UnboundedSender<DriverEvent>,
) -> Result<DriverSummary, EngineError> {
    config.validate()?;
    if engine.state() == EngineState::Uninitialized {
        engine.initialize()?;
    }
    let (max_velocity, tagger_index) =
        engine.read(|e| (e.config().max_velocity, e.tagger_index()))?;

    let mut driver = Driver {
        engine,
        controller: config.rl_controller,
        reset_on_tagged: config.reset_on_tagged,
        max_velocity,
        actions: action_space(max_velocity),
        event_tx,
        summary: DriverSummary::default(),
        tagger_index,
        rl_tagged: false,
    };

    let interval_ms = config.tick_interval_ms();
    let mut interval = tokio::time::interval(Duration::from_secs_f64(interval_ms / 1000.0));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    tracing::info!(
        tick_rate_hz = config.tick_rate_hz,
        controller = ?config.rl_controller,
        "Tick loop started"
    );

    let reason = loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let elapsed_ms = if config.fixed_timestep {
                    interval_ms
                } else {
                    now.duration_since(last_tick).as_secs_f64() * 1000.0
                };
                last_tick = now;

                match driver.tick(elapsed_ms) {
                    Ok(()) => {},
                    Err(EngineError::InvalidState { state: EngineState::Terminated, .. }) => {
                        break StopReason::Terminated;
                    },
                    Err(e) => {
                        tracing::error!(
                            tick = driver.summary.ticks,
                            error = %e,
                            fatal = e.is_fatal(),
                            "Engine error, stopping"
                        );
                        let reason = if e.is_fatal() {
                            StopReason::Fault(e.to_string())
                        } else {
                            StopReason::Rejected(e.to_string())
                        };
                        driver.engine.terminate();
                        let _ = driver.event_tx.send(DriverEvent::Stopped(reason));
                        return Err(e);
                    },
                }

                if config.max_ticks.is_some_and(|max| driver.summary.ticks >= max) {
                    break StopReason::TickLimit;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(DriverCommand::SetAction(action)) => driver.apply(action),
                    Some(DriverCommand::ActionJson(json)) => match RlAction::parse(&json) {
                        Ok(action) => driver.apply(action),
                        Err(e) => tracing::warn!(error = %e, "Dropped malformed RL action"),
                    },
                    Some(DriverCommand::Stop) | None => break StopReason::Requested,
                }
            }
        }
    };

    driver.engine.terminate();
    tracing::info!(
        reason = ?reason,
        ticks = driver.summary.ticks,
        episodes = driver.summary.episodes,
        tag_transfers = driver.summary.tag_transfers,
        "Tick loop stopped"
    );
    let _ = driver.event_tx.send(DriverEvent::Stopped(reason));
    Ok(driver.summary)
}
