pub mod arena;
pub mod config;
pub mod observation;
pub mod player;
pub mod shared;
pub mod steering;

use taggame_core::{AgentSnapshot, EngineError, EngineState, FrameSnapshot, Role, Vector2};

use arena::Arena;
use config::{TagConfig, chaser_name};
use observation::{Observation, Transition};
use player::TagPlayer;
use steering::SteeringContext;

/// Relative slack on the speed limit absorbing rounding in the clamp.
const SPEED_TOLERANCE: f64 = 1e-9;

/// Roster index of the externally controlled player.
const RL_INDEX: usize = 0;

/// The tag simulation: one RL-controlled agent and a pack of chasers in a
/// walled arena, with a single tagger role that moves on contact.
#[derive(Debug, Clone)]
pub struct TagEngine {
    config: TagConfig,
    arena: Arena,
    players: Vec<TagPlayer>,
    tagger_index: usize,
    cooldown_remaining: f64,
    state: EngineState,
    tick: u64,
}

impl TagEngine {
    pub fn new(config: TagConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let arena = Arena::new(config.arena_width, config.arena_height);
        // Surface crowded arenas here rather than at initialize()
        arena.spawn_points(config.player_count, config.player_radius, config.spawn_seed)?;
        Ok(Self {
            arena,
            players: Vec::with_capacity(config.player_count),
            tagger_index: config.initial_tagger,
            cooldown_remaining: config.tagger_sleep_ms,
            state: EngineState::Uninitialized,
            tick: 0,
            config,
        })
    }

    /// Build an engine from `TagConfig::load()`.
    pub fn load() -> Result<Self, EngineError> {
        Self::new(TagConfig::load())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &TagConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn cooldown_remaining(&self) -> f64 {
        self.cooldown_remaining
    }

    pub fn rl_player_name(&self) -> &str {
        &self.config.rl_player_name
    }

    /// Roster index of the current tagger.
    pub fn tagger_index(&self) -> usize {
        self.tagger_index
    }

    /// Place the roster and start the game.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            return Err(EngineError::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }
        self.place_players()?;
        self.state = EngineState::Running;
        tracing::info!(
            players = self.players.len(),
            tagger = %self.players[self.tagger_index].name,
            width = self.arena.width,
            height = self.arena.height,
            "Tag engine initialized"
        );
        Ok(())
    }

    /// Start a fresh episode: original placement, initial tagger, full cooldown.
    pub fn reset(&mut self) -> Result<Observation, EngineError> {
        self.ensure_running("reset")?;
        self.place_players()?;
        tracing::info!("Tag engine reset");
        Ok(self.build_observation())
    }

    /// Stop the engine for good. Always succeeds.
    pub fn terminate(&mut self) {
        if self.state != EngineState::Terminated {
            tracing::info!(tick = self.tick, "Tag engine terminated");
        }
        self.state = EngineState::Terminated;
    }

    /// Set the velocity the RL player requests for the coming ticks.
    /// The action stays in effect until replaced.
    pub fn set_rl_action(&mut self, action: Vector2) -> Result<(), EngineError> {
        self.ensure_running("set_rl_action")?;
        validate_action(action)?;
        self.players[RL_INDEX].set_action(action);
        Ok(())
    }

    /// Advance the simulation by `elapsed_ms` of wall-clock time.
    pub fn step(&mut self, elapsed_ms: f64) -> Result<(), EngineError> {
        self.ensure_running("step")?;
        let dt = self.sim_time(elapsed_ms)?;
        self.move_players(dt);

        self.cooldown_remaining = (self.cooldown_remaining - elapsed_ms).max(0.0);
        if self.cooldown_remaining <= 0.0
            && let Some(runner) = self.first_contact()
        {
            self.transfer_tagger(runner);
        }
        self.tick += 1;

        if let Err(e) = self.check_invariants() {
            tracing::error!(tick = self.tick, error = %e, "Tag engine fault, terminating");
            self.state = EngineState::Terminated;
            return Err(e);
        }
        Ok(())
    }

    /// Set the RL action and advance one tick, reporting what the RL player saw.
    pub fn step_with_action(
        &mut self,
        elapsed_ms: f64,
        action: Vector2,
    ) -> Result<Transition, EngineError> {
        self.ensure_running("step")?;
        validate_action(action)?;
        self.sim_time(elapsed_ms)?;
        self.players[RL_INDEX].set_action(action);
        self.step(elapsed_ms)?;
        Ok(Transition::from(self.build_observation()))
    }

    /// Copy of every agent's state in roster order.
    pub fn snapshot_all(&self) -> Result<Vec<AgentSnapshot>, EngineError> {
        self.ensure_running("snapshot")?;
        Ok(self.players.iter().map(TagPlayer::snapshot).collect())
    }

    /// Everything an observer needs to draw the current tick.
    pub fn frame(&self) -> Result<FrameSnapshot, EngineError> {
        Ok(FrameSnapshot {
            tick: self.tick,
            agents: self.snapshot_all()?,
            arena_width: self.arena.width,
            arena_height: self.arena.height,
            rl_player_name: self.config.rl_player_name.clone(),
            cooldown_remaining_ms: self.cooldown_remaining,
        })
    }

    /// The RL player's view of the current tick.
    pub fn observation(&self) -> Result<Observation, EngineError> {
        self.ensure_running("observe")?;
        Ok(self.build_observation())
    }

    /// Simulation time covered by `elapsed_ms` of wall-clock time.
    fn sim_time(&self, elapsed_ms: f64) -> Result<f64, EngineError> {
        validate_elapsed(elapsed_ms)?;
        let dt = elapsed_ms * self.config.time_coefficient;
        if !dt.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "elapsed time {elapsed_ms} overflows simulation time at coefficient {}",
                self.config.time_coefficient
            )));
        }
        Ok(dt)
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.state == EngineState::Running {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn place_players(&mut self) -> Result<(), EngineError> {
        let radius = self.config.player_radius;
        let spawns =
            self.arena
                .spawn_points(self.config.player_count, radius, self.config.spawn_seed)?;

        self.players = spawns
            .into_iter()
            .enumerate()
            .map(|(i, pos)| {
                if i == RL_INDEX {
                    TagPlayer::external(self.config.rl_player_name.clone(), pos, radius)
                } else {
                    TagPlayer::chaser(chaser_name(i), pos, radius)
                }
            })
            .collect();

        self.tagger_index = self.config.initial_tagger;
        self.players[self.tagger_index].role = Role::Tagger;
        self.cooldown_remaining = self.config.tagger_sleep_ms;
        self.tick = 0;
        Ok(())
    }

    /// Steer, integrate and wall-clamp every player in roster order. Steering
    /// reads the start-of-tick roster only.
    fn move_players(&mut self, dt: f64) {
        let start: Vec<AgentSnapshot> = self.players.iter().map(TagPlayer::snapshot).collect();
        let max_velocity = self.config.max_velocity;
        let tagger_resting = self.cooldown_remaining > 0.0;

        for i in 0..self.players.len() {
            let ctx = SteeringContext {
                agents: &start,
                me: i,
                arena: &self.arena,
                max_velocity,
                dt,
                tagger_resting,
                pursuit_speed_fraction: self.config.pursuit_speed_fraction,
                flee_speed_fraction: self.config.flee_speed_fraction,
                wall_avoid_margin: self.config.wall_avoid_margin,
            };
            let desired = self.players[i].compute_desired_velocity(&ctx);

            let player = &mut self.players[i];
            player.advance(dt, desired, max_velocity);
            let (position, velocity) =
                self.arena
                    .resolve_boundary(player.position, player.radius, player.velocity);
            player.position = position;
            player.velocity = velocity;
        }
    }

    /// First runner in roster order touching the tagger.
    fn first_contact(&self) -> Option<usize> {
        let tagger = &self.players[self.tagger_index];
        self.players
            .iter()
            .enumerate()
            .find_map(|(i, p)| (i != self.tagger_index && p.touches(tagger)).then_some(i))
    }

    fn transfer_tagger(&mut self, to: usize) {
        let from = self.tagger_index;
        self.players[from].role = Role::Runner;
        self.players[to].role = Role::Tagger;
        self.tagger_index = to;
        self.cooldown_remaining = self.config.tagger_sleep_ms;
        tracing::debug!(
            tick = self.tick,
            from = %self.players[from].name,
            to = %self.players[to].name,
            "Tagger role transferred"
        );
    }

    fn build_observation(&self) -> Observation {
        let rl = &self.players[RL_INDEX];
        let tagger = &self.players[self.tagger_index];
        Observation {
            my_position: rl.position,
            my_velocity: rl.velocity,
            tagger_position: tagger.position,
            tagger_velocity: tagger.velocity,
            tagged: rl.is_tagger(),
        }
    }

    fn check_invariants(&self) -> Result<(), EngineError> {
        let fault = |msg: String| Err(EngineError::InvariantViolation(msg));

        let taggers = self.players.iter().filter(|p| p.is_tagger()).count();
        if taggers != 1 || !self.players[self.tagger_index].is_tagger() {
            return fault(format!(
                "expected one tagger at index {}, found {taggers}",
                self.tagger_index
            ));
        }
        if !(0.0..=self.config.tagger_sleep_ms).contains(&self.cooldown_remaining) {
            return fault(format!(
                "cooldown {} outside [0, {}]",
                self.cooldown_remaining, self.config.tagger_sleep_ms
            ));
        }

        let max_speed = self.config.max_velocity * (1.0 + SPEED_TOLERANCE);
        for p in &self.players {
            if !p.position.is_finite() || !p.velocity.is_finite() {
                return fault(format!("{} has non-finite state", p.name));
            }
            let speed = p.velocity.length();
            if speed > max_speed {
                return fault(format!(
                    "{} speed {speed} exceeds {}",
                    p.name, self.config.max_velocity
                ));
            }
            if !self.arena.contains(p.position, p.radius) {
                return fault(format!(
                    "{} at ({}, {}) is outside the arena",
                    p.name, p.position.x, p.position.y
                ));
            }
        }

        let rl_name = &self.config.rl_player_name;
        let rl_matches = self.players.iter().filter(|p| &p.name == rl_name).count();
        if self.players[RL_INDEX].name != *rl_name
            || rl_matches != 1
            || !self.players[RL_INDEX].is_externally_controlled()
        {
            return fault(format!("roster does not hold exactly one {rl_name:?}"));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl TagEngine {
    /// Overwrite a player's position with no validation, for exercising the
    /// invariant check.
    pub fn force_position(&mut self, index: usize, position: Vector2) {
        self.players[index].position = position;
    }
}

fn validate_elapsed(elapsed_ms: f64) -> Result<(), EngineError> {
    if elapsed_ms.is_finite() && elapsed_ms >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "elapsed time must be finite and >= 0, got {elapsed_ms}"
        )))
    }
}

fn validate_action(action: Vector2) -> Result<(), EngineError> {
    if action.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "action must be finite, got ({}, {})",
            action.x, action.y
        )))
    }
}
