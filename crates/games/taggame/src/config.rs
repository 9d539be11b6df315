use serde::{Deserialize, Serialize};

use taggame_core::EngineError;

/// Data-driven configuration for a tag engine. Fixed for the engine's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Name of the externally controlled agent.
    pub rl_player_name: String,
    /// Total number of agents, the RL player included.
    pub player_count: usize,
    /// Radius shared by every agent (units).
    pub player_radius: f64,
    /// Arena width (units).
    pub arena_width: f64,
    /// Arena height (units).
    pub arena_height: f64,
    /// Simulation time per wall-clock millisecond.
    pub time_coefficient: f64,
    /// Speed limit applied to every agent (units per simulation time unit).
    pub max_velocity: f64,
    /// Minimum wall-clock dwell time of a tagger before the role can move again (ms).
    pub tagger_sleep_ms: f64,
    /// Roster index that starts as the tagger. Index 0 is the RL player.
    pub initial_tagger: usize,
    /// Seed for the spawn ring rotation.
    pub spawn_seed: u64,
    /// Fraction of `max_velocity` a chasing tagger moves at.
    pub pursuit_speed_fraction: f64,
    /// Fraction of `max_velocity` a fleeing chaser moves at.
    pub flee_speed_fraction: f64,
    /// Distance from a wall at which fleeing chasers start steering away from it.
    pub wall_avoid_margin: f64,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            rl_player_name: "agent".to_string(),
            player_count: 4,
            player_radius: 10.0,
            arena_width: 800.0,
            arena_height: 600.0,
            time_coefficient: 0.05,
            max_velocity: 5.0,
            tagger_sleep_ms: 1000.0,
            initial_tagger: 1,
            spawn_seed: 0,
            pursuit_speed_fraction: 1.0,
            flee_speed_fraction: 0.8,
            wall_avoid_margin: 30.0,
        }
    }
}

/// Name given to the chaser at roster index `index` (1-based among chasers).
pub fn chaser_name(index: usize) -> String {
    format!("chaser-{index}")
}

impl TagConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        let path =
            std::env::var("TAGGAME_CONFIG").unwrap_or_else(|_| "config/taggame.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<TagConfig>(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    TagConfig::default()
                },
            },
            Err(_) => TagConfig::default(),
        }
    }

    /// Whether `rl_player_name` is one of the generated chaser names.
    fn rl_name_collides(&self) -> bool {
        self.rl_player_name
            .strip_prefix("chaser-")
            .and_then(|suffix| suffix.parse::<usize>().ok())
            .is_some_and(|i| {
                (1..self.player_count).contains(&i) && chaser_name(i) == self.rl_player_name
            })
    }

    /// Check every construction parameter, naming the first offender.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.rl_player_name.trim().is_empty() {
            return Err(invalid("rl_player_name must not be empty"));
        }
        if self.player_count < 2 {
            return Err(invalid(format!(
                "player_count must be at least 2, got {}",
                self.player_count
            )));
        }
        if self.rl_name_collides() {
            return Err(invalid(format!(
                "rl_player_name {:?} collides with a chaser name",
                self.rl_player_name
            )));
        }
        positive("player_radius", self.player_radius)?;
        positive("arena_width", self.arena_width)?;
        positive("arena_height", self.arena_height)?;
        positive("time_coefficient", self.time_coefficient)?;
        positive("max_velocity", self.max_velocity)?;
        non_negative("tagger_sleep_ms", self.tagger_sleep_ms)?;
        non_negative("wall_avoid_margin", self.wall_avoid_margin)?;

        let diameter = self.player_radius * 2.0;
        if self.arena_width < diameter || self.arena_height < diameter {
            return Err(invalid(format!(
                "arena {}x{} cannot hold a player of radius {}",
                self.arena_width, self.arena_height, self.player_radius
            )));
        }
        if self.initial_tagger >= self.player_count {
            return Err(invalid(format!(
                "initial_tagger {} out of range for {} players",
                self.initial_tagger, self.player_count
            )));
        }
        for (name, fraction) in [
            ("pursuit_speed_fraction", self.pursuit_speed_fraction),
            ("flee_speed_fraction", self.flee_speed_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(invalid(format!("{name} must be in (0, 1], got {fraction}")));
            }
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidInput(msg.into())
}

fn positive(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and > 0, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and >= 0, got {value}")))
    }
}
