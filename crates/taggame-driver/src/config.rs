use std::str::FromStr;

use serde::Deserialize;

use taggame::config::TagConfig;
use taggame_core::EngineError;

/// Top-level driver configuration, loaded from `taggame.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Ticks per wall-clock second.
    pub tick_rate_hz: f64,
    /// Feed every tick exactly `1000 / tick_rate_hz` ms instead of the
    /// measured wall-clock time since the previous tick.
    pub fixed_timestep: bool,
    /// Stop after this many ticks. Runs until interrupted when unset.
    pub max_ticks: Option<u64>,
    pub rl_controller: RlController,
    /// Start a new episode as soon as the RL player is tagged.
    pub reset_on_tagged: bool,
    /// Append every frame to this file as it is produced.
    pub record_path: Option<String>,
    pub engine: TagConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            fixed_timestep: true,
            max_ticks: None,
            rl_controller: RlController::Evade,
            reset_on_tagged: true,
            record_path: None,
            engine: TagConfig::default(),
        }
    }
}

/// What drives the RL player when no external controller is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RlController {
    /// Stand still.
    Idle,
    /// Run from the tagger, or chase the nearest runner while tagged.
    #[default]
    Evade,
    /// Only actions sent through the driver's command channel move the player.
    External,
}

impl FromStr for RlController {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "evade" => Ok(Self::Evade),
            "external" => Ok(Self::External),
            other => Err(EngineError::InvalidInput(format!(
                "unknown rl_controller {other:?}"
            ))),
        }
    }
}

impl DriverConfig {
    /// Wall-clock length of one tick in milliseconds.
    pub fn tick_interval_ms(&self) -> f64 {
        1000.0 / self.tick_rate_hz
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "tick_rate_hz must be positive and finite, got {}",
                self.tick_rate_hz
            )));
        }
        if self.max_ticks == Some(0) {
            return Err(EngineError::InvalidInput(
                "max_ticks must be > 0 when set".to_string(),
            ));
        }
        self.engine.validate()
    }

    /// Load config from `taggame.toml` (or `$TAGGAME_DRIVER_CONFIG`) if it
    /// exists, then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("TAGGAME_DRIVER_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "taggame.toml".to_string());

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<DriverConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    DriverConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                DriverConfig::default()
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `TAGGAME_*` overrides. Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("TAGGAME_TICK_RATE") {
            match val.parse::<f64>() {
                Ok(hz) => self.tick_rate_hz = hz,
                Err(_) => tracing::warn!(value = %val, "Ignoring invalid TAGGAME_TICK_RATE"),
            }
        }
        if let Some(val) = var("TAGGAME_MAX_TICKS") {
            match val.parse::<u64>() {
                Ok(n) => self.max_ticks = Some(n),
                Err(_) => tracing::warn!(value = %val, "Ignoring invalid TAGGAME_MAX_TICKS"),
            }
        }
        if let Some(val) = var("TAGGAME_FIXED_TIMESTEP")
            && let Ok(fixed) = val.parse::<bool>()
        {
            self.fixed_timestep = fixed;
        }
        if let Some(val) = var("TAGGAME_RL_CONTROLLER") {
            match val.parse::<RlController>() {
                Ok(controller) => self.rl_controller = controller,
                Err(e) => tracing::warn!("Ignoring TAGGAME_RL_CONTROLLER: {e}"),
            }
        }
        if let Some(val) = var("TAGGAME_RL_PLAYER")
            && !val.is_empty()
        {
            self.engine.rl_player_name = val;
        }
        if let Some(val) = var("TAGGAME_PLAYERS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.engine.player_count = n;
        }
        if let Some(val) = var("TAGGAME_RECORD") {
            self.record_path = Some(val).filter(|p| !p.is_empty());
        }
        if let Some(val) = var("TAGGAME_SPAWN_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            self.engine.spawn_seed = seed;
        }
    }
}
