use serde::{Deserialize, Serialize};

use taggame_core::{AgentSnapshot, Role, Vector2};

use crate::steering::{self, SteeringContext};

/// How an agent decides where to go each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Built-in pursuit/flee heuristic.
    Chaser,
    /// Velocity supplied from outside the engine (the RL player).
    External { action: Vector2 },
}

/// Mutable state of a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPlayer {
    pub name: String,
    pub position: Vector2,
    pub velocity: Vector2,
    pub radius: f64,
    pub role: Role,
    pub control: ControlMode,
}

impl TagPlayer {
    pub fn chaser(name: impl Into<String>, position: Vector2, radius: f64) -> Self {
        Self {
            name: name.into(),
            position,
            velocity: Vector2::ZERO,
            radius,
            role: Role::Runner,
            control: ControlMode::Chaser,
        }
    }

    pub fn external(name: impl Into<String>, position: Vector2, radius: f64) -> Self {
        Self {
            name: name.into(),
            position,
            velocity: Vector2::ZERO,
            radius,
            role: Role::Runner,
            control: ControlMode::External {
                action: Vector2::ZERO,
            },
        }
    }

    pub fn is_externally_controlled(&self) -> bool {
        matches!(self.control, ControlMode::External { .. })
    }

    pub fn is_tagger(&self) -> bool {
        self.role == Role::Tagger
    }

    /// Whether the two footprints touch or overlap.
    pub fn touches(&self, other: &TagPlayer) -> bool {
        self.position.distance(other.position) <= self.radius + other.radius
    }

    /// Replace the pending action of an externally controlled player.
    /// Returns false (and changes nothing) for chasers.
    pub fn set_action(&mut self, action: Vector2) -> bool {
        match &mut self.control {
            ControlMode::External { action: pending } => {
                *pending = action;
                true
            },
            ControlMode::Chaser => false,
        }
    }

    /// Velocity this agent wants for the coming tick, before clamping.
    pub fn compute_desired_velocity(&self, ctx: &SteeringContext<'_>) -> Vector2 {
        match self.control {
            ControlMode::External { action } => action,
            ControlMode::Chaser => steering::chaser_velocity(ctx),
        }
    }

    /// Clamp the desired velocity to `max_velocity` and integrate position over `dt`.
    pub fn advance(&mut self, dt: f64, desired_velocity: Vector2, max_velocity: f64) {
        self.velocity = desired_velocity.clamp_length(max_velocity);
        self.position = self.position + self.velocity * dt;
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            name: self.name.clone(),
            position: self.position,
            velocity: self.velocity,
            radius: self.radius,
            role: self.role,
        }
    }
}
