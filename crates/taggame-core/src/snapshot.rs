use serde::{Deserialize, Serialize};

use crate::vector::Vector2;

/// Role an agent holds in the game of tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Runner,
    Tagger,
}

/// Point-in-time copy of one agent's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub position: Vector2,
    pub velocity: Vector2,
    pub radius: f64,
    pub role: Role,
}

impl AgentSnapshot {
    pub fn is_tagger(&self) -> bool {
        self.role == Role::Tagger
    }
}

/// Everything an observer needs to draw one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub agents: Vec<AgentSnapshot>,
    pub arena_width: f64,
    pub arena_height: f64,
    pub rl_player_name: String,
    pub cooldown_remaining_ms: f64,
}

impl FrameSnapshot {
    pub fn tagger(&self) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.is_tagger())
    }

    pub fn rl_player(&self) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.name == self.rl_player_name)
    }

    /// MessagePack encoding, as stored in frame recordings.
    pub fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str, x: f64, y: f64, role: Role) -> AgentSnapshot {
        AgentSnapshot {
            name: name.to_string(),
            position: Vector2::new(x, y),
            velocity: Vector2::ZERO,
            radius: 10.0,
            role,
        }
    }

    #[test]
    fn frame_lookups() {
        let frame = FrameSnapshot {
            tick: 3,
            agents: vec![
                agent("agent", 10.0, 10.0, Role::Runner),
                agent("chaser-1", 50.0, 50.0, Role::Tagger),
            ],
            arena_width: 800.0,
            arena_height: 600.0,
            rl_player_name: "agent".to_string(),
            cooldown_remaining_ms: 0.0,
        };
        assert_eq!(frame.tagger().map(|a| a.name.as_str()), Some("chaser-1"));
        assert_eq!(frame.rl_player().map(|a| a.name.as_str()), Some("agent"));
    }

    #[test]
    fn truncated_frame_fails_to_decode() {
        let frame = FrameSnapshot {
            tick: 1,
            agents: vec![agent("agent", 1.0, 2.0, Role::Tagger)],
            arena_width: 100.0,
            arena_height: 100.0,
            rl_player_name: "agent".to_string(),
            cooldown_remaining_ms: 12.5,
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(FrameSnapshot::decode(&bytes).unwrap(), frame);
        assert!(FrameSnapshot::decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
