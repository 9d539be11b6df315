use serde::{Deserialize, Serialize};

use taggame_core::{EngineError, Vector2};

/// Reward for a tick that ends with the RL player still free.
pub const FREE_REWARD: f64 = 1.0;
/// Reward for a tick that ends with the RL player holding the tagger role.
pub const TAGGED_REWARD: f64 = -1.0;

/// What the RL controller sees after each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "mp", with = "pair")]
    pub my_position: Vector2,
    #[serde(rename = "mv", with = "pair")]
    pub my_velocity: Vector2,
    #[serde(rename = "tp", with = "pair")]
    pub tagger_position: Vector2,
    #[serde(rename = "tv", with = "pair")]
    pub tagger_velocity: Vector2,
    /// Whether the RL player is the tagger.
    #[serde(rename = "t")]
    pub tagged: bool,
}

impl Observation {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn reward(&self) -> f64 {
        if self.tagged { TAGGED_REWARD } else { FREE_REWARD }
    }

    /// An episode ends once the RL player has been tagged.
    pub fn is_terminal(&self) -> bool {
        self.tagged
    }
}

/// Result of feeding one action through one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Observation,
    pub reward: f64,
    pub terminal: bool,
}

impl From<Observation> for Transition {
    fn from(observation: Observation) -> Self {
        Self {
            reward: observation.reward(),
            terminal: observation.is_terminal(),
            observation,
        }
    }
}

/// Action message sent by an RL controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RlAction {
    pub x: f64,
    pub y: f64,
}

impl RlAction {
    pub fn parse(json: &str) -> Result<Vector2, EngineError> {
        let action: RlAction = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidInput(format!("malformed action: {e}")))?;
        Ok(Vector2::new(action.x, action.y))
    }
}

/// Every integer velocity with components in `[-max, max]` except standing still.
pub fn action_space(max_velocity: f64) -> Vec<Vector2> {
    let max = max_velocity.floor() as i64;
    let mut actions = Vec::new();
    for ax in -max..=max {
        for ay in -max..=max {
            if ax != 0 || ay != 0 {
                actions.push(Vector2::new(ax as f64, ay as f64));
            }
        }
    }
    actions
}

/// Encodes a vector as a two-element `[x, y]` array.
mod pair {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use taggame_core::Vector2;

    pub fn serialize<S: Serializer>(v: &Vector2, serializer: S) -> Result<S::Ok, S::Error> {
        (v.x, v.y).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vector2, D::Error> {
        Ok(<(f64, f64)>::deserialize(deserializer)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(tagged: bool) -> Observation {
        Observation {
            my_position: Vector2::new(10.0, 20.0),
            my_velocity: Vector2::new(1.0, -1.0),
            tagger_position: Vector2::new(300.0, 200.0),
            tagger_velocity: Vector2::new(-2.0, 0.5),
            tagged,
        }
    }

    #[test]
    fn json_uses_compact_keys_and_pairs() {
        let json = observation(false).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mp"], serde_json::json!([10.0, 20.0]));
        assert_eq!(value["tv"], serde_json::json!([-2.0, 0.5]));
        assert_eq!(value["t"], serde_json::json!(false));
    }

    #[test]
    fn reward_and_terminal_follow_tagged_flag() {
        let free = Transition::from(observation(false));
        assert_eq!(free.reward, FREE_REWARD);
        assert!(!free.terminal);

        let tagged = Transition::from(observation(true));
        assert_eq!(tagged.reward, TAGGED_REWARD);
        assert!(tagged.terminal);
    }

    #[test]
    fn parse_action_json() {
        assert_eq!(
            RlAction::parse(r#"{"x": 3, "y": -2}"#).unwrap(),
            Vector2::new(3.0, -2.0)
        );
    }

    #[test]
    fn malformed_action_is_invalid_input() {
        assert!(matches!(
            RlAction::parse(r#"{"x": "fast"}"#),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn action_space_excludes_standing_still() {
        let actions = action_space(5.0);
        assert_eq!(actions.len(), 11 * 11 - 1);
        assert!(!actions.contains(&Vector2::ZERO));
        assert!(actions.contains(&Vector2::new(-5.0, 5.0)));
    }

    #[test]
    fn action_space_floors_fractional_limit() {
        assert_eq!(action_space(1.9).len(), 8);
    }
}
