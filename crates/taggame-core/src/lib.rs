pub mod error;
pub mod lifecycle;
pub mod snapshot;
pub mod vector;

pub use error::EngineError;
pub use lifecycle::EngineState;
pub use snapshot::{AgentSnapshot, FrameSnapshot, Role};
pub use vector::Vector2;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::snapshot::{AgentSnapshot, FrameSnapshot, Role};
    use crate::vector::Vector2;

    /// Relative slack allowed on the speed limit for rounding in the clamp.
    pub const SPEED_TOLERANCE: f64 = 1e-9;

    /// Build a stationary agent snapshot.
    pub fn make_agent(name: &str, x: f64, y: f64, radius: f64, role: Role) -> AgentSnapshot {
        AgentSnapshot {
            name: name.to_string(),
            position: Vector2::new(x, y),
            velocity: Vector2::ZERO,
            radius,
            role,
        }
    }

    // ================================================================
    // Frame Invariant Checks
    // ================================================================
    // Engine crates call these after init and after every step in their
    // own tests so the laws are phrased once.

    /// Exactly one agent holds the tagger role.
    pub fn assert_single_tagger(frame: &FrameSnapshot) {
        let taggers = frame.agents.iter().filter(|a| a.is_tagger()).count();
        assert_eq!(
            taggers, 1,
            "Expected exactly one tagger at tick {}, found {taggers}",
            frame.tick
        );
    }

    /// Every footprint lies inside `[0,width]x[0,height]`.
    pub fn assert_in_bounds(frame: &FrameSnapshot) {
        for a in &frame.agents {
            let p = a.position;
            assert!(
                p.x >= a.radius
                    && p.x <= frame.arena_width - a.radius
                    && p.y >= a.radius
                    && p.y <= frame.arena_height - a.radius,
                "Agent {} at ({}, {}) r={} leaves arena {}x{} at tick {}",
                a.name,
                p.x,
                p.y,
                a.radius,
                frame.arena_width,
                frame.arena_height,
                frame.tick
            );
        }
    }

    /// No two footprints overlap.
    pub fn assert_no_overlap(frame: &FrameSnapshot) {
        for (i, a) in frame.agents.iter().enumerate() {
            for b in &frame.agents[i + 1..] {
                let dist = a.position.distance(b.position);
                assert!(
                    dist > a.radius + b.radius,
                    "Agents {} and {} overlap: distance = {dist}",
                    a.name,
                    b.name
                );
            }
        }
    }

    /// Every agent's speed is within `max_velocity`.
    pub fn assert_speeds_within(frame: &FrameSnapshot, max_velocity: f64) {
        for a in &frame.agents {
            let speed = a.velocity.length();
            assert!(
                speed <= max_velocity * (1.0 + SPEED_TOLERANCE),
                "Agent {} speed {speed} exceeds {max_velocity} at tick {}",
                a.name,
                frame.tick
            );
        }
    }

    /// Index of the tagger in roster order.
    pub fn tagger_index(frame: &FrameSnapshot) -> usize {
        frame
            .agents
            .iter()
            .position(|a| a.is_tagger())
            .unwrap_or_else(|| panic!("No tagger at tick {}", frame.tick))
    }

}
