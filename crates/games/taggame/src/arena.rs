use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use taggame_core::{EngineError, Vector2};

/// Rectangular play area spanning `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

impl Arena {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Whether a circle of `radius` at `position` lies fully inside the arena.
    pub fn contains(&self, position: Vector2, radius: f64) -> bool {
        position.x >= radius
            && position.x <= self.width - radius
            && position.y >= radius
            && position.y <= self.height - radius
    }

    /// Clamp a circular footprint back inside the walls.
    ///
    /// Each axis is handled on its own: a footprint crossing a wall is pushed
    /// back to touch it and the velocity on that axis is reflected. Applying
    /// this twice is the same as applying it once.
    pub fn resolve_boundary(
        &self,
        position: Vector2,
        radius: f64,
        velocity: Vector2,
    ) -> (Vector2, Vector2) {
        let (x, vx) = resolve_axis(position.x, velocity.x, radius, self.width);
        let (y, vy) = resolve_axis(position.y, velocity.y, radius, self.height);
        (Vector2::new(x, y), Vector2::new(vx, vy))
    }

    /// Starting positions for `count` agents evenly spaced on a ring around the
    /// arena center, rotated by a seeded offset.
    ///
    /// Neighbouring circles keep at least one radius of clearance between
    /// footprints, and every footprint keeps one radius of clearance from the walls.
    pub fn spawn_points(
        &self,
        count: usize,
        radius: f64,
        seed: u64,
    ) -> Result<Vec<Vector2>, EngineError> {
        let center = self.center();
        if count == 0 {
            return Ok(Vec::new());
        }
        if count == 1 {
            return Ok(vec![center]);
        }

        let ring = self.width.min(self.height) / 2.0 - radius * 2.0;
        let chord = 2.0 * ring * (std::f64::consts::PI / count as f64).sin();
        let required = radius * 3.0;
        if ring <= 0.0 || chord < required {
            return Err(EngineError::InvalidInput(format!(
                "arena {}x{} cannot place {count} players of radius {radius} without overlap",
                self.width, self.height
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let offset = rng.random_range(0.0..std::f64::consts::TAU);

        let points = (0..count)
            .map(|i| {
                let angle = offset + std::f64::consts::TAU * (i as f64) / (count as f64);
                Vector2::new(
                    center.x + ring * angle.cos(),
                    center.y + ring * angle.sin(),
                )
            })
            .collect();
        Ok(points)
    }
}

fn resolve_axis(coord: f64, velocity: f64, radius: f64, extent: f64) -> (f64, f64) {
    if coord < radius {
        (radius, -velocity)
    } else if coord > extent - radius {
        (extent - radius, -velocity)
    } else {
        (coord, velocity)
    }
}
