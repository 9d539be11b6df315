use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D coordinate or displacement in arena units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vector2) -> f64 {
        (self - other).length()
    }

    pub fn dot(self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for a (near) zero vector.
    pub fn normalize_or_zero(self) -> Vector2 {
        let len = self.length();
        if len <= f64::EPSILON || !len.is_finite() {
            return Vector2::ZERO;
        }
        Vector2::new(self.x / len, self.y / len)
    }

    /// Scale the vector down so its length does not exceed `max`.
    /// Vectors already within the limit are returned unchanged.
    pub fn clamp_length(self, max: f64) -> Vector2 {
        let len = self.length();
        if len <= max {
            return self;
        }
        self * (max / len)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;

    fn mul(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;

    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((x, y): (f64, f64)) -> Self {
        Vector2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
        assert!((b.distance(a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        assert_eq!(Vector2::ZERO.normalize_or_zero(), Vector2::ZERO);
    }

    #[test]
    fn normalize_gives_unit_length() {
        let n = Vector2::new(-7.0, 2.5).normalize_or_zero();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clamp_length_leaves_short_vectors_alone() {
        let v = Vector2::new(1.0, 1.0);
        assert_eq!(v.clamp_length(5.0), v);
    }

    #[test]
    fn clamp_length_scales_long_vectors() {
        let v = Vector2::new(30.0, 40.0).clamp_length(5.0);
        assert!((v.length() - 5.0).abs() < 1e-9);
        // Direction is preserved
        assert!((v.x / v.y - 0.75).abs() < 1e-12);
    }

    #[test]
    fn arithmetic_operators() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(0.5, -1.0);
        assert_eq!(a + b, Vector2::new(1.5, 1.0));
        assert_eq!(a - b, Vector2::new(0.5, 3.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        assert_eq!(-a, Vector2::new(-1.0, -2.0));
        assert!((a.dot(b) - (-1.5)).abs() < 1e-12);
    }

    #[test]
    fn non_finite_detected() {
        assert!(Vector2::new(1.0, 2.0).is_finite());
        assert!(!Vector2::new(f64::NAN, 0.0).is_finite());
        assert!(!Vector2::new(0.0, f64::INFINITY).is_finite());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamp_length_never_exceeds_limit(
                x in -1.0e6f64..1.0e6,
                y in -1.0e6f64..1.0e6,
                max in 0.01f64..100.0,
            ) {
                let clamped = Vector2::new(x, y).clamp_length(max);
                prop_assert!(
                    clamped.length() <= max * (1.0 + 1e-9),
                    "clamped length {} exceeds {}",
                    clamped.length(),
                    max
                );
                prop_assert!(clamped.is_finite());
            }
        }
    }
}
