use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, Distance};

/// This represents world-space in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        Pt2D { x, y }
    }

    pub fn zero() -> Pt2D {
        Pt2D::new(0.0, 0.0)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn dist_to(self, to: Pt2D) -> Distance {
        Distance::meters(self.raw_dist_to(to))
    }

    pub(crate) fn raw_dist_to(self, to: Pt2D) -> f64 {
        ((self.x - to.x).powi(2) + (self.y - to.y).powi(2)).sqrt()
    }

    /// Both coordinates differ by at most `threshold`. This is a box test, not a circle.
    pub fn approx_eq(self, other: Pt2D, threshold: Distance) -> bool {
        let t = threshold.inner_meters();
        (self.x - other.x).abs() <= t && (self.y - other.y).abs() <= t
    }

    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::new_rads((to.y - self.y).atan2(to.x - self.x))
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }

    /// The average of the points. Empty input yields the origin.
    pub fn center(pts: &[Pt2D]) -> Pt2D {
        if pts.is_empty() {
            return Pt2D::zero();
        }
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x;
            y += pt.y;
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }

    /// Interpreting both points as vectors from the origin.
    pub fn dot(self, other: Pt2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The z component of the 3D cross product, interpreting both points as vectors.
    pub fn cross(self, other: Pt2D) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

impl std::ops::Sub for Pt2D {
    type Output = Pt2D;

    fn sub(self, other: Pt2D) -> Pt2D {
        Pt2D::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Add for Pt2D {
    type Output = Pt2D;

    fn add(self, other: Pt2D) -> Pt2D {
        Pt2D::new(self.x + other.x, self.y + other.y)
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x, self.y)
    }
}

impl From<Pt2D> for geo::Coordinate<f64> {
    fn from(pt: Pt2D) -> Self {
        geo::Coordinate { x: pt.x, y: pt.y }
    }
}

impl From<geo::Coordinate<f64>> for Pt2D {
    fn from(coord: geo::Coordinate<f64>) -> Self {
        Pt2D::new(coord.x, coord.y)
    }
}

impl From<Pt2D> for geo::Point<f64> {
    fn from(pt: Pt2D) -> Self {
        geo::Point::new(pt.x, pt.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_test() {
        let pt = Pt2D::new(0.0, 0.0);
        assert!(pt.approx_eq(Pt2D::new(0.9, -0.9), Distance::meters(1.0)));
        assert!(!pt.approx_eq(Pt2D::new(1.1, 0.0), Distance::meters(1.0)));
    }

    #[test]
    fn center() {
        assert_eq!(
            Pt2D::center(&[Pt2D::new(0.0, 0.0), Pt2D::new(5.0, 0.0)]),
            Pt2D::new(2.5, 0.0)
        );
    }
}
