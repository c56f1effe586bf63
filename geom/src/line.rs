use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, Bounds, Distance, Pt2D};

// Relative tolerance for the sine of the angle between two directions.
const PARALLEL_EPSILON: f64 = 1e-9;

/// A line segment. Unlike a `Ring`, a zero-length line is allowed to exist; the methods that
/// would divide by the length return `None` or a sensible fallback instead.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line(pt1, pt2)
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn points(&self) -> Vec<Pt2D> {
        vec![self.0, self.1]
    }

    /// The direction vector, from pt1 to pt2.
    pub fn dir(&self) -> Pt2D {
        self.1 - self.0
    }

    pub fn length(&self) -> Distance {
        self.0.dist_to(self.1)
    }

    pub fn reversed(&self) -> Line {
        Line(self.1, self.0)
    }

    pub fn angle(&self) -> Angle {
        self.0.angle_to(self.1)
    }

    pub fn middle(&self) -> Pt2D {
        self.percent_along(0.5)
    }

    /// Not clamped; values outside [0, 1] extend the segment.
    pub fn percent_along(&self, percent: f64) -> Pt2D {
        Pt2D::new(
            self.0.x() + percent * (self.1.x() - self.0.x()),
            self.0.y() + percent * (self.1.y() - self.0.y()),
        )
    }

    pub fn dist_along(&self, dist: Distance) -> Pt2D {
        self.percent_along(dist / self.length())
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&[self.0, self.1])
    }

    /// Where the perpendicular from `pt` meets the infinite line through this segment, as a
    /// fraction of the segment. 0 is pt1, 1 is pt2.
    pub fn position_of(&self, pt: Pt2D) -> f64 {
        let dir = self.dir();
        let len_sq = dir.dot(dir);
        if len_sq == 0.0 {
            return 0.0;
        }
        (pt - self.0).dot(dir) / len_sq
    }

    pub fn closest_pt(&self, pt: Pt2D) -> Pt2D {
        self.percent_along(self.position_of(pt).clamp(0.0, 1.0))
    }

    pub fn dist_to_pt(&self, pt: Pt2D) -> Distance {
        pt.dist_to(self.closest_pt(pt))
    }

    /// True if `pt` lies on the segment, within `tolerance`.
    pub fn contains_pt(&self, pt: Pt2D, tolerance: Distance) -> bool {
        self.dist_to_pt(pt) <= tolerance
    }

    pub fn is_parallel(&self, other: &Line) -> bool {
        let d1 = self.dir();
        let d2 = other.dir();
        let scale = d1.dot(d1).sqrt() * d2.dot(d2).sqrt();
        if scale == 0.0 {
            return true;
        }
        (d1.cross(d2) / scale).abs() < PARALLEL_EPSILON
    }

    /// Parameters (t, u) such that self.percent_along(t) == other.percent_along(u), treating
    /// both as infinite lines. None if they're parallel.
    pub fn intersection_params(&self, other: &Line) -> Option<(f64, f64)> {
        if self.is_parallel(other) {
            return None;
        }
        let d1 = self.dir();
        let d2 = other.dir();
        let denom = d1.cross(d2);
        let delta = other.0 - self.0;
        let t = delta.cross(d2) / denom;
        let u = delta.cross(d1) / denom;
        if !t.is_finite() || !u.is_finite() {
            return None;
        }
        Some((t, u))
    }

    /// The point where the two segments meet, including at their endpoints.
    pub fn intersection(&self, other: &Line) -> Option<Pt2D> {
        let (t, u) = self.intersection_params(other)?;
        let eps = 1e-12;
        if (-eps..=1.0 + eps).contains(&t) && (-eps..=1.0 + eps).contains(&u) {
            Some(self.percent_along(t))
        } else {
            None
        }
    }

    /// The point where the two infinite lines meet.
    pub fn infinite_intersection(&self, other: &Line) -> Option<Pt2D> {
        let (t, _) = self.intersection_params(other)?;
        Some(self.percent_along(t))
    }

    /// True if the segments cross at a point strictly inside both of them, ignoring anything
    /// within `epsilon` (as a fraction of length) of either end.
    pub fn crosses(&self, other: &Line, epsilon: f64) -> bool {
        match self.intersection_params(other) {
            Some((t, u)) => t > epsilon && t < 1.0 - epsilon && u > epsilon && u < 1.0 - epsilon,
            None => false,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Line::new(")?;
        writeln!(f, "  Pt2D::new({}, {}),", self.0.x(), self.0.y())?;
        writeln!(f, "  Pt2D::new({}, {}),", self.1.x(), self.1.y())?;
        write!(f, ")")
    }
}
