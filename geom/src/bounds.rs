use serde::{Deserialize, Serialize};

use crate::{Distance, Pt2D};

/// Represents a rectangular boundary of `Pt2D` points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// A boundary including no points.
    pub fn new() -> Bounds {
        Bounds {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    /// Create a boundary covering some points.
    pub fn from(pts: &[Pt2D]) -> Bounds {
        let mut b = Bounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    /// Update the boundary to include this point.
    pub fn update(&mut self, pt: Pt2D) {
        self.min_x = self.min_x.min(pt.x());
        self.max_x = self.max_x.max(pt.x());
        self.min_y = self.min_y.min(pt.y());
        self.max_y = self.max_y.max(pt.y());
    }

    /// True if no point has been added.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// False if empty or not finite.
    pub fn is_valid(&self) -> bool {
        !self.is_empty()
            && self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// True if the point is within the boundary, edges included.
    pub fn contains(&self, pt: Pt2D) -> bool {
        pt.x() >= self.min_x && pt.x() <= self.max_x && pt.y() >= self.min_y && pt.y() <= self.max_y
    }

    /// True if the two rectangles overlap or touch.
    pub fn intersects(&self, other: &Bounds) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Grow the boundary by some distance on every side.
    pub fn expanded(&self, dist: Distance) -> Bounds {
        let d = dist.inner_meters();
        Bounds {
            min_x: self.min_x - d,
            min_y: self.min_y - d,
            max_x: self.max_x + d,
            max_y: self.max_y + d,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Pt2D {
        Pt2D::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlaps() {
        let b1 = Bounds::from(&[Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 10.0)]);
        let b2 = Bounds::from(&[Pt2D::new(10.0, 10.0), Pt2D::new(20.0, 20.0)]);
        let b3 = Bounds::from(&[Pt2D::new(11.0, 0.0), Pt2D::new(20.0, 5.0)]);
        assert!(b1.intersects(&b2));
        assert!(!b1.intersects(&b3));
        assert!(b1.expanded(Distance::meters(1.0)).intersects(&b3));
        assert!(!Bounds::new().intersects(&b1));
        assert_eq!(b1.center(), Pt2D::new(5.0, 5.0));
    }
}
