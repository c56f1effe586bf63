use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Line, Pt2D, EPSILON_AREA};

/// Maybe a misnomer, but like a PolyLine, but closed: the first and last point are the same.
/// Adjacent points are distinct, and there are at least three distinct points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pts: Vec<Pt2D>,
}

impl Ring {
    /// Closes the ring if needed and drops adjacent duplicate points.
    pub fn new(mut pts: Vec<Pt2D>) -> Result<Ring> {
        pts.dedup();
        if pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        if pts.len() < 3 {
            bail!("Ring with only {} distinct points", pts.len());
        }
        pts.push(pts[0]);
        Ok(Ring { pts })
    }

    /// Includes the repeated closing point.
    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    /// Without the repeated closing point.
    pub fn distinct_points(&self) -> &[Pt2D] {
        &self.pts[0..self.pts.len() - 1]
    }

    pub fn lines(&self) -> Vec<Line> {
        self.pts
            .windows(2)
            .map(|pair| Line::new(pair[0], pair[1]))
            .collect()
    }

    /// Positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let mut sum = 0.0;
        for pair in self.pts.windows(2) {
            sum += pair[0].x() * pair[1].y() - pair[1].x() * pair[0].y();
        }
        sum / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// The area-weighted centroid. For rings enclosing no area, the average of the points.
    pub fn centroid(&self) -> Pt2D {
        let area = self.signed_area();
        if area.abs() < EPSILON_AREA {
            return Pt2D::center(self.distinct_points());
        }
        let mut cx = 0.0;
        let mut cy = 0.0;
        for pair in self.pts.windows(2) {
            let cross = pair[0].x() * pair[1].y() - pair[1].x() * pair[0].y();
            cx += (pair[0].x() + pair[1].x()) * cross;
            cy += (pair[0].y() + pair[1].y()) * cross;
        }
        Pt2D::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }

    /// Even-odd test. Points exactly on the boundary may go either way.
    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        let mut inside = false;
        for pair in self.pts.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if (a.y() > pt.y()) != (b.y() > pt.y()) {
                let x = a.x() + (pt.y() - a.y()) / (b.y() - a.y()) * (b.x() - a.x());
                if pt.x() < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn to_geo(&self) -> geo::LineString<f64> {
        geo::LineString(self.pts.iter().map(|pt| (*pt).into()).collect())
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Ring::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Ring {
        Ring::new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(0.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn closes_and_dedupes() {
        let ring = Ring::new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(ring.points().len(), 4);
        assert!(Ring::new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(1.0, 0.0)]).is_err());
    }

    #[test]
    fn area_and_orientation() {
        let ring = square();
        assert_eq!(ring.signed_area(), 100.0);
        assert!(ring.is_ccw());
        let mut backwards = ring.points().clone();
        backwards.reverse();
        assert!(!Ring::new(backwards).unwrap().is_ccw());
        assert_eq!(ring.centroid(), Pt2D::new(5.0, 5.0));
        assert!(ring.contains_pt(Pt2D::new(3.0, 3.0)));
        assert!(!ring.contains_pt(Pt2D::new(13.0, 3.0)));
    }
}
