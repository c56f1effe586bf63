use anyhow::Result;
use geo::{Area, BooleanOps};
use serde::{Deserialize, Serialize};

use crate::{Bounds, Pt2D, Ring, EPSILON_AREA};

/// A region with one exterior boundary and maybe some holes. Boolean operations come from
/// `geo`; their results are decomposed back into `Polygon`s, dropping slivers with no area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    pub fn from_ring(ring: Ring) -> Polygon {
        Polygon {
            exterior: ring,
            holes: Vec::new(),
        }
    }

    pub fn from_points(pts: Vec<Pt2D>) -> Result<Polygon> {
        Ok(Polygon::from_ring(Ring::new(pts)?))
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &Vec<Ring> {
        &self.holes
    }

    pub fn get_bounds(&self) -> Bounds {
        self.exterior.get_bounds()
    }

    pub fn area(&self) -> f64 {
        self.to_geo().unsigned_area()
    }

    pub fn intersection(&self, other: &Polygon) -> Vec<Polygon> {
        from_multi(self.to_geo().intersection(&other.to_geo()))
    }

    pub fn difference(&self, other: &Polygon) -> Vec<Polygon> {
        from_multi(self.to_geo().difference(&other.to_geo()))
    }

    /// The area shared by both regions. Regions that only touch share none.
    pub fn intersection_area(&self, other: &Polygon) -> f64 {
        if !self.get_bounds().intersects(&other.get_bounds()) {
            return 0.0;
        }
        self.to_geo().intersection(&other.to_geo()).unsigned_area()
    }

    pub fn overlaps(&self, other: &Polygon) -> bool {
        self.intersection_area(other) > EPSILON_AREA
    }

    pub fn union_all(mut list: Vec<Polygon>) -> Vec<Polygon> {
        let first = match list.pop() {
            Some(p) => p,
            None => return Vec::new(),
        };
        let mut result = geo::MultiPolygon(vec![first.to_geo()]);
        for p in list {
            result = result.union(&geo::MultiPolygon(vec![p.to_geo()]));
        }
        from_multi(result)
    }

    pub fn to_geo(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(
            self.exterior.to_geo(),
            self.holes.iter().map(|h| h.to_geo()).collect(),
        )
    }
}

fn from_multi(multi: geo::MultiPolygon<f64>) -> Vec<Polygon> {
    multi
        .0
        .into_iter()
        .filter_map(|p| Polygon::try_from(p).ok())
        .filter(|p| p.area() > EPSILON_AREA)
        .collect()
}

impl TryFrom<geo::Polygon<f64>> for Polygon {
    type Error = anyhow::Error;

    fn try_from(poly: geo::Polygon<f64>) -> Result<Self> {
        let (exterior, interiors) = poly.into_inner();
        let exterior = Ring::new(exterior.0.into_iter().map(Pt2D::from).collect())?;
        let holes = interiors
            .into_iter()
            .filter_map(|ls| Ring::new(ls.0.into_iter().map(Pt2D::from).collect()).ok())
            .collect();
        Ok(Polygon { exterior, holes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Polygon {
        Polygon::from_points(vec![
            Pt2D::new(x1, y1),
            Pt2D::new(x2, y1),
            Pt2D::new(x2, y2),
            Pt2D::new(x1, y2),
        ])
        .unwrap()
    }

    #[test]
    fn difference_cuts_a_corner() {
        let big = rect(0.0, 0.0, 10.0, 10.0);
        let corner = rect(5.0, 5.0, 15.0, 15.0);
        let result = big.difference(&corner);
        assert_eq!(result.len(), 1);
        assert!((result[0].area() - 75.0).abs() < 1e-6);
    }

    #[test]
    fn difference_splits_in_two() {
        let big = rect(0.0, 0.0, 30.0, 10.0);
        let wall = rect(10.0, -5.0, 20.0, 15.0);
        let result = big.difference(&wall);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn touching_regions_dont_overlap() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(10.0, 0.0, 20.0, 10.0);
        let c = rect(5.0, 5.0, 15.0, 15.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        let union = Polygon::union_all(vec![a, b]);
        assert_eq!(union.len(), 1);
        assert!((union[0].area() - 200.0).abs() < 1e-6);
    }
}
