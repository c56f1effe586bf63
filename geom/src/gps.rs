use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Pt2D;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// longitude is x, latitude is y
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    longitude: f64,
    latitude: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat {
            longitude: lon,
            latitude: lat,
        }
    }

    pub fn x(&self) -> f64 {
        self.longitude
    }

    pub fn y(&self) -> f64 {
        self.latitude
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LonLat({0}, {1})", self.longitude, self.latitude)
    }
}

/// The region that a map covers. Points are projected into world-space meters relative to the
/// southwest corner, with an equirectangular projection; this is accurate enough over the size of
/// a city and is exactly invertible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GPSBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GPSBounds {
    pub fn new() -> GPSBounds {
        GPSBounds {
            min_lon: f64::MAX,
            min_lat: f64::MAX,
            max_lon: f64::MIN,
            max_lat: f64::MIN,
        }
    }

    pub fn from(pts: &[LonLat]) -> GPSBounds {
        let mut b = GPSBounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    pub fn update(&mut self, pt: LonLat) {
        self.min_lon = self.min_lon.min(pt.longitude);
        self.max_lon = self.max_lon.max(pt.longitude);
        self.min_lat = self.min_lat.min(pt.latitude);
        self.max_lat = self.max_lat.max(pt.latitude);
    }

    pub fn contains(&self, pt: LonLat) -> bool {
        pt.longitude >= self.min_lon
            && pt.longitude <= self.max_lon
            && pt.latitude >= self.min_lat
            && pt.latitude <= self.max_lat
    }

    // Meters per degree of longitude and latitude
    fn scale(&self) -> (f64, f64) {
        let per_degree = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let mid_lat = (self.min_lat + self.max_lat) / 2.0;
        (per_degree * mid_lat.to_radians().cos(), per_degree)
    }

    pub fn convert(&self, pts: &[LonLat]) -> Vec<Pt2D> {
        pts.iter().map(|pt| self.convert_pt(*pt)).collect()
    }

    pub fn convert_pt(&self, pt: LonLat) -> Pt2D {
        let (sx, sy) = self.scale();
        Pt2D::new(
            (pt.longitude - self.min_lon) * sx,
            (pt.latitude - self.min_lat) * sy,
        )
    }

    pub fn convert_back(&self, pts: &[Pt2D]) -> Vec<LonLat> {
        pts.iter().map(|pt| self.convert_back_pt(*pt)).collect()
    }

    pub fn convert_back_pt(&self, pt: Pt2D) -> LonLat {
        let (sx, sy) = self.scale();
        LonLat::new(self.min_lon + pt.x() / sx, self.min_lat + pt.y() / sy)
    }
}

impl Default for GPSBounds {
    fn default() -> GPSBounds {
        GPSBounds::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_round_trips() {
        let a = LonLat::new(-122.3, 47.6);
        let b = LonLat::new(-122.29, 47.61);
        let bounds = GPSBounds::from(&[a, b]);
        let pts = bounds.convert(&[a, b]);
        assert_eq!(pts[0], Pt2D::new(0.0, 0.0));

        let back = bounds.convert_back_pt(pts[1]);
        assert!((back.x() - b.x()).abs() < 1e-9);
        assert!((back.y() - b.y()).abs() < 1e-9);

        // About 750m east and 1112m north
        let projected = pts[0].dist_to(pts[1]).inner_meters();
        assert!((projected - 1341.0).abs() < 10.0);
    }
}
