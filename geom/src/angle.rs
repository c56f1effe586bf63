use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new_rads(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle(degs.to_radians())
    }

    /// Not normalized
    pub fn to_degrees(self) -> f64 {
        self.0.to_degrees()
    }

    /// [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let r = self.0.rem_euclid(2.0 * std::f64::consts::PI);
        // rem_euclid can round up to exactly 2pi for tiny negative inputs
        if r >= 2.0 * std::f64::consts::PI {
            0.0
        } else {
            r
        }
    }

    /// [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        let degs = self.normalized_radians().to_degrees();
        if degs >= 360.0 {
            degs - 360.0
        } else {
            degs
        }
    }

    /// The signed rotation needed to turn self into other, in degrees, within (-180, 180].
    /// Positive means counter-clockwise.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let mut delta = other.normalized_degrees() - self.normalized_degrees();
        if delta > 180.0 {
            delta -= 360.0;
        } else if delta <= -180.0 {
            delta += 360.0;
        }
        delta
    }

    /// The unsigned angle between two directions, in [0, 180] degrees.
    pub fn degrees_between(self, other: Angle) -> f64 {
        self.shortest_rotation_towards(other).abs()
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}
