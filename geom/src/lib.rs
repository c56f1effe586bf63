//! 2D geometry in world-space meters. The heavy boolean operations are delegated to the `geo`
//! crate; everything else is small enough to do by hand.

#[macro_use]
extern crate anyhow;

mod angle;
mod bounds;
mod distance;
mod gps;
mod line;
mod polygon;
mod pt;
mod ring;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::distance::Distance;
pub use crate::gps::{GPSBounds, LonLat};
pub use crate::line::Line;
pub use crate::polygon::Polygon;
pub use crate::pt::Pt2D;
pub use crate::ring::Ring;

/// Two points closer than this are considered the same by purely geometric tests (as opposed to
/// the configurable snapping tolerance used when building a graph).
pub const EPSILON_DIST: Distance = Distance::const_meters(0.0001);

/// Regions with less area than this (in square meters) are treated as empty.
pub const EPSILON_AREA: f64 = 1e-6;
