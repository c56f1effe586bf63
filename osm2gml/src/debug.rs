//! Optional hooks for looking at what each pass did. Observers only ever see copies of the state,
//! so they can't change the outcome of a conversion.

use std::collections::BTreeMap;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry, Value};

use geom::{GPSBounds, Pt2D};

use crate::TemporaryMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Kept,
    Added,
    Removed,
}

impl Category {
    fn describe(self) -> &'static str {
        match self {
            Category::Kept => "kept",
            Category::Added => "added",
            Category::Removed => "removed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DebugGeometry {
    /// A closed ring
    Polygon(Vec<Pt2D>),
    Line(Pt2D, Pt2D),
    Point(Pt2D),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DebugShape {
    pub label: String,
    pub category: Category,
    pub geometry: DebugGeometry,
}

pub trait DebugObserver {
    /// If false, the pipeline won't bother capturing anything.
    fn enabled(&self) -> bool {
        true
    }

    /// Called after each pass with everything that changed, plus everything that didn't.
    fn show(&mut self, pass: &str, shapes: &[DebugShape]);
}

/// Headless conversions don't look at anything.
pub struct NoopObserver;

impl DebugObserver for NoopObserver {
    fn enabled(&self) -> bool {
        false
    }

    fn show(&mut self, _: &str, _: &[DebugShape]) {}
}

/// Everything visible in the map at one moment, keyed by a stable label.
pub(crate) struct Snapshot {
    shapes: BTreeMap<String, DebugGeometry>,
}

impl Snapshot {
    pub fn capture(map: &TemporaryMap) -> Snapshot {
        let mut shapes = BTreeMap::new();
        for road in map.osm.roads.values() {
            if let Some(line) = map.osm.road_line(road.id) {
                shapes.insert(
                    format!("{}", road.id),
                    DebugGeometry::Line(line.pt1(), line.pt2()),
                );
            }
        }
        for i in map.osm.intersections.values() {
            let geometry = match i.area {
                Some(ref pts) => {
                    let mut ring = pts.clone();
                    ring.extend(pts.first().cloned());
                    DebugGeometry::Polygon(ring)
                }
                None => DebugGeometry::Point(i.pt),
            };
            shapes.insert(format!("OsmIntersection {}", i.id.0), geometry);
        }
        for obj in map.all_objects() {
            shapes.insert(
                format!("{} ({})", obj.id, obj.kind),
                DebugGeometry::Polygon(obj.points()),
            );
        }
        Snapshot { shapes }
    }

    pub fn diff(&self, after: &Snapshot) -> Vec<DebugShape> {
        let mut result = Vec::new();
        for (label, geometry) in &self.shapes {
            match after.shapes.get(label) {
                Some(g) if g == geometry => {
                    result.push(DebugShape {
                        label: label.clone(),
                        category: Category::Kept,
                        geometry: geometry.clone(),
                    });
                }
                _ => {
                    result.push(DebugShape {
                        label: label.clone(),
                        category: Category::Removed,
                        geometry: geometry.clone(),
                    });
                }
            }
        }
        for (label, geometry) in &after.shapes {
            if self.shapes.get(label) != Some(geometry) {
                result.push(DebugShape {
                    label: label.clone(),
                    category: Category::Added,
                    geometry: geometry.clone(),
                });
            }
        }
        result
    }
}

/// Writes one GeoJSON file per pass into a directory, for viewing in any GIS tool.
pub struct GeoJsonDumper {
    dir: String,
    gps_bounds: Option<GPSBounds>,
    count: usize,
}

impl GeoJsonDumper {
    /// If `gps_bounds` is given, coordinates are converted back to longitude/latitude.
    pub fn new(dir: &str, gps_bounds: Option<GPSBounds>) -> GeoJsonDumper {
        GeoJsonDumper {
            dir: dir.to_string(),
            gps_bounds,
            count: 0,
        }
    }

    fn coords(&self, pt: Pt2D) -> Vec<f64> {
        match self.gps_bounds {
            Some(ref gps) => {
                let gps = gps.convert_back_pt(pt);
                vec![gps.x(), gps.y()]
            }
            None => vec![pt.x(), pt.y()],
        }
    }

    pub fn to_geojson(&self, shapes: &[DebugShape]) -> FeatureCollection {
        let mut features = Vec::new();
        for shape in shapes {
            let value = match shape.geometry {
                DebugGeometry::Polygon(ref pts) => {
                    Value::Polygon(vec![pts.iter().map(|pt| self.coords(*pt)).collect()])
                }
                DebugGeometry::Line(pt1, pt2) => {
                    Value::LineString(vec![self.coords(pt1), self.coords(pt2)])
                }
                DebugGeometry::Point(pt) => Value::Point(self.coords(pt)),
            };
            let mut feature = Feature {
                bbox: None,
                geometry: Some(Geometry::new(value)),
                id: None,
                properties: None,
                foreign_members: None,
            };
            feature.set_property("label", shape.label.clone());
            feature.set_property("category", shape.category.describe());
            feature.set_property(
                "stroke",
                match shape.category {
                    Category::Kept => "grey",
                    Category::Added => "green",
                    Category::Removed => "red",
                },
            );
            features.push(feature);
        }
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn write(&mut self, pass: &str, shapes: &[DebugShape]) -> Result<String> {
        fs_err::create_dir_all(&self.dir)?;
        let path = format!(
            "{}/{:02}_{}.geojson",
            self.dir,
            self.count,
            pass.replace(' ', "_")
        );
        self.count += 1;
        fs_err::write(&path, serde_json::to_string(&self.to_geojson(shapes))?)?;
        Ok(path)
    }
}

impl DebugObserver for GeoJsonDumper {
    fn show(&mut self, pass: &str, shapes: &[DebugShape]) {
        match self.write(pass, shapes) {
            Ok(path) => debug!("Wrote {}", path),
            Err(err) => warn!("Couldn't dump {}: {}", pass, err),
        }
    }
}
