use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Angle, Distance};

/// Every tolerance and limit used while converting. Nothing here is global; tests can tune any
/// of it per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Points closer than this (in both x and y) become the same node.
    pub nearby_threshold: Distance,
    pub road_width: Distance,
    /// Where a road meets an intersection, as a multiple of the road width from the center...
    pub mouth_distance_factor: f64,
    /// ...but never more than this fraction of the road's length.
    pub max_mouth_fraction: f64,

    /// Intersections chained together by gaps this small are merged.
    pub merge_distance: Distance,
    pub max_merge_rounds: usize,
    /// A degree-2 intersection is a pseudo-node if its roads are this close to a straight line.
    pub pseudo_node_angle_tolerance: Angle,
    pub max_pseudo_node_passes: usize,

    /// The spatial grid's cell size is the map's average dimension divided by this.
    pub grid_divisions: f64,
    pub max_split_edge_passes: usize,

    pub max_connect_distance: Distance,
    /// How far from perpendicular an entrance may lean, against the wall or the road.
    pub max_entrance_deviation: Angle,
    pub entrance_width: Distance,

    pub max_traversability_splits: usize,
}

impl Default for ConvertConfig {
    fn default() -> ConvertConfig {
        let road_width = Distance::meters(7.0);
        ConvertConfig {
            nearby_threshold: Distance::meters(1.0),
            road_width,
            mouth_distance_factor: 1.5,
            max_mouth_fraction: 0.45,

            merge_distance: Distance::meters(10.0),
            max_merge_rounds: 10,
            pseudo_node_angle_tolerance: Angle::degrees(10.0),
            max_pseudo_node_passes: 20,

            grid_divisions: 100.0,
            max_split_edge_passes: 100,

            max_connect_distance: Distance::meters(20.0),
            max_entrance_deviation: Angle::degrees(45.0),
            entrance_width: road_width,

            max_traversability_splits: 5,
        }
    }
}

impl ConvertConfig {
    pub fn load(path: &str) -> Result<ConvertConfig> {
        let config: ConvertConfig = abstutil::read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, dist) in [
            ("nearby_threshold", self.nearby_threshold),
            ("road_width", self.road_width),
            ("entrance_width", self.entrance_width),
        ] {
            if dist <= Distance::ZERO {
                bail!("{} must be positive, not {}", name, dist);
            }
        }
        if self.merge_distance < Distance::ZERO || self.max_connect_distance < Distance::ZERO {
            bail!("distances can't be negative");
        }
        if !(self.max_mouth_fraction > 0.0 && self.max_mouth_fraction < 0.5) {
            bail!(
                "max_mouth_fraction must be in (0, 0.5), not {}",
                self.max_mouth_fraction
            );
        }
        if self.grid_divisions <= 0.0 {
            bail!("grid_divisions must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ConvertConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ConvertConfig =
            serde_json::from_str(r#"{"merge_distance": 3.0, "max_pseudo_node_passes": 2}"#)
                .unwrap();
        assert_eq!(config.merge_distance, Distance::meters(3.0));
        assert_eq!(config.max_pseudo_node_passes, 2);
        assert_eq!(config.road_width, Distance::meters(7.0));
    }

    #[test]
    fn load_validates() {
        let dir = std::env::temp_dir().join("osm2gml_config_test");
        let good = dir.join("good.json").to_string_lossy().to_string();
        let mut config = ConvertConfig::default();
        config.max_traversability_splits = 2;
        abstutil::write_json(&good, &config).unwrap();
        assert_eq!(ConvertConfig::load(&good).unwrap(), config);

        let bad = dir.join("bad.json").to_string_lossy().to_string();
        config.grid_divisions = 0.0;
        abstutil::write_json(&bad, &config).unwrap();
        assert!(ConvertConfig::load(&bad).is_err());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let mut config = ConvertConfig::default();
        config.nearby_threshold = Distance::ZERO;
        assert!(config.validate().is_err());

        let mut config = ConvertConfig::default();
        config.max_mouth_fraction = 0.7;
        assert!(config.validate().is_err());
    }
}
