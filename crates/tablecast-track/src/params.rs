use serde::{Deserialize, Serialize};
use tablecast_core::{SegmentationParams, ShapeMetric};

/// Tracking tunables. Distances are canvas pixels, angles degrees.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerParams {
    pub segmentation: SegmentationParams,
    pub shape_metric: ShapeMetric,
    /// Accept a template when the shape distance is below this.
    pub shape_match_threshold: f64,
    /// Circular hue distance tolerated against either template hue.
    pub hue_margin: f64,
    /// Identity key quantization of the centroid.
    pub position_margin: f64,
    /// Identity key quantization of the template perimeter.
    pub size_margin: f64,
    pub merge_distance: f64,
    pub max_instances_per_template: usize,
    pub tick_interval_ms: u64,
    /// Rotation events fire only past this change from the last notified angle.
    pub rotation_threshold_deg: f64,
    /// Candidates smaller than this fraction of the smallest template are noise.
    pub min_area_fraction_of_smallest_template: f64,
    pub hue_sample_radius: u32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            segmentation: SegmentationParams::default(),
            shape_metric: ShapeMetric::I1,
            shape_match_threshold: 0.2,
            hue_margin: 0.08,
            position_margin: 20.0,
            size_margin: 40.0,
            merge_distance: 10.0,
            max_instances_per_template: 1,
            tick_interval_ms: 200,
            rotation_threshold_deg: 1.0,
            min_area_fraction_of_smallest_template: 0.5,
            hue_sample_radius: 1,
        }
    }
}

impl TrackerParams {
    /// Replace unusable identity margins with the defaults.
    ///
    /// Margins must be finite and positive; anything else would make every
    /// identity key depend on raw pixel values.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        for (name, value, fallback) in [
            ("position_margin", &mut self.position_margin, defaults.position_margin),
            ("size_margin", &mut self.size_margin, defaults.size_margin),
        ] {
            if !(value.is_finite() && *value > 0.0) {
                log::warn!("{name} {value} is not a positive distance, using {fallback}");
                *value = fallback;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_margins_fall_back_to_defaults() {
        let params = TrackerParams {
            position_margin: 0.0,
            size_margin: -5.0,
            hue_margin: 0.1,
            ..TrackerParams::default()
        }
        .validated();
        assert_eq!(params.position_margin, 20.0);
        assert_eq!(params.size_margin, 40.0);
        assert_eq!(params.hue_margin, 0.1);

        let tuned = TrackerParams {
            position_margin: 7.5,
            size_margin: f64::NAN,
            ..TrackerParams::default()
        }
        .validated();
        assert_eq!(tuned.position_margin, 7.5);
        assert_eq!(tuned.size_margin, 40.0);
    }
}
