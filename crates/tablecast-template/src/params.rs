use serde::{Deserialize, Serialize};
use tablecast_core::SegmentationParams;

/// Tuning for one template capture.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateParams {
    pub segmentation: SegmentationParams,
    /// Wait after `start`/`reinitialize` before grabbing the first frame.
    pub settle_delay_ms: u64,
    /// Wait between projecting the assigned color and sampling `color_hue`.
    pub color_sample_delay_ms: u64,
    /// Accepted object area as a fraction of the canvas area.
    pub min_area_fraction: f64,
    pub max_area_fraction: f64,
    /// Fragments closer than this (canvas pixels) are merged into one hull.
    pub merge_distance: f64,
    /// Contours whose bounding box comes this close to the canvas edge are
    /// treated as rectification artifacts.
    pub border_margin_px: u32,
    /// Hue is averaged over a `(2r+1)²` window at the centroid.
    pub hue_sample_radius: u32,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            segmentation: SegmentationParams::default(),
            settle_delay_ms: 500,
            color_sample_delay_ms: 300,
            min_area_fraction: 0.001,
            max_area_fraction: 0.5,
            merge_distance: 10.0,
            border_margin_px: 2,
            hue_sample_radius: 1,
        }
    }
}
