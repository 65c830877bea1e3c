use serde::{Deserialize, Serialize};
use tablecast_core::RotationMode;

/// Threshold sweep used to find the projected screen quad.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceDetectParams {
    /// Gaussian blur applied to the grayscale frame; `0` disables it.
    pub blur_sigma: f32,
    /// First, last (inclusive) and step of the binary threshold sweep.
    pub threshold_start: u8,
    pub threshold_stop: u8,
    pub threshold_step: u8,
    /// Noise floor for the accepted quad, in camera pixels².
    pub min_area_px: f64,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_frac: f64,
    /// The quad bounding box must stay this many pixels away from the frame edge.
    pub border_margin_px: u32,
}

impl Default for SurfaceDetectParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            threshold_start: 20,
            threshold_stop: 250,
            threshold_step: 10,
            min_area_px: 2000.0,
            approx_epsilon_frac: 0.02,
            border_margin_px: 1,
        }
    }
}

impl SurfaceDetectParams {
    /// Threshold bands in sweep order.
    pub fn thresholds(&self) -> Vec<u8> {
        let step = self.threshold_step.max(1) as usize;
        (self.threshold_start..=self.threshold_stop)
            .step_by(step)
            .collect()
    }
}

/// Chessboard lens calibration settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LensCalibParams {
    /// Inner corners per row and per column.
    pub pattern_cols: usize,
    pub pattern_rows: usize,
    /// Square side in board units; only scales the board model.
    pub square_size: f64,
    /// Half-size of the sub-pixel refinement window.
    pub subpix_window: u32,
    pub subpix_iters: usize,
    pub fix_tangential: bool,
    pub fix_k3: bool,
    /// Views needed before the full closed-form solve replaces the
    /// single-view focal estimate.
    pub min_views_for_full_intrinsics: usize,
    /// ChESS detector response threshold and NMS radius.
    pub corner_threshold_rel: f32,
    pub corner_nms_radius: u32,
}

impl Default for LensCalibParams {
    fn default() -> Self {
        Self {
            pattern_cols: 9,
            pattern_rows: 6,
            square_size: 1.0,
            subpix_window: 5,
            subpix_iters: 20,
            fix_tangential: true,
            fix_k3: true,
            min_views_for_full_intrinsics: 3,
            corner_threshold_rel: 0.2,
            corner_nms_radius: 2,
        }
    }
}

impl LensCalibParams {
    pub fn expected_corners(&self) -> usize {
        self.pattern_cols * self.pattern_rows
    }
}

/// Top-level calibrator configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibratorParams {
    /// Display resolution; the rectified canvas has this size.
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub rotation_mode: RotationMode,
    pub surface: SurfaceDetectParams,
    pub lens: LensCalibParams,
    /// Wait before grabbing the base image, so UI overlays can disappear.
    pub base_settle_ms: u64,
}

impl Default for CalibratorParams {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,
            rotation_mode: RotationMode::None,
            surface: SurfaceDetectParams::default(),
            lens: LensCalibParams::default(),
            base_settle_ms: 1000,
        }
    }
}
