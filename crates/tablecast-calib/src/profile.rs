use image::RgbImage;
use tablecast_core::{undistort_image, LensIntrinsics, Point, Rectifier, RotationMode};

/// Output of one calibration run.
///
/// Handed out as `Arc<CalibrationProfile>`: consumers hold a snapshot and a
/// recalibration replaces the whole value. Only the base image can be swapped,
/// through [`CalibrationProfile::with_base_image`], which builds a new profile.
#[derive(Clone, Debug)]
pub struct CalibrationProfile {
    /// Screen quad in camera pixels, ordered TL, BL, BR, TR.
    pub corners: [Point; 4],
    pub rectifier: Rectifier,
    /// `None` until a calibration pattern has been read.
    pub lens: Option<LensIntrinsics>,
    /// Empty surface, undistorted and rectified to canvas size.
    pub base_image: RgbImage,
}

impl CalibrationProfile {
    pub fn rotation_mode(&self) -> RotationMode {
        self.rectifier.rotation_mode
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.rectifier.width, self.rectifier.height)
    }

    /// Camera → canvas rectification matrix.
    pub fn rectification_matrix(&self) -> [[f64; 3]; 3] {
        self.rectifier.matrix()
    }

    pub fn camera_matrix(&self) -> Option<[[f64; 3]; 3]> {
        self.lens.map(|l| l.camera_matrix())
    }

    pub fn distortion_coefficients(&self) -> Option<[f64; 5]> {
        self.lens.map(|l| l.distortion_coefficients())
    }

    /// Undistort (when intrinsics exist) and rectify a raw camera frame.
    pub fn rectify_frame(&self, frame: &RgbImage) -> RgbImage {
        match &self.lens {
            Some(lens) => self.rectifier.rectify_rgb(&undistort_image(frame, lens)),
            None => self.rectifier.rectify_rgb(frame),
        }
    }

    /// Same profile with a freshly captured base image.
    pub fn with_base_image(&self, base_image: RgbImage) -> Self {
        Self {
            corners: self.corners,
            rectifier: self.rectifier,
            lens: self.lens,
            base_image,
        }
    }
}
