//! Camera quadrilateral → canvas rectangle mapping.

use crate::error::GeometryError;
use crate::homography::{homography_from_4pt, warp_perspective_gray, warp_perspective_rgb, Homography};
use crate::Point;
use ::image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Physical orientation of the projector relative to the camera.
///
/// Selects which canvas corner each ordered camera corner lands on, so the
/// rectified image already matches the display without a separate flip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationMode {
    #[default]
    None,
    MirrorVertical,
    MirrorHorizontal,
    MirrorBoth,
}

impl RotationMode {
    pub const ALL: [RotationMode; 4] = [
        RotationMode::None,
        RotationMode::MirrorVertical,
        RotationMode::MirrorHorizontal,
        RotationMode::MirrorBoth,
    ];
}

/// Canvas targets for corners ordered TL, BL, BR, TR, in pixel-index coordinates.
pub fn destination_corners(mode: RotationMode, width: u32, height: u32) -> [Point; 4] {
    let w = width.saturating_sub(1) as f64;
    let h = height.saturating_sub(1) as f64;
    let tl = Point::new(0.0, 0.0);
    let bl = Point::new(0.0, h);
    let br = Point::new(w, h);
    let tr = Point::new(w, 0.0);
    match mode {
        RotationMode::None => [tl, bl, br, tr],
        RotationMode::MirrorVertical => [bl, tl, tr, br],
        RotationMode::MirrorHorizontal => [tr, br, bl, tl],
        RotationMode::MirrorBoth => [br, tr, tl, bl],
    }
}

/// Rectification transform together with its inverse and output size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rectifier {
    pub canvas_from_camera: Homography,
    pub camera_from_canvas: Homography,
    pub width: u32,
    pub height: u32,
    pub rotation_mode: RotationMode,
}

impl Rectifier {
    /// The 3×3 rectification matrix (camera → canvas).
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.canvas_from_camera.to_array()
    }

    pub fn to_canvas(&self, p: Point) -> Point {
        self.canvas_from_camera.apply(p)
    }

    pub fn to_camera(&self, p: Point) -> Point {
        self.camera_from_canvas.apply(p)
    }

    /// Resample a camera frame onto the canvas grid.
    pub fn rectify_rgb(&self, frame: &RgbImage) -> RgbImage {
        warp_perspective_rgb(frame, &self.camera_from_canvas, self.width, self.height)
    }

    pub fn rectify_gray(&self, frame: &GrayImage) -> GrayImage {
        warp_perspective_gray(frame, &self.camera_from_canvas, self.width, self.height)
    }
}

/// Build the transform sending `corners` (ordered TL, BL, BR, TR) onto the
/// canvas rectangle permuted by `mode`.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(corners)))]
pub fn compute_rectification(
    corners: &[Point; 4],
    mode: RotationMode,
    width: u32,
    height: u32,
) -> Result<Rectifier, GeometryError> {
    if width < 2 || height < 2 {
        return Err(GeometryError::HomographyFailed);
    }
    let dst = destination_corners(mode, width, height);
    let forward = homography_from_4pt(corners, &dst).ok_or(GeometryError::HomographyFailed)?;
    let inverse = forward.inverse().ok_or(GeometryError::NonInvertible)?;
    Ok(Rectifier {
        canvas_from_camera: forward,
        camera_from_canvas: inverse,
        width,
        height,
        rotation_mode: mode,
    })
}
