//! Surface calibration for a projector-camera rig.
//!
//! The [`SurfaceCalibrator`] walks one calibration run:
//! 1. find the projected white screen quad in a camera frame,
//! 2. optionally read a chessboard from the rectified view and fit lens intrinsics,
//! 3. after a settle delay, grab the empty-surface base image.
//!
//! The result is an immutable [`CalibrationProfile`] shared as `Arc`.
//! The free functions are usable on their own for offline work.

mod calibrator;
mod error;
mod intrinsics;
mod params;
mod pattern;
mod profile;
mod surface;

pub use calibrator::{CalibrationPhase, SurfaceCalibrator};
pub use error::CalibrationError;
pub use intrinsics::{board_points, solve_intrinsics, PatternView};
pub use params::{CalibratorParams, LensCalibParams, SurfaceDetectParams};
pub use pattern::find_pattern_corners;
pub use profile::CalibrationProfile;
pub use surface::detect_surface_corners;
