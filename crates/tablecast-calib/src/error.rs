use crate::calibrator::CalibrationPhase;
use tablecast_core::GeometryError;

/// Recoverable calibration failures. None of them are retried internally.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("no camera frame available")]
    NoFrame,
    #[error("no projected rectangle found after {thresholds_tried} threshold bands")]
    NoRectangleFound { thresholds_tried: usize },
    #[error("calibration pattern not found ({found} of {expected} corners)")]
    PatternMissing { found: usize, expected: usize },
    #[error("lens intrinsics could not be solved from the pattern views")]
    DegenerateIntrinsics,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("operation not available in phase {phase:?}")]
    NotReady { phase: CalibrationPhase },
}
