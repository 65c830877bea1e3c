use tablecast_core::GeometryError;

/// Why a capture produced no template. The builder stays in `Failed` until
/// restarted.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("no camera frame available")]
    NoFrame,
    #[error("no object detected: {reason}")]
    NoObjectDetected { reason: String },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl CaptureError {
    pub(crate) fn no_object(reason: impl Into<String>) -> Self {
        Self::NoObjectDetected {
            reason: reason.into(),
        }
    }
}
