/// Failures of the shared geometry primitives.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("contour has zero area; moments are undefined")]
    DegenerateMoments,
    #[error("need at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("homography estimation failed")]
    HomographyFailed,
    #[error("transform is not invertible")]
    NonInvertible,
}
