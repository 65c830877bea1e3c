/// Tick-level failures. None of them stop the engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("no camera frame available")]
    NoFrame,
}
