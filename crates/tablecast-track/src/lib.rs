//! Detection and tracking of templated objects.
//!
//! Each detection step segments the rectified frame against the calibration
//! base image, matches the blobs against the [`TemplateLibrary`] by Hu-moment
//! shape distance and hue, and reconciles the matches with an instance table
//! keyed by a quantized [`IdentityKey`]. Consumers get [`TrackEvent`]s through
//! [`TickReport`]s and subscribed [`TrackObserver`]s.
//!
//! [`TemplateLibrary`]: tablecast_template::TemplateLibrary

mod candidate;
mod engine;
mod error;
mod events;
mod identity;
mod instance;
mod params;

pub use candidate::{
    extract_candidates, hue_matches, match_candidates, score_candidate, CandidateMatch,
    DetectionCandidate,
};
pub use engine::{DetectionEngine, EngineState};
pub use error::TrackError;
pub use events::{EventLog, TickReport, TrackEvent, TrackObserver};
pub use identity::IdentityKey;
pub use instance::{angle_difference_deg, TrackedInstance};
pub use params::TrackerParams;
