//! Object template capture.
//!
//! A [`TemplateBuilder`] isolates a newly placed object by differencing the
//! rectified frame against the calibration base image, stores its silhouette
//! in a placement-independent frame and records two hue samples: one under
//! neutral light and one while the assigned color is projected on it.
//!
//! The pure pieces ([`extract_object`], [`normalize_contour`]) are shared with
//! the tracking engine so detections are normalized exactly like templates.

mod builder;
mod error;
mod extract;
mod params;
mod template;

pub use builder::{contrasting_color, CapturePhase, CaptureRequest, TemplateBuilder};
pub use error::CaptureError;
pub use extract::{
    extract_object, normalize_contour, select_candidate, to_canvas_frame, ObjectObservation,
    ObjectPose,
};
pub use params::TemplateParams;
pub use template::{ObjectTemplate, TemplateLibrary};
