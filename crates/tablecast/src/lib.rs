//! High-level facade for the `tablecast-*` workspace.
//!
//! This crate provides:
//! - re-exports of the pipeline crates,
//! - [`Session`], the explicit context object wiring calibration, template
//!   capture and tracking together,
//! - [`PipelineConfig`] JSON loading,
//! - one-shot helpers over still images in [`offline`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::time::Duration;
//! use tablecast::{PipelineConfig, Session};
//! use tablecast::core::{NullProjector, StaticFrames};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(PipelineConfig::default());
//! let mut camera = StaticFrames::new(image::open("table.png")?.to_rgb8());
//!
//! session.calibrator_mut().begin();
//! session.calibrator_mut().detect_surface(&mut camera)?;
//! session.calibrator_mut().request_base_capture(Duration::ZERO)?;
//! let out = session.tick(Duration::from_secs(2), &mut camera, &mut NullProjector);
//! println!("calibrated: {}", matches!(out.calibration, Some(Ok(_))));
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `tablecast::core`: geometry, hue, segmentation, frame/projector seams.
//! - `tablecast::calib`: surface calibrator and `CalibrationProfile`.
//! - `tablecast::template`: template builder and `ObjectTemplate`.
//! - `tablecast::track`: detection engine, identity keys, events.

pub use tablecast_calib as calib;
pub use tablecast_core as core;
pub use tablecast_template as template;
pub use tablecast_track as track;

pub use tablecast_calib::{CalibrationProfile, SurfaceCalibrator};
pub use tablecast_template::{CaptureRequest, ObjectTemplate, TemplateLibrary};
pub use tablecast_track::{DetectionEngine, TickReport, TrackEvent, TrackObserver};

mod config;
pub mod offline;
mod session;

pub use config::{ConfigError, PipelineConfig};
pub use session::{Session, SessionError, SessionTick};

/// Install the `tracing` subscriber and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let _ = tracing_log::LogTracer::init();
    tablecast_core::init_tracing(json);
}
