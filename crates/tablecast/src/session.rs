//! One projector-camera pipeline: calibrator, template builder and detection
//! engine sharing a calibration profile and a template library.

use crate::PipelineConfig;
use std::sync::Arc;
use std::time::Duration;
use tablecast_calib::{CalibrationError, CalibrationPhase, CalibrationProfile, SurfaceCalibrator};
use tablecast_core::{ColorProjector, FrameSource};
use tablecast_template::{CaptureError, CaptureRequest, ObjectTemplate, TemplateBuilder, TemplateLibrary};
use tablecast_track::{DetectionEngine, TickReport, TrackError, TrackObserver};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("no calibration profile yet (calibrator phase {phase:?})")]
    NotCalibrated { phase: CalibrationPhase },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Config(#[from] crate::ConfigError),
}

/// Outcomes of one [`Session::tick`]; each field is `None` when that stage had
/// nothing due.
#[derive(Debug, Default)]
pub struct SessionTick {
    pub calibration: Option<Result<Arc<CalibrationProfile>, CalibrationError>>,
    pub capture: Option<Result<ObjectTemplate, CaptureError>>,
    pub tracking: Option<Result<TickReport, TrackError>>,
}

/// Explicit pipeline context.
///
/// The session owns the active profile and hands it by reference to the
/// builder and the engine; a recalibration swaps the whole `Arc`.
pub struct Session {
    config: PipelineConfig,
    calibrator: SurfaceCalibrator,
    builder: TemplateBuilder,
    engine: DetectionEngine,
    templates: TemplateLibrary,
    profile: Option<Arc<CalibrationProfile>>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            calibrator: SurfaceCalibrator::new(config.calibration.clone()),
            builder: TemplateBuilder::new(config.template.clone()),
            engine: DetectionEngine::new(config.tracker.clone()),
            templates: TemplateLibrary::new(),
            profile: None,
            config,
        }
    }

    /// Session seeded with a profile computed elsewhere.
    pub fn with_profile(config: PipelineConfig, profile: Arc<CalibrationProfile>) -> Self {
        let mut session = Self::new(config);
        session.profile = Some(profile);
        session
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn calibrator(&self) -> &SurfaceCalibrator {
        &self.calibrator
    }

    /// Direct access for the calibration steps the orchestrator triggers
    /// (`begin`, `detect_surface`, `calibrate_lens`, `request_base_capture`).
    pub fn calibrator_mut(&mut self) -> &mut SurfaceCalibrator {
        &mut self.calibrator
    }

    pub fn builder(&self) -> &TemplateBuilder {
        &self.builder
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub fn profile(&self) -> Option<Arc<CalibrationProfile>> {
        self.profile.clone()
    }

    /// Replace the active profile wholesale.
    pub fn set_profile(&mut self, profile: Arc<CalibrationProfile>) {
        self.profile = Some(profile);
    }

    /// Append a template, e.g. one restored by an external store.
    pub fn add_template(&mut self, template: ObjectTemplate) -> usize {
        self.templates.push(template)
    }

    pub fn subscribe(&mut self, observer: Box<dyn TrackObserver>) {
        self.engine.subscribe(observer);
    }

    fn require_profile(&self) -> Result<Arc<CalibrationProfile>, SessionError> {
        self.profile.clone().ok_or(SessionError::NotCalibrated {
            phase: self.calibrator.phase(),
        })
    }

    /// Begin a template capture. Fails immediately without a profile.
    pub fn start_capture(&mut self, now: Duration, request: CaptureRequest) -> Result<(), SessionError> {
        self.require_profile()?;
        self.builder.start(now, request);
        Ok(())
    }

    /// Restart the current capture after a fresh settle delay.
    pub fn reinitialize_capture(&mut self, now: Duration) {
        self.builder.reinitialize(now);
    }

    pub fn cancel_capture(&mut self) {
        self.builder.cancel();
    }

    /// Start detection ticks. Fails immediately without a profile.
    pub fn start_tracking(&mut self, now: Duration) -> Result<(), SessionError> {
        self.require_profile()?;
        self.engine.activate(now);
        Ok(())
    }

    pub fn stop_tracking(&mut self) -> TickReport {
        self.engine.deactivate()
    }

    /// Drive every stage that has work due at `now`.
    pub fn tick(
        &mut self,
        now: Duration,
        frames: &mut dyn FrameSource,
        projector: &mut dyn ColorProjector,
    ) -> SessionTick {
        let mut out = SessionTick {
            calibration: self.calibrator.tick(now, frames),
            ..SessionTick::default()
        };
        if let Some(Ok(profile)) = &out.calibration {
            self.profile = Some(Arc::clone(profile));
        }

        let Some(profile) = self.profile.clone() else {
            return out;
        };

        out.capture = self.builder.tick(now, &profile, frames, projector);
        if let Some(Ok(template)) = &out.capture {
            self.templates.push(template.clone());
        }

        out.tracking = self
            .engine
            .tick(now, &profile, &self.templates, frames)
            .transpose();
        out
    }
}
