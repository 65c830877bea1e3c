//! Timed capture sequence: settle, segment, sample white hue, project the
//! assigned color, sample color hue.

use crate::extract::{extract_object, ObjectObservation};
use crate::{CaptureError, ObjectTemplate, TemplateParams};
use std::time::Duration;
use tablecast_calib::CalibrationProfile;
use tablecast_core::{
    hsv_to_rgb, mean_hue_at, rotate_hue, ColorProjector, FrameSource, Point, RgbColor, SettleTimer,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    Idle,
    /// Waiting for the scene to settle before the first frame.
    Settling,
    /// Object found; the assigned color is projected and the second hue
    /// sample is pending.
    AwaitingColorSample,
    Captured,
    Failed,
}

/// What to capture next.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureRequest {
    pub name: String,
    /// Color to project on matched instances; derived from the object's hue
    /// when `None`.
    pub assigned_color: Option<RgbColor>,
    pub check_color_match: bool,
}

impl CaptureRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assigned_color: None,
            check_color_match: true,
        }
    }

    pub fn with_color(mut self, color: RgbColor) -> Self {
        self.assigned_color = Some(color);
        self
    }

    pub fn with_color_check(mut self, check: bool) -> Self {
        self.check_color_match = check;
        self
    }
}

/// Display color opposite the object's own hue.
pub fn contrasting_color(white_hue: f64) -> RgbColor {
    hsv_to_rgb(rotate_hue(white_hue, 0.5), 1.0, 1.0)
}

struct PendingCapture {
    observation: ObjectObservation,
    sample_at: Point,
    white_hue: f64,
    assigned_color: RgbColor,
}

/// Builds one [`ObjectTemplate`] at a time from timed frame samples.
pub struct TemplateBuilder {
    params: TemplateParams,
    phase: CapturePhase,
    request: Option<CaptureRequest>,
    settle: SettleTimer,
    color_sample: SettleTimer,
    pending: Option<PendingCapture>,
}

impl TemplateBuilder {
    pub fn new(params: TemplateParams) -> Self {
        Self {
            params,
            phase: CapturePhase::Idle,
            request: None,
            settle: SettleTimer::new(),
            color_sample: SettleTimer::new(),
            pending: None,
        }
    }

    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn request(&self) -> Option<&CaptureRequest> {
        self.request.as_ref()
    }

    /// Begin capturing `request` once the settle delay has passed. Replaces
    /// any capture in flight.
    pub fn start(&mut self, now: Duration, request: CaptureRequest) {
        log::info!("capture '{}' starting", request.name);
        self.request = Some(request);
        self.restart(now);
    }

    /// Drop the in-progress capture and start the current request over.
    /// Does nothing without a request.
    pub fn reinitialize(&mut self, now: Duration) {
        if self.request.is_none() {
            return;
        }
        log::debug!("capture reinitialized");
        self.restart(now);
    }

    /// Abandon the current request entirely.
    pub fn cancel(&mut self) {
        self.settle.cancel();
        self.color_sample.cancel();
        self.pending = None;
        self.request = None;
        self.phase = CapturePhase::Idle;
    }

    fn restart(&mut self, now: Duration) {
        self.pending = None;
        self.color_sample.cancel();
        self.settle
            .arm(now, Duration::from_millis(self.params.settle_delay_ms));
        self.phase = CapturePhase::Settling;
    }

    fn fail(&mut self, err: CaptureError) -> Option<Result<ObjectTemplate, CaptureError>> {
        log::warn!("capture failed: {err}");
        self.pending = None;
        self.phase = CapturePhase::Failed;
        Some(Err(err))
    }

    /// Advance the capture. Returns the finished template or the reason the
    /// capture failed on the tick where that happens.
    pub fn tick(
        &mut self,
        now: Duration,
        profile: &CalibrationProfile,
        frames: &mut dyn FrameSource,
        projector: &mut dyn ColorProjector,
    ) -> Option<Result<ObjectTemplate, CaptureError>> {
        let phase = self.phase;
        match phase {
            CapturePhase::Settling if self.settle.poll(now) => {
                match self.sample_object(profile, frames) {
                    Ok(pending) => {
                        projector.project_color(pending.assigned_color);
                        self.pending = Some(pending);
                        self.color_sample
                            .arm(now, Duration::from_millis(self.params.color_sample_delay_ms));
                        self.phase = CapturePhase::AwaitingColorSample;
                        None
                    }
                    Err(e) => self.fail(e),
                }
            }
            CapturePhase::AwaitingColorSample if self.color_sample.poll(now) => {
                match self.finish(profile, frames) {
                    Ok(template) => {
                        self.phase = CapturePhase::Captured;
                        Some(Ok(template))
                    }
                    Err(e) => self.fail(e),
                }
            }
            _ => None,
        }
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn sample_object(
        &self,
        profile: &CalibrationProfile,
        frames: &mut dyn FrameSource,
    ) -> Result<PendingCapture, CaptureError> {
        let frame = frames.latest_frame().ok_or(CaptureError::NoFrame)?;
        let rectified = profile.rectify_frame(&frame);
        let observation = extract_object(&profile.base_image, &rectified, &self.params)?;

        let (w, h) = rectified.dimensions();
        let sample_at = observation.pose.pixel_centroid(w, h);
        let white_hue = mean_hue_at(
            &rectified,
            sample_at.x,
            sample_at.y,
            self.params.hue_sample_radius,
        )
        .ok_or_else(|| CaptureError::no_object("centroid outside the canvas"))?;

        let assigned_color = self
            .request
            .as_ref()
            .and_then(|r| r.assigned_color)
            .unwrap_or_else(|| contrasting_color(white_hue));
        log::debug!("white hue {white_hue:.3}, projecting {assigned_color:?}");

        Ok(PendingCapture {
            observation,
            sample_at,
            white_hue,
            assigned_color,
        })
    }

    fn finish(
        &mut self,
        profile: &CalibrationProfile,
        frames: &mut dyn FrameSource,
    ) -> Result<ObjectTemplate, CaptureError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| CaptureError::no_object("no object sampled"))?;
        let frame = frames.latest_frame().ok_or(CaptureError::NoFrame)?;
        let rectified = profile.rectify_frame(&frame);
        let color_hue = mean_hue_at(
            &rectified,
            pending.sample_at.x,
            pending.sample_at.y,
            self.params.hue_sample_radius,
        )
        .unwrap_or(pending.white_hue);

        let (name, check_color_match) = self
            .request
            .as_ref()
            .map(|r| (r.name.clone(), r.check_color_match))
            .unwrap_or_default();

        log::info!(
            "template '{name}' captured: white hue {:.3}, color hue {color_hue:.3}",
            pending.white_hue
        );
        Ok(ObjectTemplate {
            name,
            canonical_contour: pending.observation.canonical_contour,
            white_hue: pending.white_hue,
            color_hue,
            assigned_color: pending.assigned_color,
            check_color_match,
        })
    }
}
