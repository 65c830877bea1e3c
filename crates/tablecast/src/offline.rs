//! One-shot helpers over still images, driving the same state machines with a
//! synthetic clock.

use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;
use tablecast_calib::{CalibrationError, CalibrationProfile, CalibratorParams, SurfaceCalibrator};
use tablecast_core::{NullProjector, StaticFrames};
use tablecast_template::{
    CaptureError, CaptureRequest, ObjectTemplate, TemplateBuilder, TemplateParams,
};

/// Detect the screen quad on `surface` and take `base` as the empty-surface
/// image.
pub fn calibrate_from_images(
    params: &CalibratorParams,
    surface: &RgbImage,
    base: &RgbImage,
) -> Result<CalibrationProfile, CalibrationError> {
    let mut calibrator = SurfaceCalibrator::new(params.clone());
    calibrator.begin();
    calibrator.detect_surface(&mut StaticFrames::new(surface.clone()))?;

    calibrator.request_base_capture(Duration::ZERO)?;
    let settle = Duration::from_millis(params.base_settle_ms);
    let mut frames = StaticFrames::new(base.clone());
    let profile = calibrator
        .tick(settle, &mut frames)
        .ok_or(CalibrationError::NotReady {
            phase: calibrator.phase(),
        })??;
    Ok(Arc::unwrap_or_clone(profile))
}

/// Capture a template from a single camera frame. Both hue samples come from
/// the same frame since nothing is projected.
pub fn capture_from_image(
    profile: &CalibrationProfile,
    frame: &RgbImage,
    request: CaptureRequest,
    params: &TemplateParams,
) -> Result<ObjectTemplate, CaptureError> {
    let mut builder = TemplateBuilder::new(params.clone());
    let mut frames = StaticFrames::new(frame.clone());
    builder.start(Duration::ZERO, request);

    let sampled = Duration::from_millis(params.settle_delay_ms);
    if let Some(Err(e)) = builder.tick(sampled, profile, &mut frames, &mut NullProjector) {
        return Err(e);
    }
    let done = sampled + Duration::from_millis(params.color_sample_delay_ms);
    builder
        .tick(done, profile, &mut frames, &mut NullProjector)
        .unwrap_or_else(|| {
            Err(CaptureError::NoObjectDetected {
                reason: "capture did not complete".into(),
            })
        })
}
