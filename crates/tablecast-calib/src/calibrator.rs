//! Surface calibration state machine.

use crate::intrinsics::{board_points, solve_intrinsics, PatternView};
use crate::pattern::find_pattern_corners;
use crate::surface::detect_surface_corners;
use crate::{CalibrationError, CalibrationProfile, CalibratorParams};
use std::sync::Arc;
use std::time::Duration;
use tablecast_core::{
    compute_rectification, FrameSource, LensIntrinsics, Point, Rectifier, SettleTimer,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Where the calibrator is in its run.
///
/// `Uninitialized → Detecting → (RectangleFound | NoRectangle) →
/// [PatternCalibrating → (PatternFound | PatternMissing)] → AwaitingBaseImage →
/// BaseImageCaptured → Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalibrationPhase {
    Uninitialized,
    Detecting,
    RectangleFound,
    NoRectangle,
    PatternCalibrating,
    PatternFound,
    PatternMissing,
    AwaitingBaseImage,
    BaseImageCaptured,
    Ready,
}

/// Drives one projector-camera calibration and publishes [`CalibrationProfile`]s.
///
/// Every step is triggered explicitly by the caller; failures leave the
/// previously published profile in place.
pub struct SurfaceCalibrator {
    params: CalibratorParams,
    phase: CalibrationPhase,
    /// Screen quad as observed in raw (distorted) camera frames.
    raw_corners: Option<[Point; 4]>,
    frame_size: Option<(u32, u32)>,
    lens: Option<LensIntrinsics>,
    lens_views: Vec<PatternView>,
    base_timer: SettleTimer,
    profile: Option<Arc<CalibrationProfile>>,
}

impl SurfaceCalibrator {
    pub fn new(params: CalibratorParams) -> Self {
        Self {
            params,
            phase: CalibrationPhase::Uninitialized,
            raw_corners: None,
            frame_size: None,
            lens: None,
            lens_views: Vec::new(),
            base_timer: SettleTimer::new(),
            profile: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    #[inline]
    pub fn params(&self) -> &CalibratorParams {
        &self.params
    }

    /// Latest published profile, if any.
    pub fn profile(&self) -> Option<Arc<CalibrationProfile>> {
        self.profile.clone()
    }

    /// Current lens estimate (may exist before a profile is published).
    pub fn lens(&self) -> Option<LensIntrinsics> {
        self.lens
    }

    pub fn lens_view_count(&self) -> usize {
        self.lens_views.len()
    }

    /// Start a (re)calibration run. Cancels a pending base capture.
    ///
    /// The last detected quad and the published profile stay in place until a
    /// new detection or capture replaces them, so a failed re-detection can
    /// still be followed by a base recapture.
    pub fn begin(&mut self) {
        self.base_timer.cancel();
        self.phase = CalibrationPhase::Detecting;
        log::info!("calibration run started");
    }

    /// Look for the projected rectangle in the latest frame.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn detect_surface(
        &mut self,
        frames: &mut dyn FrameSource,
    ) -> Result<[Point; 4], CalibrationError> {
        if self.phase == CalibrationPhase::Uninitialized {
            self.begin();
        }
        let frame = frames.latest_frame().ok_or(CalibrationError::NoFrame)?;
        self.phase = CalibrationPhase::Detecting;

        match detect_surface_corners(&frame, &self.params.surface) {
            Ok(corners) => {
                // a pending base capture would pair an old quad with a new one
                self.base_timer.cancel();
                self.raw_corners = Some(corners);
                self.frame_size = Some(frame.dimensions());
                self.phase = CalibrationPhase::RectangleFound;
                Ok(corners)
            }
            Err(e) => {
                self.phase = CalibrationPhase::NoRectangle;
                Err(e)
            }
        }
    }

    fn require_corners(&self) -> Result<[Point; 4], CalibrationError> {
        self.raw_corners
            .ok_or(CalibrationError::NotReady { phase: self.phase })
    }

    /// Rectifier for the raw camera image (no undistortion).
    fn raw_rectifier(&self) -> Result<Rectifier, CalibrationError> {
        let corners = self.require_corners()?;
        Ok(compute_rectification(
            &corners,
            self.params.rotation_mode,
            self.params.canvas_width,
            self.params.canvas_height,
        )?)
    }

    /// Rectifier matching the current lens state: corners are undistorted first
    /// when intrinsics are known.
    fn working_rectifier(&self) -> Result<Rectifier, CalibrationError> {
        let corners = self.require_corners()?;
        let corners = match &self.lens {
            Some(lens) => corners.map(|p| lens.undistort_pixel(p)),
            None => corners,
        };
        Ok(compute_rectification(
            &corners,
            self.params.rotation_mode,
            self.params.canvas_width,
            self.params.canvas_height,
        )?)
    }

    /// Read the calibration pattern from the latest frame and refine the lens
    /// model. Views accumulate until [`SurfaceCalibrator::reset_lens_views`].
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn calibrate_lens(
        &mut self,
        frames: &mut dyn FrameSource,
    ) -> Result<LensIntrinsics, CalibrationError> {
        let rectifier = self.raw_rectifier()?;
        let frame = frames.latest_frame().ok_or(CalibrationError::NoFrame)?;
        let prior = self.phase;
        self.phase = CalibrationPhase::PatternCalibrating;

        let result = self.solve_lens_from_frame(&rectifier, &frame);
        self.phase = match &result {
            Ok(_) => CalibrationPhase::PatternFound,
            Err(e @ CalibrationError::PatternMissing { .. }) => {
                log::warn!("lens calibration failed: {e}");
                CalibrationPhase::PatternMissing
            }
            Err(e) => {
                log::warn!("pattern read but view rejected by the lens solve: {e}");
                prior
            }
        };
        result
    }

    fn solve_lens_from_frame(
        &mut self,
        rectifier: &Rectifier,
        frame: &image::RgbImage,
    ) -> Result<LensIntrinsics, CalibrationError> {
        let lens_params = &self.params.lens;
        let rectified = rectifier.rectify_gray(&image::imageops::grayscale(frame));
        let canvas_pts = find_pattern_corners(&rectified, lens_params)?;
        let camera_pts: Vec<Point> = canvas_pts.iter().map(|p| rectifier.to_camera(*p)).collect();
        let board = board_points(
            lens_params.pattern_cols,
            lens_params.pattern_rows,
            lens_params.square_size,
        );

        let view = PatternView::new(board, camera_pts)?;
        let (w, h) = frame.dimensions();
        self.add_lens_view(view, w, h)
    }

    /// Solve with `view` appended; the view is kept only when the solve
    /// succeeds.
    fn add_lens_view(
        &mut self,
        view: PatternView,
        width: u32,
        height: u32,
    ) -> Result<LensIntrinsics, CalibrationError> {
        let mut views = self.lens_views.clone();
        views.push(view);
        let lens = solve_intrinsics(&views, width, height, &self.params.lens)?;
        self.lens_views = views;
        self.lens = Some(lens);
        Ok(lens)
    }

    /// Forget accumulated pattern views (the current lens estimate is kept).
    pub fn reset_lens_views(&mut self) {
        self.lens_views.clear();
    }

    /// Drop the lens model so frames are no longer undistorted.
    pub fn clear_lens(&mut self) {
        self.lens = None;
        self.lens_views.clear();
    }

    /// Arm the settle delay before grabbing the base image. Also used to
    /// refresh the base image of a published profile without recalibrating.
    pub fn request_base_capture(&mut self, now: Duration) -> Result<(), CalibrationError> {
        self.require_corners()?;
        self.base_timer
            .arm(now, Duration::from_millis(self.params.base_settle_ms));
        self.phase = CalibrationPhase::AwaitingBaseImage;
        log::debug!("base capture armed for +{} ms", self.params.base_settle_ms);
        Ok(())
    }

    /// Advance timers. Returns a newly published profile (or the capture
    /// failure) on the tick where the base image is taken.
    pub fn tick(
        &mut self,
        now: Duration,
        frames: &mut dyn FrameSource,
    ) -> Option<Result<Arc<CalibrationProfile>, CalibrationError>> {
        if self.phase == CalibrationPhase::BaseImageCaptured {
            self.phase = CalibrationPhase::Ready;
            return None;
        }
        if !self.base_timer.poll(now) {
            return None;
        }
        Some(self.capture_base(frames))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn capture_base(
        &mut self,
        frames: &mut dyn FrameSource,
    ) -> Result<Arc<CalibrationProfile>, CalibrationError> {
        let corners = self.require_corners()?;
        let rectifier = self.working_rectifier()?;
        let frame = frames.latest_frame().ok_or_else(|| {
            log::warn!("base capture: no frame");
            CalibrationError::NoFrame
        })?;

        let staged = CalibrationProfile {
            corners,
            rectifier,
            lens: self.lens,
            base_image: image::RgbImage::new(0, 0),
        };
        let base_image = staged.rectify_frame(&frame);
        let profile = Arc::new(staged.with_base_image(base_image));

        self.profile = Some(Arc::clone(&profile));
        self.phase = CalibrationPhase::BaseImageCaptured;
        log::info!(
            "calibration profile published ({}x{} canvas, lens: {})",
            rectifier.width,
            rectifier.height,
            self.lens.is_some()
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tablecast_core::StaticFrames;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn camera_frame() -> RgbImage {
        RgbImage::from_fn(320, 240, |x, y| {
            if (40..=279).contains(&x) && (30..=209).contains(&y) {
                Rgb([200, 200, 200])
            } else {
                Rgb([10, 10, 10])
            }
        })
    }

    fn params() -> CalibratorParams {
        CalibratorParams {
            canvas_width: 120,
            canvas_height: 90,
            base_settle_ms: 100,
            ..CalibratorParams::default()
        }
    }

    #[test]
    fn full_run_publishes_profile_after_settle() {
        let mut cal = SurfaceCalibrator::new(params());
        let mut frames = StaticFrames::new(camera_frame());

        cal.begin();
        cal.detect_surface(&mut frames).expect("quad");
        assert_eq!(cal.phase(), CalibrationPhase::RectangleFound);

        cal.request_base_capture(ms(0)).expect("armed");
        assert_eq!(cal.phase(), CalibrationPhase::AwaitingBaseImage);
        assert!(cal.tick(ms(50), &mut frames).is_none());

        let profile = cal.tick(ms(100), &mut frames).expect("fired").expect("profile");
        assert_eq!(profile.base_image.dimensions(), (120, 90));
        assert!(profile.lens.is_none());
        assert!(profile.camera_matrix().is_none());
        assert_eq!(cal.phase(), CalibrationPhase::BaseImageCaptured);

        assert!(cal.tick(ms(200), &mut frames).is_none());
        assert_eq!(cal.phase(), CalibrationPhase::Ready);

        // rectified base is the bright screen
        let center = profile.base_image.get_pixel(60, 45);
        assert_eq!(center, &Rgb([200, 200, 200]));
    }

    #[test]
    fn failed_detection_keeps_previous_profile() {
        let mut cal = SurfaceCalibrator::new(params());
        let mut frames = StaticFrames::new(camera_frame());
        cal.detect_surface(&mut frames).expect("quad");
        cal.request_base_capture(ms(0)).expect("armed");
        let first = cal.tick(ms(100), &mut frames).expect("fired").expect("profile");

        cal.begin();
        frames.set(RgbImage::from_pixel(320, 240, Rgb([10, 10, 10])));
        let err = cal.detect_surface(&mut frames).unwrap_err();
        assert!(matches!(err, CalibrationError::NoRectangleFound { .. }));
        assert_eq!(cal.phase(), CalibrationPhase::NoRectangle);
        let kept = cal.profile().expect("still published");
        assert!(Arc::ptr_eq(&first, &kept));
    }

    #[test]
    fn base_capture_requires_a_rectangle() {
        let mut cal = SurfaceCalibrator::new(params());
        assert_eq!(
            cal.request_base_capture(ms(0)),
            Err(CalibrationError::NotReady {
                phase: CalibrationPhase::Uninitialized
            })
        );
        let mut frames = StaticFrames::empty();
        assert!(matches!(
            cal.calibrate_lens(&mut frames),
            Err(CalibrationError::NotReady { .. })
        ));
    }

    #[test]
    fn recalibration_cancels_pending_capture() {
        let mut cal = SurfaceCalibrator::new(params());
        let mut frames = StaticFrames::new(camera_frame());
        cal.detect_surface(&mut frames).expect("quad");
        cal.request_base_capture(ms(0)).expect("armed");
        cal.begin();
        assert!(cal.tick(ms(500), &mut frames).is_none());
        assert!(cal.profile().is_none());
    }

    #[test]
    fn missing_frame_is_reported() {
        let mut cal = SurfaceCalibrator::new(params());
        let mut frames = StaticFrames::new(camera_frame());
        cal.detect_surface(&mut frames).expect("quad");
        cal.request_base_capture(ms(0)).expect("armed");
        frames.clear();
        assert_eq!(
            cal.tick(ms(100), &mut frames).expect("fired").unwrap_err(),
            CalibrationError::NoFrame
        );
        assert!(cal.profile().is_none());
    }

    #[test]
    fn missing_pattern_adds_no_view_and_clearing_drops_the_lens() {
        let mut cal = SurfaceCalibrator::new(params());
        let mut frames = StaticFrames::new(camera_frame());
        cal.detect_surface(&mut frames).expect("quad");

        let err = cal.calibrate_lens(&mut frames).unwrap_err();
        assert!(matches!(err, CalibrationError::PatternMissing { .. }));
        assert_eq!(cal.phase(), CalibrationPhase::PatternMissing);
        assert_eq!(cal.lens_view_count(), 0);
        assert!(cal.lens().is_none());

        cal.clear_lens();
        assert!(cal.lens().is_none());
        assert_eq!(cal.lens_view_count(), 0);

        // surface corners survive a failed pattern read
        cal.request_base_capture(ms(0)).expect("armed");
        let profile = cal.tick(ms(100), &mut frames).expect("fired").expect("profile");
        assert!(profile.lens.is_none());
    }

    #[test]
    fn base_recapture_survives_a_failed_redetection() {
        let mut cal = SurfaceCalibrator::new(params());
        let mut frames = StaticFrames::new(camera_frame());
        let corners = cal.detect_surface(&mut frames).expect("quad");
        cal.request_base_capture(ms(0)).expect("armed");
        let first = cal.tick(ms(100), &mut frames).expect("fired").expect("profile");

        cal.begin();
        frames.set(RgbImage::from_pixel(320, 240, Rgb([10, 10, 10])));
        assert!(cal.detect_surface(&mut frames).is_err());
        assert_eq!(cal.phase(), CalibrationPhase::NoRectangle);

        cal.request_base_capture(ms(200)).expect("last good quad kept");
        let second = cal.tick(ms(300), &mut frames).expect("fired").expect("profile");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.corners, corners);
        assert_eq!(second.base_image.get_pixel(60, 45), &Rgb([10, 10, 10]));
    }

    fn view_through(k: nalgebra::Matrix3<f64>, tilt: (f64, f64)) -> PatternView {
        let board = board_points(9, 6, 0.05);
        let rot = nalgebra::Rotation3::from_euler_angles(tilt.0, tilt.1, 0.0);
        let t = nalgebra::Vector3::new(-0.2, -0.15, 1.0);
        let image = board
            .iter()
            .map(|p| {
                let pi = k * (rot * nalgebra::Vector3::new(p.x, p.y, 0.0) + t);
                Point::new(pi.x / pi.z, pi.y / pi.z)
            })
            .collect();
        PatternView::new(board, image).expect("view")
    }

    #[test]
    fn rejected_lens_view_is_not_kept() {
        let mut cal = SurfaceCalibrator::new(params());
        let k = nalgebra::Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);

        // fronto-parallel: no perspective, focal length unobservable
        let flat = view_through(k, (0.0, 0.0));
        assert_eq!(
            cal.add_lens_view(flat, 640, 480),
            Err(CalibrationError::DegenerateIntrinsics)
        );
        assert_eq!(cal.lens_view_count(), 0);
        assert!(cal.lens().is_none());

        let lens = cal.add_lens_view(view_through(k, (-0.1, 0.35)), 640, 480).expect("lens");
        assert_eq!(cal.lens_view_count(), 1);
        assert!((lens.fx - 800.0).abs() < 10.0, "fx {}", lens.fx);
    }
}
