mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tablecast::calib::CalibrationPhase;
use tablecast::core::{NullProjector, StaticFrames};
use tablecast::track::EventLog;
use tablecast::{CaptureRequest, PipelineConfig, Session, TrackEvent};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.calibration.canvas_width = CANVAS_W;
    cfg.calibration.canvas_height = CANVAS_H;
    cfg
}

fn calibrated_session() -> Session {
    let mut session = Session::new(config());
    let cal = session.calibrator_mut();
    cal.begin();
    cal.detect_surface(&mut StaticFrames::new(surface_frame()))
        .expect("surface quad");
    cal.request_base_capture(ms(0)).expect("armed");

    let mut frames = StaticFrames::new(base_frame());
    assert!(session.tick(ms(500), &mut frames, &mut NullProjector).calibration.is_none());
    let out = session.tick(ms(1000), &mut frames, &mut NullProjector);
    let profile = out.calibration.expect("base capture due").expect("profile");
    assert_eq!(profile.canvas_size(), (CANVAS_W, CANVAS_H));
    assert!(profile.camera_matrix().is_none());
    session
}

#[test]
fn calibrate_capture_and_track() {
    let mut session = calibrated_session();
    let log = EventLog::new();
    session.subscribe(Box::new(log.clone()));

    // capture
    let mut frames = StaticFrames::new(object_frame(150, 100, RED));
    session
        .start_capture(ms(1000), CaptureRequest::new("red block"))
        .expect("calibrated");
    let out = session.tick(ms(1500), &mut frames, &mut NullProjector);
    assert!(out.capture.is_none());
    let out = session.tick(ms(1800), &mut frames, &mut NullProjector);
    let template = out.capture.expect("capture done").expect("template");
    assert_eq!(template.name, "red block");
    assert!(template.white_hue < 0.02 || template.white_hue > 0.98);
    assert_eq!(session.templates().len(), 1);
    assert_eq!(session.calibrator().phase(), CalibrationPhase::Ready);

    // tracking: clearing step, then detection
    session.start_tracking(ms(2000)).expect("calibrated");
    let out = session.tick(ms(2000), &mut frames, &mut NullProjector);
    let report = out.tracking.expect("due").expect("ok");
    assert_eq!(report.events, vec![TrackEvent::ProxiesCleared]);
    let out = session.tick(ms(2001), &mut frames, &mut NullProjector);
    let report = out.tracking.expect("due").expect("ok");
    assert_eq!(report.appeared(), 1, "{:?}", report.events);

    let inst = session.engine().instances().next().expect("tracked");
    assert_eq!(inst.template_name, "red block");
    // camera block center (169.5, 119.5) is canvas pixel ~(119.5, 79.5)
    assert!((inst.pose.centroid.x - (119.5 - 150.0)).abs() < 4.0, "{:?}", inst.pose);
    assert!((inst.pose.centroid.y - (110.0 - 79.5)).abs() < 4.0, "{:?}", inst.pose);

    // object removed
    frames.set(base_frame());
    session.tick(ms(2201), &mut frames, &mut NullProjector);
    let out = session.tick(ms(2202), &mut frames, &mut NullProjector);
    assert_eq!(out.tracking.expect("due").expect("ok").disappeared(), 1);
    assert_eq!(session.engine().instance_count(), 0);

    let seen: Vec<_> = log
        .events()
        .into_iter()
        .filter(|e| !matches!(e, TrackEvent::ProxiesCleared))
        .collect();
    assert_eq!(seen.len(), 2, "{seen:?}");
}

#[test]
fn base_image_can_be_recaptured() {
    let mut session = calibrated_session();
    let first = session.profile().expect("profile");

    session
        .calibrator_mut()
        .request_base_capture(ms(5000))
        .expect("armed");
    let mut frames = StaticFrames::new(base_frame());
    let out = session.tick(ms(6000), &mut frames, &mut NullProjector);
    let second = out.calibration.expect("due").expect("profile");

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.corners, second.corners);
    assert!(Arc::ptr_eq(&session.profile().expect("profile"), &second));
}

#[test]
fn empty_surface_capture_reports_no_object() {
    let mut session = calibrated_session();
    let mut frames = StaticFrames::new(base_frame());
    session
        .start_capture(ms(1000), CaptureRequest::new("nothing"))
        .expect("calibrated");
    let out = session.tick(ms(1500), &mut frames, &mut NullProjector);
    assert!(matches!(
        out.capture,
        Some(Err(tablecast::template::CaptureError::NoObjectDetected { .. }))
    ));
    assert!(session.templates().is_empty());
}

#[test]
fn offline_helpers_match_the_session() {
    let cfg = config();
    let profile =
        tablecast::offline::calibrate_from_images(&cfg.calibration, &surface_frame(), &base_frame())
            .expect("profile");
    let template = tablecast::offline::capture_from_image(
        &profile,
        &object_frame(150, 100, RED),
        CaptureRequest::new("red"),
        &cfg.template,
    )
    .expect("template");
    assert_eq!(template.white_hue, template.color_hue);
    assert_eq!(template.assigned_color, [0, 255, 255]);
}
