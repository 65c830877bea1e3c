//! Tick-driven detection loop and the instance table.

use crate::candidate::{extract_candidates, match_candidates, CandidateMatch};
use crate::instance::{angle_difference_deg, TrackedInstance};
use crate::{IdentityKey, TickReport, TrackError, TrackEvent, TrackObserver, TrackerParams};
use image::RgbImage;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tablecast_calib::CalibrationProfile;
use tablecast_core::{FrameSource, SettleTimer};
use tablecast_template::TemplateLibrary;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineState {
    Inactive,
    /// Waiting for the next tick interval.
    Waiting,
    /// Proxies were torn down on the previous step; detection runs next.
    Cleared,
}

/// Owns the tracked-instance table and turns frames into events.
///
/// Every interval runs as two scheduling steps: first a
/// [`TrackEvent::ProxiesCleared`], then the detection itself on the next
/// [`DetectionEngine::tick`]. Instance records survive the clearing step, so
/// objects that are still present are updated rather than recreated.
pub struct DetectionEngine {
    params: TrackerParams,
    state: EngineState,
    interval: SettleTimer,
    detection_ticks: u64,
    next_id: u64,
    instances: BTreeMap<IdentityKey, TrackedInstance>,
    observers: Vec<Box<dyn TrackObserver>>,
}

impl DetectionEngine {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params: params.validated(),
            state: EngineState::Inactive,
            interval: SettleTimer::new(),
            detection_ticks: 0,
            next_id: 0,
            instances: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != EngineState::Inactive
    }

    pub fn subscribe(&mut self, observer: Box<dyn TrackObserver>) {
        self.observers.push(observer);
    }

    /// Live instances ordered by identity key.
    pub fn instances(&self) -> impl Iterator<Item = &TrackedInstance> {
        self.instances.values()
    }

    pub fn instance(&self, key: &IdentityKey) -> Option<&TrackedInstance> {
        self.instances.get(key)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Start ticking; the first interval elapses immediately.
    pub fn activate(&mut self, now: Duration) {
        if self.is_active() {
            return;
        }
        self.interval.arm(now, Duration::ZERO);
        self.state = EngineState::Waiting;
        log::info!(
            "tracking active, interval {} ms",
            self.params.tick_interval_ms
        );
    }

    /// Stop ticking and drop every instance.
    pub fn deactivate(&mut self) -> TickReport {
        self.interval.cancel();
        self.state = EngineState::Inactive;
        let events = self
            .instances
            .values()
            .map(|inst| TrackEvent::Disappeared {
                id: inst.id,
                key: inst.key,
                template_index: inst.template_index,
            })
            .collect::<Vec<_>>();
        self.instances.clear();
        self.publish(&events);
        log::info!("tracking inactive");
        TickReport {
            tick: self.detection_ticks,
            events,
        }
    }

    /// Advance one scheduling step.
    ///
    /// `Ok(None)` when nothing was due. A missing frame skips the detection
    /// for this interval and leaves the table untouched.
    pub fn tick(
        &mut self,
        now: Duration,
        profile: &CalibrationProfile,
        templates: &TemplateLibrary,
        frames: &mut dyn FrameSource,
    ) -> Result<Option<TickReport>, TrackError> {
        match self.state {
            EngineState::Inactive => Ok(None),
            EngineState::Waiting => {
                if !self.interval.poll(now) {
                    return Ok(None);
                }
                self.state = EngineState::Cleared;
                let events = vec![TrackEvent::ProxiesCleared];
                self.publish(&events);
                Ok(Some(TickReport {
                    tick: self.detection_ticks,
                    events,
                }))
            }
            EngineState::Cleared => {
                self.state = EngineState::Waiting;
                self.interval
                    .arm(now, Duration::from_millis(self.params.tick_interval_ms));
                let frame = frames.latest_frame().ok_or_else(|| {
                    log::debug!("detection skipped: no frame");
                    TrackError::NoFrame
                })?;
                let rectified = profile.rectify_frame(&frame);
                Ok(Some(self.process_frame(
                    &profile.base_image,
                    &rectified,
                    templates,
                )))
            }
        }
    }

    /// Run detection on an already rectified frame and reconcile the table.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(tick = self.detection_ticks + 1))
    )]
    pub fn process_frame(
        &mut self,
        base: &RgbImage,
        rectified: &RgbImage,
        templates: &TemplateLibrary,
    ) -> TickReport {
        let matches = match templates.smallest_area() {
            Some(smallest) => {
                let candidates = extract_candidates(base, rectified, smallest, &self.params);
                match_candidates(&candidates, templates, &self.params)
            }
            None => Vec::new(),
        };
        self.reconcile(&matches, templates)
    }

    /// Apply one tick's matches: update or create instances by key, then drop
    /// every instance not seen this tick.
    pub fn reconcile(
        &mut self,
        matches: &[CandidateMatch],
        templates: &TemplateLibrary,
    ) -> TickReport {
        self.detection_ticks += 1;
        let tick = self.detection_ticks;
        let mut events = Vec::new();
        let mut seen = BTreeSet::new();

        for m in matches {
            if !seen.insert(m.key) {
                log::trace!("key {} already claimed this tick", m.key);
                continue;
            }
            let same_template = self
                .instances
                .get(&m.key)
                .map(|inst| inst.template_index == m.template_index);
            match same_template {
                Some(true) => self.update_instance(m, tick, &mut events),
                replaced => {
                    if replaced.is_some() {
                        if let Some(old) = self.instances.remove(&m.key) {
                            events.push(TrackEvent::Disappeared {
                                id: old.id,
                                key: old.key,
                                template_index: old.template_index,
                            });
                        }
                    }
                    let inst = self.create_instance(m, templates, tick);
                    events.push(TrackEvent::Appeared {
                        id: inst.id,
                        key: inst.key,
                        template_index: inst.template_index,
                        pose: inst.pose,
                    });
                    self.instances.insert(m.key, inst);
                }
            }
        }

        // stale removal only after every match is applied
        let stale: Vec<IdentityKey> = self
            .instances
            .keys()
            .filter(|k| !seen.contains(*k))
            .copied()
            .collect();
        for key in stale {
            if let Some(inst) = self.instances.remove(&key) {
                events.push(TrackEvent::Disappeared {
                    id: inst.id,
                    key,
                    template_index: inst.template_index,
                });
            }
        }

        self.publish(&events);
        let report = TickReport { tick, events };
        log::debug!(
            "tick {tick}: {} live, +{} -{} rot {}",
            self.instances.len(),
            report.appeared(),
            report.disappeared(),
            report.rotations()
        );
        report
    }

    fn update_instance(&mut self, m: &CandidateMatch, tick: u64, events: &mut Vec<TrackEvent>) {
        let threshold = self.params.rotation_threshold_deg;
        let Some(inst) = self.instances.get_mut(&m.key) else {
            return;
        };
        inst.pose = m.pose;
        inst.last_seen_tick = tick;
        events.push(TrackEvent::Updated {
            id: inst.id,
            key: m.key,
            pose: m.pose,
        });
        let delta = angle_difference_deg(m.pose.orientation_deg, inst.notified_orientation_deg);
        if delta > threshold {
            events.push(TrackEvent::RotationChanged {
                id: inst.id,
                key: m.key,
                previous_deg: inst.notified_orientation_deg,
                orientation_deg: m.pose.orientation_deg,
            });
            inst.notified_orientation_deg = m.pose.orientation_deg;
        }
    }

    fn create_instance(
        &mut self,
        m: &CandidateMatch,
        templates: &TemplateLibrary,
        tick: u64,
    ) -> TrackedInstance {
        self.next_id += 1;
        let (template_name, assigned_color) = templates
            .get(m.template_index)
            .map(|t| (t.name.clone(), t.assigned_color))
            .unwrap_or_default();
        TrackedInstance {
            id: self.next_id,
            key: m.key,
            template_index: m.template_index,
            template_name,
            assigned_color,
            pose: m.pose,
            last_seen_tick: tick,
            notified_orientation_deg: m.pose.orientation_deg,
        }
    }

    fn publish(&mut self, events: &[TrackEvent]) {
        for observer in &mut self.observers {
            for event in events {
                observer.on_event(event);
            }
        }
    }
}
