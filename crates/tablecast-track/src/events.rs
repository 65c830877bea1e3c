//! Lifecycle and pose notifications emitted by the engine.

use crate::IdentityKey;
use std::sync::{Arc, Mutex};
use tablecast_template::ObjectPose;

#[derive(Clone, Debug, PartialEq)]
pub enum TrackEvent {
    /// All proxies should be torn down; detection follows on the next step.
    ProxiesCleared,
    Appeared {
        id: u64,
        key: IdentityKey,
        template_index: usize,
        pose: ObjectPose,
    },
    Updated {
        id: u64,
        key: IdentityKey,
        pose: ObjectPose,
    },
    RotationChanged {
        id: u64,
        key: IdentityKey,
        previous_deg: f64,
        orientation_deg: f64,
    },
    Disappeared {
        id: u64,
        key: IdentityKey,
        template_index: usize,
    },
}

/// Everything one engine step produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Number of detection steps run so far (clearing steps do not count).
    pub tick: u64,
    pub events: Vec<TrackEvent>,
}

impl TickReport {
    pub fn appeared(&self) -> usize {
        self.count(|e| matches!(e, TrackEvent::Appeared { .. }))
    }

    pub fn disappeared(&self) -> usize {
        self.count(|e| matches!(e, TrackEvent::Disappeared { .. }))
    }

    pub fn rotations(&self) -> usize {
        self.count(|e| matches!(e, TrackEvent::RotationChanged { .. }))
    }

    fn count(&self, f: impl Fn(&TrackEvent) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

/// Receives every event in emission order.
pub trait TrackObserver {
    fn on_event(&mut self, event: &TrackEvent);
}

impl<F> TrackObserver for F
where
    F: FnMut(&TrackEvent),
{
    fn on_event(&mut self, event: &TrackEvent) {
        self(event)
    }
}

/// Observer that records events; clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<TrackEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackEvent> {
        self.events
            .lock()
            .map(|g| g.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<TrackEvent> {
        match self.events.lock() {
            Ok(mut g) => std::mem::take(&mut *g),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl TrackObserver for EventLog {
    fn on_event(&mut self, event: &TrackEvent) {
        match self.events.lock() {
            Ok(mut g) => g.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
