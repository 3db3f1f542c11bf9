//! Per-frame fall event orchestration.
//!
//! `FallOrchestrator::process_detections` is the single per-frame entry point. It owns one
//! `EventCounter` for the lifetime of a video stream; build a new orchestrator to start over.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::SentinelConfig;
use crate::pose::{centroid_of, PoseSource};
use crate::posture::{FallDetector, PostureClassifier};
use crate::track::{CentroidTracker, IdentityTracker};
use crate::{BoundingBox, CentroidObservation, FallenSet, PersonId};

// -------------------- Events --------------------

/// One id entering the fallen set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FallEvent {
    pub id: PersonId,
    /// Fall count including this event.
    pub total: u64,
    /// Zero-based index of the frame that produced the event.
    pub frame: u64,
    pub bbox: BoundingBox,
}

// -------------------- Counter State --------------------

/// Process-lifetime counters. Mutated exactly once per processed frame.
#[derive(Clone, Debug, Default)]
pub struct EventCounter {
    fall_count: u64,
    frame_count: u64,
    previous_fallen: FallenSet,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct fall events so far. Never decreases.
    pub fn fall_count(&self) -> u64 {
        self.fall_count
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn previous_fallen(&self) -> &FallenSet {
        &self.previous_fallen
    }

    /// Fold one frame's fallen set in and return the ids that newly entered it.
    ///
    /// Only membership in the immediately preceding frame matters, so an id that recovers
    /// and goes down again is counted again.
    fn record_frame(&mut self, fallen: &FallenSet) -> Vec<FallEvent> {
        let mut events = Vec::new();
        for (&id, &bbox) in fallen {
            if self.previous_fallen.contains_key(&id) {
                continue;
            }
            self.fall_count += 1;
            events.push(FallEvent {
                id,
                total: self.fall_count,
                frame: self.frame_count,
                bbox,
            });
        }
        self.previous_fallen = fallen.clone();
        self.frame_count += 1;
        events
    }
}

// -------------------- Orchestrator --------------------

/// Undrained events kept by default before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Drives centroid extraction, tracking, posture classification and event counting.
///
/// New falls are also queued for `take_events`. The queue is bounded: once it holds
/// `event_capacity` undrained events the oldest is dropped. Dropped events still count.
///
/// Not synchronized: wrap it in a `SharedOrchestrator` to call it from several threads.
pub struct FallOrchestrator<T = CentroidTracker, C = FallDetector> {
    tracker: T,
    classifier: C,
    counter: EventCounter,
    pending_events: VecDeque<FallEvent>,
    event_capacity: usize,
}

impl FallOrchestrator<CentroidTracker, FallDetector> {
    /// Orchestrator over the built-in tracker and classifier.
    pub fn from_config(cfg: &SentinelConfig) -> Self {
        Self::new(
            CentroidTracker::new(cfg.tracker.clone()),
            FallDetector::new(cfg.classifier.clone()),
        )
    }
}

impl Default for FallOrchestrator<CentroidTracker, FallDetector> {
    fn default() -> Self {
        Self::new(CentroidTracker::default(), FallDetector::default())
    }
}

impl<T: IdentityTracker, C: PostureClassifier> FallOrchestrator<T, C> {
    pub fn new(tracker: T, classifier: C) -> Self {
        log::debug!(
            "orchestrator: tracker={} classifier={}",
            tracker.name(),
            classifier.name()
        );
        Self {
            tracker,
            classifier,
            counter: EventCounter::new(),
            pending_events: VecDeque::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Bound the undrained event queue. Zero disables queueing; falls are still logged and
    /// counted.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self.trim_events();
        self
    }

    /// Process one frame of detections.
    ///
    /// Returns the running fall count and everyone currently fallen. `fps` is forwarded to
    /// the collaborators untouched.
    ///
    /// Malformed keypoints and collaborator errors abort the frame before any counter is
    /// touched; the caller decides whether to skip the frame or stop the stream.
    pub fn process_detections<D: PoseSource>(
        &mut self,
        detections: &[D],
        fps: f32,
    ) -> Result<(u64, FallenSet)> {
        let frame = self.counter.frame_count;
        let observations = centroid_observations(detections)
            .with_context(|| format!("frame {}", frame))?;
        log::trace!(
            "frame {}: {} detections, {} with centroids",
            frame,
            detections.len(),
            observations.len()
        );

        let persons = self.tracker.update(&observations, fps)?;
        let fallen = self.classifier.update(&persons, frame, fps)?;

        let events = self.counter.record_frame(&fallen);
        for ev in &events {
            log::warn!(
                "new fall detected: id {} total={} frame={}",
                ev.id,
                ev.total,
                ev.frame
            );
        }
        self.pending_events.extend(events);
        self.trim_events();

        Ok((self.counter.fall_count, fallen))
    }

    pub fn fall_count(&self) -> u64 {
        self.counter.fall_count()
    }

    pub fn frame_count(&self) -> u64 {
        self.counter.frame_count()
    }

    pub fn counter(&self) -> &EventCounter {
        &self.counter
    }

    /// Drain fall events recorded since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<FallEvent> {
        self.pending_events.drain(..).collect()
    }

    fn trim_events(&mut self) {
        let excess = self.pending_events.len().saturating_sub(self.event_capacity);
        if excess > 0 {
            log::debug!("event queue full: dropping {} oldest undrained events", excess);
            self.pending_events.drain(..excess);
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

/// Build tracker input for one frame, keeping detection order and dropping detections
/// without a determined centroid.
fn centroid_observations<D: PoseSource>(detections: &[D]) -> Result<Vec<CentroidObservation>> {
    let mut observations = Vec::with_capacity(detections.len());
    for (idx, det) in detections.iter().enumerate() {
        let bbox = det.bbox();
        let centroid =
            centroid_of(det.keypoints()).with_context(|| format!("detection {}", idx))?;
        if let Some(centroid) = centroid {
            observations.push(CentroidObservation { centroid, bbox });
        }
    }
    Ok(observations)
}

// -------------------- Shared Handle --------------------

/// Cloneable, thread-safe handle. The lock is held for a whole frame.
pub struct SharedOrchestrator<T = CentroidTracker, C = FallDetector> {
    inner: Arc<Mutex<FallOrchestrator<T, C>>>,
}

impl<T, C> Clone for SharedOrchestrator<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: IdentityTracker, C: PostureClassifier> SharedOrchestrator<T, C> {
    pub fn new(orchestrator: FallOrchestrator<T, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(orchestrator)),
        }
    }

    pub fn process_detections<D: PoseSource>(
        &self,
        detections: &[D],
        fps: f32,
    ) -> Result<(u64, FallenSet)> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("orchestrator lock poisoned"))?;
        guard.process_detections(detections, fps)
    }

    pub fn fall_count(&self) -> Result<u64> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("orchestrator lock poisoned"))?;
        Ok(guard.fall_count())
    }

    pub fn frame_count(&self) -> Result<u64> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("orchestrator lock poisoned"))?;
        Ok(guard.frame_count())
    }

    pub fn take_events(&self) -> Result<Vec<FallEvent>> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("orchestrator lock poisoned"))?;
        Ok(guard.take_events())
    }
}
