//! Fall Sentinel
//!
//! This crate turns per-frame human pose detections into a count of distinct fall events.
//!
//! # Architecture
//!
//! Every frame flows one way through the pipeline:
//!
//! 1. **Centroids**: each detection's shoulder keypoints are reduced to one reference point.
//! 2. **Identities**: an `IdentityTracker` assigns stable ids to the centroids.
//! 3. **Posture**: a `PostureClassifier` reports which tracked ids are currently fallen.
//! 4. **Events**: the `FallOrchestrator` diffs the fallen set against the previous frame and
//!    counts every id that newly entered it.
//!
//! # Module Structure
//!
//! - `pose`: detection records, keypoint ingestion, centroid extraction
//! - `track`: identity tracker seam and the greedy `CentroidTracker`
//! - `posture`: posture classifier seam and the trajectory-based `FallDetector`
//! - `orchestrator`: per-frame reduction and event counter state
//! - `ingest`: JSON-lines detection recordings
//! - `config`: file + environment configuration

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod ingest;
pub mod orchestrator;
pub mod pose;
pub mod posture;
pub mod track;

pub use config::SentinelConfig;
pub use orchestrator::{EventCounter, FallEvent, FallOrchestrator, SharedOrchestrator};
pub use pose::{centroid_of, Detection, KeypointIndex, Keypoints, PoseSource};
pub use posture::{FallDetector, FallDetectorConfig, PostureClassifier};
pub use track::{CentroidTracker, CentroidTrackerConfig, IdentityTracker};

// -------------------- Geometry --------------------

/// A 2D image-space point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box: top-left corner plus extent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Width over height. `None` for a degenerate box with no height.
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.h > 0.0 {
            Some(self.w / self.h)
        } else {
            None
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

// -------------------- Tracking Types --------------------

/// Identifier assigned by an identity tracker. Stable while the person stays tracked.
pub type PersonId = u64;

/// Tracker input for one detection with a determined centroid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CentroidObservation {
    pub centroid: Point,
    pub bbox: BoundingBox,
}

/// Current state of one tracked person as reported by the tracker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedPerson {
    pub centroid: Point,
    pub bbox: BoundingBox,
}

/// Tracked persons in the tracker's own order.
pub type TrackedPersons = IndexMap<PersonId, TrackedPerson>;

/// Everyone classified as fallen in one frame, with their boxes.
pub type FallenSet = IndexMap<PersonId, BoundingBox>;
