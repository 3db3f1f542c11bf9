//! Identity tracking seam.
//!
//! The orchestrator does not know how ids are assigned. It hands each frame's centroid
//! observations to an `IdentityTracker` and reads back whoever the tracker considers present.

use anyhow::Result;

use crate::{CentroidObservation, TrackedPersons};

mod centroid;

pub use centroid::{CentroidTracker, CentroidTrackerConfig};

/// Assigns stable identifiers to per-frame observations.
///
/// Implementations must accept an empty observation slice without failing; it simply means
/// nobody had a usable centroid this frame.
pub trait IdentityTracker: Send {
    /// Tracker identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Advance one frame. `fps` is a tuning hint for time-based thresholds.
    fn update(&mut self, observations: &[CentroidObservation], fps: f32)
        -> Result<TrackedPersons>;
}

impl<T: IdentityTracker + ?Sized> IdentityTracker for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn update(
        &mut self,
        observations: &[CentroidObservation],
        fps: f32,
    ) -> Result<TrackedPersons> {
        (**self).update(observations, fps)
    }
}

/// Convert a duration in seconds into a frame count at `fps`, never below one frame.
pub(crate) fn frames_for(secs: f32, fps: f32) -> u32 {
    let frames = secs * fps;
    if !frames.is_finite() || frames < 1.0 {
        return 1;
    }
    frames.ceil() as u32
}
