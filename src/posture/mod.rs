//! Posture classification seam.
//!
//! A `PostureClassifier` watches tracked trajectories and reports who is fallen right now.
//! It reports state, not transitions: a person who stays down is reported on every frame.

use anyhow::Result;

use crate::{FallenSet, TrackedPersons};

mod fall;

pub use fall::{FallDetector, FallDetectorConfig};

pub trait PostureClassifier: Send {
    /// Classifier identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Advance one frame and return every id currently judged fallen.
    ///
    /// Ids the classifier has no history for must be accepted without failing.
    fn update(
        &mut self,
        persons: &TrackedPersons,
        frame_count: u64,
        fps: f32,
    ) -> Result<FallenSet>;
}

impl<T: PostureClassifier + ?Sized> PostureClassifier for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn update(
        &mut self,
        persons: &TrackedPersons,
        frame_count: u64,
        fps: f32,
    ) -> Result<FallenSet> {
        (**self).update(persons, frame_count, fps)
    }
}
