use anyhow::Result;
use std::collections::{HashMap, VecDeque};

use super::PostureClassifier;
use crate::track::frames_for;
use crate::{FallenSet, PersonId, TrackedPersons};

const DEFAULT_WINDOW_SECS: f32 = 1.0;
const DEFAULT_MIN_DROP_RATIO: f32 = 0.5;
const DEFAULT_LYING_ASPECT_RATIO: f32 = 1.2;
const DEFAULT_RECOVER_ASPECT_RATIO: f32 = 0.9;
const DEFAULT_FORGET_AFTER_FRAMES: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct FallDetectorConfig {
    /// Trajectory window the drop is measured over.
    pub window_secs: f32,
    /// Minimum centroid drop, as a fraction of the tallest box seen in the window.
    pub min_drop_ratio: f32,
    /// Box width/height at or above which a person counts as lying.
    pub lying_aspect_ratio: f32,
    /// A fallen person stays fallen while width/height stays at or above this.
    pub recover_aspect_ratio: f32,
    /// Histories of ids unseen for longer than this are dropped.
    pub forget_after_frames: u64,
}

impl Default for FallDetectorConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            min_drop_ratio: DEFAULT_MIN_DROP_RATIO,
            lying_aspect_ratio: DEFAULT_LYING_ASPECT_RATIO,
            recover_aspect_ratio: DEFAULT_RECOVER_ASPECT_RATIO,
            forget_after_frames: DEFAULT_FORGET_AFTER_FRAMES,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    frame: u64,
    y: f32,
    height: f32,
}

#[derive(Debug, Default)]
struct History {
    samples: VecDeque<Sample>,
    fallen: bool,
    last_seen: u64,
}

/// Trajectory-based fall classifier.
///
/// A person falls when their centroid drops sharply within the window and their box ends up
/// wider than tall. They stay fallen until the box turns upright again.
pub struct FallDetector {
    config: FallDetectorConfig,
    histories: HashMap<PersonId, History>,
}

impl FallDetector {
    pub fn new(config: FallDetectorConfig) -> Self {
        Self {
            config,
            histories: HashMap::new(),
        }
    }

    /// Number of ids with a retained history.
    pub fn tracked_histories(&self) -> usize {
        self.histories.len()
    }

    fn dropped_sharply(&self, history: &History, current_y: f32) -> bool {
        let top = history
            .samples
            .iter()
            .map(|s| s.y)
            .fold(f32::INFINITY, f32::min);
        let standing_height = history
            .samples
            .iter()
            .map(|s| s.height)
            .fold(0.0, f32::max);
        if standing_height <= 0.0 {
            return false;
        }
        current_y - top >= self.config.min_drop_ratio * standing_height
    }
}

impl Default for FallDetector {
    fn default() -> Self {
        Self::new(FallDetectorConfig::default())
    }
}

impl PostureClassifier for FallDetector {
    fn name(&self) -> &'static str {
        "trajectory"
    }

    fn update(
        &mut self,
        persons: &TrackedPersons,
        frame_count: u64,
        fps: f32,
    ) -> Result<FallenSet> {
        let window = u64::from(frames_for(self.config.window_secs, fps).max(2));
        let mut fallen = FallenSet::new();

        for (&id, person) in persons {
            let sample = Sample {
                frame: frame_count,
                y: person.centroid.y,
                height: person.bbox.h,
            };

            let Some(mut history) = self.histories.remove(&id) else {
                let mut history = History {
                    last_seen: frame_count,
                    ..History::default()
                };
                history.samples.push_back(sample);
                self.histories.insert(id, history);
                continue;
            };

            history.samples.push_back(sample);
            history.last_seen = frame_count;
            while history
                .samples
                .front()
                .is_some_and(|s| s.frame + window < frame_count)
            {
                history.samples.pop_front();
            }

            let aspect = person.bbox.aspect_ratio();
            if history.fallen {
                if !aspect.is_some_and(|a| a >= self.config.recover_aspect_ratio) {
                    history.fallen = false;
                    log::debug!("posture: id {} upright again at frame {}", id, frame_count);
                }
            } else if aspect.is_some_and(|a| a >= self.config.lying_aspect_ratio)
                && self.dropped_sharply(&history, person.centroid.y)
            {
                history.fallen = true;
                log::debug!("posture: id {} down at frame {}", id, frame_count);
            }

            if history.fallen {
                fallen.insert(id, person.bbox);
            }
            self.histories.insert(id, history);
        }

        let forget_after = self.config.forget_after_frames;
        self.histories
            .retain(|_, h| frame_count.saturating_sub(h.last_seen) <= forget_after);

        Ok(fallen)
    }
}
