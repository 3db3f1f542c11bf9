use anyhow::Result;
use indexmap::IndexMap;

use super::{frames_for, IdentityTracker};
use crate::{BoundingBox, CentroidObservation, PersonId, Point, TrackedPerson, TrackedPersons};

const DEFAULT_MAX_DISTANCE: f32 = 80.0;
const DEFAULT_MAX_DISAPPEARED_SECS: f32 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct CentroidTrackerConfig {
    /// Largest centroid jump, in pixels, still treated as the same person.
    pub max_distance: f32,
    /// How long a track may go unmatched before its id is retired.
    pub max_disappeared_secs: f32,
}

impl Default for CentroidTrackerConfig {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_DISTANCE,
            max_disappeared_secs: DEFAULT_MAX_DISAPPEARED_SECS,
        }
    }
}

#[derive(Clone, Debug)]
struct Track {
    centroid: Point,
    bbox: BoundingBox,
    disappeared: u32,
}

/// Greedy nearest-centroid tracker.
///
/// Each frame, track/observation pairs are matched in ascending distance order. Leftover
/// observations open new tracks; leftover tracks age and are retired after
/// `max_disappeared_secs` worth of frames. Ids are never reused.
pub struct CentroidTracker {
    config: CentroidTrackerConfig,
    next_id: PersonId,
    tracks: IndexMap<PersonId, Track>,
}

impl CentroidTracker {
    pub fn new(config: CentroidTrackerConfig) -> Self {
        Self {
            config,
            next_id: 0,
            tracks: IndexMap::new(),
        }
    }

    /// Number of live tracks, including ones currently unmatched.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn register(&mut self, obs: &CentroidObservation) -> PersonId {
        let id = self.next_id;
        self.next_id += 1;
        self.tracks.insert(
            id,
            Track {
                centroid: obs.centroid,
                bbox: obs.bbox,
                disappeared: 0,
            },
        );
        log::debug!(
            "tracker: registered id {} at ({:.1}, {:.1})",
            id,
            obs.centroid.x,
            obs.centroid.y
        );
        id
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(CentroidTrackerConfig::default())
    }
}

impl IdentityTracker for CentroidTracker {
    fn name(&self) -> &'static str {
        "centroid"
    }

    fn update(
        &mut self,
        observations: &[CentroidObservation],
        fps: f32,
    ) -> Result<TrackedPersons> {
        let max_disappeared = frames_for(self.config.max_disappeared_secs, fps);

        let mut pairs: Vec<(f32, PersonId, usize)> = Vec::new();
        for (&id, track) in &self.tracks {
            for (idx, obs) in observations.iter().enumerate() {
                let dist = track.centroid.distance(&obs.centroid);
                if dist <= self.config.max_distance {
                    pairs.push((dist, id, idx));
                }
            }
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut matched_tracks: Vec<PersonId> = Vec::new();
        let mut matched_obs = vec![false; observations.len()];
        for (_, id, idx) in pairs {
            if matched_obs[idx] || matched_tracks.contains(&id) {
                continue;
            }
            if let Some(track) = self.tracks.get_mut(&id) {
                track.centroid = observations[idx].centroid;
                track.bbox = observations[idx].bbox;
                track.disappeared = 0;
            }
            matched_obs[idx] = true;
            matched_tracks.push(id);
        }

        self.tracks.retain(|id, track| {
            if matched_tracks.contains(id) {
                return true;
            }
            track.disappeared += 1;
            if track.disappeared > max_disappeared {
                log::debug!(
                    "tracker: retired id {} after {} missed frames",
                    id,
                    track.disappeared
                );
                return false;
            }
            true
        });

        for (idx, obs) in observations.iter().enumerate() {
            if !matched_obs[idx] {
                self.register(obs);
            }
        }

        Ok(self
            .tracks
            .iter()
            .filter(|(_, track)| track.disappeared == 0)
            .map(|(&id, track)| {
                (
                    id,
                    TrackedPerson {
                        centroid: track.centroid,
                        bbox: track.bbox,
                    },
                )
            })
            .collect())
    }
}
