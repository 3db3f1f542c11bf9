use anyhow::{anyhow, Result};

use crate::Point;

/// COCO-17 body-part indices, the layout emitted by YOLO-pose style detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;
}

/// One person's validated keypoints.
///
/// Detectors report a missing part as `(0, 0)`, and a zero coordinate reads as "not
/// detected" on that axis. `get` treats a part with a zero x as absent as a whole, while
/// `x`/`y` look at one axis at a time. A real keypoint in pixel column 0 (or row 0) is
/// therefore indistinguishable from a missing one, which is a known accuracy gap of the
/// convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoints {
    coords: [[f32; 2]; KeypointIndex::COUNT],
}

impl Keypoints {
    /// Ingest raw `[x, y]` pairs in COCO-17 order.
    ///
    /// Fails when the array is not exactly 17 entries long or holds a non-finite coordinate.
    pub fn from_pairs(raw: &[[f32; 2]]) -> Result<Self> {
        if raw.len() != KeypointIndex::COUNT {
            return Err(anyhow!(
                "malformed keypoints: expected {} pairs, got {}",
                KeypointIndex::COUNT,
                raw.len()
            ));
        }
        let mut coords = [[0.0; 2]; KeypointIndex::COUNT];
        for (i, &[x, y]) in raw.iter().enumerate() {
            if !x.is_finite() || !y.is_finite() {
                return Err(anyhow!(
                    "malformed keypoints: non-finite coordinate at index {}",
                    i
                ));
            }
            coords[i] = [x, y];
        }
        Ok(Self { coords })
    }

    /// The part as a point, or `None` when its x carries the missing sentinel.
    pub fn get(&self, index: KeypointIndex) -> Option<Point> {
        let [x, y] = self.coords[index as usize];
        (x != 0.0).then(|| Point::new(x, y))
    }

    /// The part's x-coordinate, `None` when zero.
    pub fn x(&self, index: KeypointIndex) -> Option<f32> {
        nonzero(self.coords[index as usize][0])
    }

    /// The part's y-coordinate, `None` when zero.
    pub fn y(&self, index: KeypointIndex) -> Option<f32> {
        nonzero(self.coords[index as usize][1])
    }
}

fn nonzero(v: f32) -> Option<f32> {
    (v != 0.0).then_some(v)
}
