use anyhow::Result;

use super::keypoint::{KeypointIndex, Keypoints};
use crate::Point;

/// Reduce one person's raw keypoints to a torso reference point.
///
/// Only the shoulders are used, one axis at a time: on each axis a single non-zero shoulder
/// value is taken as-is and two are averaged. Returns `Ok(None)` when no shoulder has a
/// usable x, when no shoulder has a usable y, or when the point lands on either axis, since
/// a zero coordinate is the detector's "missing" sentinel.
///
/// Errors when the keypoint array is malformed.
pub fn centroid_of(raw: &[[f32; 2]]) -> Result<Option<Point>> {
    let keypoints = Keypoints::from_pairs(raw)?;
    Ok(shoulder_centroid(&keypoints))
}

fn shoulder_centroid(keypoints: &Keypoints) -> Option<Point> {
    use KeypointIndex::{LeftShoulder, RightShoulder};

    let x = axis_midpoint(keypoints.x(LeftShoulder), keypoints.x(RightShoulder))?;
    let y = axis_midpoint(keypoints.y(LeftShoulder), keypoints.y(RightShoulder))?;

    if x == 0.0 || y == 0.0 {
        return None;
    }
    Some(Point::new(x, y))
}

fn axis_midpoint(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}
