mod centroid;
mod detection;
mod keypoint;

pub use centroid::centroid_of;
pub use detection::{Detection, PoseSource};
pub use keypoint::{KeypointIndex, Keypoints};
