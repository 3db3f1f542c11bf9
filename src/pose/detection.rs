use crate::BoundingBox;

/// Anything that can stand in for one person detection in a frame.
///
/// Pose models differ in how they hand out results; the orchestrator only needs the box and
/// the raw keypoint pairs in COCO-17 order.
pub trait PoseSource {
    fn bbox(&self) -> BoundingBox;

    /// Raw `[x, y]` pairs. `[0, 0]` marks a part the model did not find.
    fn keypoints(&self) -> &[[f32; 2]];
}

/// Owned detection record, as produced by the ingestion layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub keypoints: Vec<[f32; 2]>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, keypoints: Vec<[f32; 2]>) -> Self {
        Self { bbox, keypoints }
    }
}

impl PoseSource for Detection {
    fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    fn keypoints(&self) -> &[[f32; 2]] {
        &self.keypoints
    }
}

impl<T: PoseSource + ?Sized> PoseSource for &T {
    fn bbox(&self) -> BoundingBox {
        (**self).bbox()
    }

    fn keypoints(&self) -> &[[f32; 2]] {
        (**self).keypoints()
    }
}
