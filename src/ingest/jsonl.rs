//! JSON-lines detection recordings.
//!
//! Each non-blank line holds one frame:
//!
//! ```text
//! {"frame": 12, "fps": 25.0, "detections": [{"bbox": [x, y, w, h], "keypoints": [[x, y], ...]}]}
//! ```
//!
//! `frame` and `fps` are optional. Keypoint arrays are passed through as recorded; their
//! shape is checked when the orchestrator extracts centroids.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::pose::Detection;
use crate::BoundingBox;

#[derive(Debug, Deserialize)]
struct FrameLine {
    frame: Option<u64>,
    fps: Option<f32>,
    #[serde(default)]
    detections: Vec<DetectionLine>,
}

#[derive(Debug, Deserialize)]
struct DetectionLine {
    bbox: [f32; 4],
    keypoints: Vec<[f32; 2]>,
}

/// One recorded frame.
#[derive(Clone, Debug)]
pub struct FrameRecord {
    /// Frame index as recorded by the producer, if any.
    pub frame: Option<u64>,
    /// Frame rate at capture time, if recorded.
    pub fps: Option<f32>,
    pub detections: Vec<Detection>,
}

/// Parse a single recorded frame.
pub fn parse_frame_line(line: &str) -> Result<FrameRecord> {
    let parsed: FrameLine =
        serde_json::from_str(line).map_err(|e| anyhow!("parse error: {}", e))?;
    Ok(FrameRecord {
        frame: parsed.frame,
        fps: parsed.fps,
        detections: parsed
            .detections
            .into_iter()
            .map(|d| Detection::new(BoundingBox::from(d.bbox), d.keypoints))
            .collect(),
    })
}

/// Reading statistics.
#[derive(Clone, Debug, Default)]
pub struct JsonlStats {
    pub lines_read: u64,
    pub frames_read: u64,
}

/// Sequential reader over a JSON-lines recording.
pub struct JsonlSource<R> {
    reader: R,
    line_no: u64,
    stats: JsonlStats,
    buf: String,
}

impl JsonlSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| anyhow!("failed to open recording {}: {}", path.display(), e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            stats: JsonlStats::default(),
            buf: String::new(),
        }
    }

    /// Next recorded frame, or `None` at end of input. Blank lines are skipped.
    pub fn next_frame(&mut self) -> Result<Option<FrameRecord>> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| anyhow!("read failed after line {}: {}", self.line_no, e))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            self.stats.lines_read += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            let record =
                parse_frame_line(line).map_err(|e| anyhow!("line {}: {}", self.line_no, e))?;
            self.stats.frames_read += 1;
            return Ok(Some(record));
        }
    }

    pub fn stats(&self) -> JsonlStats {
        self.stats.clone()
    }
}
