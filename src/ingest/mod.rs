//! Detection stream ingestion.
//!
//! Pose models run outside this crate. Their per-frame output reaches the orchestrator as
//! `Detection` records; this module reads recorded streams of them back in.
//!
//! - JSON-lines recordings, one frame per line (`JsonlSource`)

pub mod jsonl;

pub use jsonl::{parse_frame_line, FrameRecord, JsonlSource, JsonlStats};
