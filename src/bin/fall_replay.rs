//! fall_replay - run a recorded detection stream through the fall orchestrator

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use fall_sentinel::ingest::JsonlSource;
use fall_sentinel::{FallOrchestrator, SentinelConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines recording, one frame of detections per line.
    #[arg(long)]
    input: PathBuf,
    /// Frames per second; overrides the recording and the config default.
    #[arg(long)]
    fps: Option<f32>,
    /// Config file (.json or .toml).
    #[arg(long, env = "FALL_SENTINEL_CONFIG")]
    config: Option<PathBuf>,
    /// Print each fall event as a JSON line on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(fps) = args.fps {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(anyhow!("fps must be a positive number"));
        }
    }

    let cfg = SentinelConfig::load_from(args.config.as_deref())?;
    let mut orchestrator = FallOrchestrator::from_config(&cfg);
    let mut source = JsonlSource::open(&args.input)?;

    log::info!("replaying {}", args.input.display());
    log::info!(
        "tracker max_distance={} max_disappeared_secs={}",
        cfg.tracker.max_distance,
        cfg.tracker.max_disappeared_secs
    );

    let mut currently_fallen = 0usize;
    while let Some(record) = source.next_frame()? {
        let fps = args.fps.or(record.fps).unwrap_or(cfg.default_fps);
        let (_, fallen) = orchestrator.process_detections(&record.detections, fps)?;
        currently_fallen = fallen.len();

        for ev in orchestrator.take_events() {
            if args.json {
                println!("{}", serde_json::to_string(&ev)?);
            } else {
                println!(
                    "frame {}: fall #{} (id {}) box=({:.0}, {:.0}, {:.0}, {:.0})",
                    ev.frame, ev.total, ev.id, ev.bbox.x, ev.bbox.y, ev.bbox.w, ev.bbox.h
                );
            }
        }
    }

    let stats = source.stats();
    log::info!(
        "done: frames={} lines={} falls={} fallen_at_end={}",
        orchestrator.frame_count(),
        stats.lines_read,
        orchestrator.fall_count(),
        currently_fallen
    );
    Ok(())
}
