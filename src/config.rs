use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::posture::FallDetectorConfig;
use crate::track::CentroidTrackerConfig;

const DEFAULT_FPS: f32 = 25.0;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    stream: Option<StreamConfigFile>,
    tracker: Option<TrackerConfigFile>,
    classifier: Option<ClassifierConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    default_fps: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    max_distance: Option<f32>,
    max_disappeared_secs: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    window_secs: Option<f32>,
    min_drop_ratio: Option<f32>,
    lying_aspect_ratio: Option<f32>,
    recover_aspect_ratio: Option<f32>,
    forget_after_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Frame rate assumed when a recording does not carry one.
    pub default_fps: f32,
    pub tracker: CentroidTrackerConfig,
    pub classifier: FallDetectorConfig,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_FPS,
            tracker: CentroidTrackerConfig::default(),
            classifier: FallDetectorConfig::default(),
        }
    }
}

impl SentinelConfig {
    /// Load from the file named by `FALL_SENTINEL_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FALL_SENTINEL_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Same as `load`, with an explicit config file taking the place of `FALL_SENTINEL_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Self {
        let defaults = Self::default();
        let stream = file.stream.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        let classifier = file.classifier.unwrap_or_default();
        Self {
            default_fps: stream.default_fps.unwrap_or(defaults.default_fps),
            tracker: CentroidTrackerConfig {
                max_distance: tracker
                    .max_distance
                    .unwrap_or(defaults.tracker.max_distance),
                max_disappeared_secs: tracker
                    .max_disappeared_secs
                    .unwrap_or(defaults.tracker.max_disappeared_secs),
            },
            classifier: FallDetectorConfig {
                window_secs: classifier
                    .window_secs
                    .unwrap_or(defaults.classifier.window_secs),
                min_drop_ratio: classifier
                    .min_drop_ratio
                    .unwrap_or(defaults.classifier.min_drop_ratio),
                lying_aspect_ratio: classifier
                    .lying_aspect_ratio
                    .unwrap_or(defaults.classifier.lying_aspect_ratio),
                recover_aspect_ratio: classifier
                    .recover_aspect_ratio
                    .unwrap_or(defaults.classifier.recover_aspect_ratio),
                forget_after_frames: classifier
                    .forget_after_frames
                    .unwrap_or(defaults.classifier.forget_after_frames),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(fps) = env_f32("FALL_SENTINEL_FPS")? {
            self.default_fps = fps;
        }
        if let Some(distance) = env_f32("FALL_SENTINEL_MAX_DISTANCE")? {
            self.tracker.max_distance = distance;
        }
        if let Some(secs) = env_f32("FALL_SENTINEL_MAX_DISAPPEARED_SECS")? {
            self.tracker.max_disappeared_secs = secs;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ensure_positive("stream.default_fps", self.default_fps)?;
        ensure_positive("tracker.max_distance", self.tracker.max_distance)?;
        ensure_positive(
            "tracker.max_disappeared_secs",
            self.tracker.max_disappeared_secs,
        )?;
        ensure_positive("classifier.window_secs", self.classifier.window_secs)?;
        ensure_positive("classifier.min_drop_ratio", self.classifier.min_drop_ratio)?;
        ensure_positive(
            "classifier.lying_aspect_ratio",
            self.classifier.lying_aspect_ratio,
        )?;
        ensure_positive(
            "classifier.recover_aspect_ratio",
            self.classifier.recover_aspect_ratio,
        )?;
        if self.classifier.recover_aspect_ratio > self.classifier.lying_aspect_ratio {
            return Err(anyhow!(
                "classifier.recover_aspect_ratio must not exceed classifier.lying_aspect_ratio"
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed = value
                .trim()
                .parse::<f32>()
                .map_err(|_| anyhow!("{} must be a number", key))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

fn ensure_positive(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(anyhow!("{} must be a positive number", field));
    }
    Ok(())
}
