use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::PERSON_LABEL;
use crate::geometry::Point;
use crate::roi::{Polygon, Roi};
use crate::ui::UiMode;

const DEFAULT_SOURCE_URL: &str = "stub://front_camera";
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_TICK_MS: u64 = 100;
const DEFAULT_HEALTH_LOG_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    roi: Option<Vec<Point>>,
    target_label: Option<String>,
    tick_ms: Option<u64>,
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    health_log_secs: Option<u64>,
    ui: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    warmup_polls: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    script_path: Option<PathBuf>,
    latency_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub roi: Roi,
    pub target_label: String,
    pub tick_interval: Duration,
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub health_log_interval: Duration,
    /// Console rendering: "plain", "pretty", or anything else for auto.
    pub ui_mode: UiMode,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub warmup_polls: u64,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// JSON detection script; `None` means "no detections".
    pub script_path: Option<PathBuf>,
    pub latency: Duration,
}

impl SentinelConfig {
    /// Defaults, then the file named by `SENTINEL_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTINEL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Result<Self> {
        let roi = match file.roi {
            Some(vertices) => Roi::new(Polygon::new(vertices)?),
            None => Roi::default(),
        };
        let target_label = file
            .target_label
            .unwrap_or_else(|| PERSON_LABEL.to_string());
        let tick_interval = Duration::from_millis(file.tick_ms.unwrap_or(DEFAULT_TICK_MS));
        let source = SourceSettings {
            url: file
                .source
                .as_ref()
                .and_then(|source| source.url.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
            warmup_polls: file
                .source
                .and_then(|source| source.warmup_polls)
                .unwrap_or(0),
        };
        let detector = DetectorSettings {
            script_path: file
                .detector
                .as_ref()
                .and_then(|detector| detector.script_path.clone()),
            latency: Duration::from_millis(
                file.detector
                    .and_then(|detector| detector.latency_ms)
                    .unwrap_or(0),
            ),
        };
        let health_log_interval = Duration::from_secs(
            file.health_log_secs
                .unwrap_or(DEFAULT_HEALTH_LOG_SECS),
        );
        let ui_mode = UiMode::from_flag(file.ui.as_deref());
        Ok(Self {
            roi,
            target_label,
            tick_interval,
            source,
            detector,
            health_log_interval,
            ui_mode,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(roi) = std::env::var("SENTINEL_ROI") {
            if !roi.trim().is_empty() {
                self.roi = parse_roi(&roi)?;
            }
        }
        if let Ok(url) = std::env::var("SENTINEL_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(label) = std::env::var("SENTINEL_TARGET_LABEL") {
            if !label.trim().is_empty() {
                self.target_label = label.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("SENTINEL_DETECTOR_SCRIPT") {
            if !path.trim().is_empty() {
                self.detector.script_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(ui) = std::env::var("SENTINEL_UI") {
            if !ui.trim().is_empty() {
                self.ui_mode = UiMode::from_flag(Some(ui.trim()));
            }
        }
        if let Ok(tick) = std::env::var("SENTINEL_TICK_MS") {
            let millis: u64 = tick
                .parse()
                .map_err(|_| anyhow!("SENTINEL_TICK_MS must be an integer number of milliseconds"))?;
            self.tick_interval = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.roi.validate_normalized()?;
        if self.tick_interval.is_zero() {
            return Err(anyhow!("tick interval must be greater than zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!(
                "source dimensions must be non-zero ({}x{})",
                self.source.width,
                self.source.height
            ));
        }
        if self.target_label.is_empty() {
            return Err(anyhow!("target label must not be empty"));
        }
        Ok(())
    }
}

/// Parse `"x,y x,y x,y ..."` (separated by whitespace or `;`) into a normalized ROI.
pub fn parse_roi(value: &str) -> Result<Roi> {
    let mut vertices = Vec::new();
    for pair in value
        .split(|c: char| c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
    {
        let (x, y) = pair
            .split_once(',')
            .ok_or_else(|| anyhow!("roi vertex '{}' must be written as x,y", pair))?;
        let x: f64 = x
            .trim()
            .parse()
            .map_err(|_| anyhow!("roi vertex '{}' has a non-numeric x", pair))?;
        let y: f64 = y
            .trim()
            .parse()
            .map_err(|_| anyhow!("roi vertex '{}' has a non-numeric y", pair))?;
        vertices.push(Point::new(x, y));
    }
    let roi = Roi::new(Polygon::new(vertices)?);
    roi.validate_normalized()?;
    Ok(roi)
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roi_pairs() {
        let roi = parse_roi("0.1,0.1 0.9,0.1; 0.5,0.9").unwrap();
        assert_eq!(
            roi.vertices(),
            &[
                Point::new(0.1, 0.1),
                Point::new(0.9, 0.1),
                Point::new(0.5, 0.9)
            ]
        );
    }

    #[test]
    fn rejects_short_or_malformed_roi() {
        assert!(parse_roi("0.1,0.1 0.9,0.1").is_err());
        assert!(parse_roi("0.1,0.1 0.9 0.5,0.9").is_err());
        assert!(parse_roi("0.1,0.1 0.9,abc 0.5,0.9").is_err());
        assert!(parse_roi("0.1,0.1 1.5,0.1 0.5,0.9").is_err());
    }

    #[test]
    fn defaults_without_file() {
        let cfg = SentinelConfig::from_file(SentinelConfigFile::default()).unwrap();
        assert_eq!(cfg.roi, Roi::default());
        assert_eq!(cfg.target_label, PERSON_LABEL);
        assert_eq!(cfg.tick_interval, Duration::from_millis(DEFAULT_TICK_MS));
        assert_eq!(cfg.source.url, DEFAULT_SOURCE_URL);
        assert_eq!((cfg.source.width, cfg.source.height), (640, 480));
        assert!(cfg.detector.script_path.is_none());
    }

    #[test]
    fn short_roi_in_file_is_rejected() {
        let file: SentinelConfigFile =
            serde_json::from_str(r#"{"roi": [{"x":0.1,"y":0.1},{"x":0.2,"y":0.2}]}"#).unwrap();
        assert!(SentinelConfig::from_file(file).is_err());
    }
}
