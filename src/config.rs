use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::capture::{CaptureRate, DEFAULT_CAPTURE_SIZE};
use crate::audio::time_domain::DEFAULT_BEAT_SENSITIVITY;
use crate::visual::{ResampleMethod, VisualStyle};

/// User-facing visualizer settings, persisted as JSON.
///
/// Missing fields fall back to their defaults, so older settings files keep
/// loading after new options are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerSettings {
    pub visual_style: VisualStyle,
    pub capture_rate: CaptureRate,
    /// Samples per capture frame
    pub capture_size: usize,
    /// Energy ratio between consecutive frames that counts as a beat
    pub beat_sensitivity: f32,
    pub resample_method: ResampleMethod,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            visual_style: VisualStyle::BottomBar,
            capture_rate: CaptureRate::Normal,
            capture_size: DEFAULT_CAPTURE_SIZE,
            beat_sensitivity: DEFAULT_BEAT_SENSITIVITY,
            resample_method: ResampleMethod::Mode,
        }
    }
}

impl VisualizerSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path`, or return the defaults when it does not exist yet.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        info!("Saved settings to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture_size < 4 {
            return Err(anyhow::anyhow!(
                "capture_size must be at least 4, got {}",
                self.capture_size
            ));
        }
        if !(self.beat_sensitivity.is_finite() && self.beat_sensitivity > 0.0) {
            return Err(anyhow::anyhow!(
                "beat_sensitivity must be positive, got {}",
                self.beat_sensitivity
            ));
        }
        if self.capture_size % 2 != 0 {
            warn!(
                "capture_size {} is odd, frames will use {}",
                self.capture_size,
                self.capture_size - 1
            );
        }
        Ok(())
    }
}
