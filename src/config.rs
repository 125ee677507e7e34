//! Configuration Management

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::raster::Colour;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub dots: DotConfig,
    pub aperture: ApertureConfig,
    pub fixation: FixationConfig,
    pub timing: TimingConfig,
    pub experiment: ExperimentConfig,
}

/// Window and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    pub background: Colour,
    /// Target frames per second for live playback
    pub fps: u32,
}

/// Dot population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotConfig {
    /// Dots shown simultaneously
    pub count: usize,
    /// Side of each dot in pixels
    pub size: u32,
    /// Pixels per frame
    pub speed: f64,
    pub colour: Colour,
    /// Probability in [0, 1] that a dot moves in the signal direction
    pub coherence: f64,
}

/// Circular aperture outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApertureConfig {
    /// Radius in pixels
    pub radius: f64,
    /// Outline width in pixels
    pub line_width: u32,
    pub colour: Colour,
}

/// Fixation cross
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixationConfig {
    /// Arm length from the centre, horizontal and vertical
    pub half_extent: [f64; 2],
    pub line_width: u32,
    pub colour: Colour,
    /// Keep the cross and aperture visible under the moving dots
    pub overlay_during_stimulus: bool,
}

/// Phase durations, in frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub fixation_frames: usize,
    pub stimulus_frames: usize,
    /// Inter-trial interval
    pub blank_frames: usize,
}

/// Condition list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Motion directions in degrees
    pub angles: Vec<f64>,
    /// Trials per angle
    pub repetitions: usize,
    pub shuffle: bool,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 250,
            height: 250,
            background: Colour::BLACK,
            fps: 60,
        }
    }
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            count: 200,
            size: 3,
            speed: 4.0,
            colour: Colour::WHITE,
            coherence: 1.0,
        }
    }
}

impl Default for ApertureConfig {
    fn default() -> Self {
        Self {
            radius: 100.0,
            line_width: 4,
            colour: Colour::WHITE,
        }
    }
}

impl Default for FixationConfig {
    fn default() -> Self {
        Self {
            half_extent: [15.0, 15.0],
            line_width: 4,
            colour: Colour::WHITE,
            overlay_during_stimulus: true,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixation_frames: 20,
            stimulus_frames: 60,
            blank_frames: 60,
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            angles: vec![0.0, 45.0, 90.0, 112.0, 240.0, 315.0],
            repetitions: 5,
            shuffle: true,
            seed: None,
        }
    }
}

impl WindowConfig {
    /// Pixel centre of the window, where the aperture sits.
    pub fn centre(&self) -> (f64, f64) {
        ((self.width / 2) as f64, (self.height / 2) as f64)
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(crate::Error::Config(format!(
                "window must be non-empty, got {}x{}", self.window.width, self.window.height
            )));
        }
        if self.window.fps == 0 {
            return Err(crate::Error::Config("fps must be > 0".to_string()));
        }
        if self.dots.count == 0 {
            return Err(crate::Error::Config("dot count must be > 0".to_string()));
        }
        if self.dots.size == 0 {
            return Err(crate::Error::Config("dot size must be > 0".to_string()));
        }
        if !self.dots.speed.is_finite() || self.dots.speed < 0.0 {
            return Err(crate::Error::Config(format!(
                "dot speed must be finite and >= 0, got {}", self.dots.speed
            )));
        }
        if !(0.0..=1.0).contains(&self.dots.coherence) {
            return Err(crate::Error::Config(format!(
                "coherence must be in [0, 1], got {}", self.dots.coherence
            )));
        }
        if !self.aperture.radius.is_finite() || self.max_radius() < 2.0 {
            return Err(crate::Error::Config(format!(
                "aperture radius must exceed dot size by at least 2, got radius {} with dot size {}",
                self.aperture.radius, self.dots.size
            )));
        }
        if self.fixation.half_extent.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(crate::Error::Config(format!(
                "fixation half extent must be finite and >= 0, got {:?}", self.fixation.half_extent
            )));
        }
        let timing = &self.timing;
        for (name, frames) in [
            ("fixation_frames", timing.fixation_frames),
            ("stimulus_frames", timing.stimulus_frames),
            ("blank_frames", timing.blank_frames),
        ] {
            if frames == 0 {
                return Err(crate::Error::Config(format!("{} must be > 0", name)));
            }
        }
        if self.experiment.angles.is_empty() {
            return Err(crate::Error::Config("angle list must not be empty".to_string()));
        }
        if let Some(bad) = self.experiment.angles.iter().find(|a| !a.is_finite()) {
            return Err(crate::Error::Config(format!("angle must be finite, got {}", bad)));
        }
        if self.experiment.repetitions == 0 {
            return Err(crate::Error::Config("repetitions must be > 0".to_string()));
        }
        Ok(())
    }

    /// Radius at which dots are recycled.
    pub fn max_radius(&self) -> f64 {
        self.aperture.radius - self.dots.size as f64
    }

    /// Frames in one complete trial.
    pub fn frames_per_trial(&self) -> usize {
        self.timing.fixation_frames + self.timing.stimulus_frames + self.timing.blank_frames
    }

    /// Seeded when `experiment.seed` is set, otherwise from OS entropy.
    pub fn rng(&self) -> StdRng {
        match self.experiment.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, crate::Error> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
