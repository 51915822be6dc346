use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatlaneError, KeyMap, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub judge: JudgeConfig,
    pub session: SessionConfig,
    pub input: KeyMap,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.judge.validate()?;
        self.session.validate()
    }
}

/// Tuning of the energy onset detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Duration of one RMS window in seconds.
    pub window_seconds: f64,
    /// Number of trailing windows averaged for the adaptive threshold.
    pub history_windows: usize,
    /// Energy must exceed the local average by this factor.
    pub threshold_ratio: f32,
    /// Absolute energy floor below which nothing counts as an onset.
    pub noise_floor: f32,
    /// Minimum spacing between two emitted notes.
    pub min_gap_seconds: f64,
    /// Probability of keeping a lane that repeats the previous note's lane.
    pub repeat_lane_acceptance: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 0.05,
            history_windows: 20,
            threshold_ratio: 1.3,
            noise_floor: 0.05,
            min_gap_seconds: 0.15,
            repeat_lane_acceptance: 0.2,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<()> {
        if self.window_seconds.is_nan() || self.window_seconds <= 0.0 {
            return Err(BeatlaneError::Config(
                "detector.window_seconds must be positive".into(),
            ));
        }
        if self.min_gap_seconds.is_nan() || self.min_gap_seconds < 0.0 {
            return Err(BeatlaneError::Config(
                "detector.min_gap_seconds must not be negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.repeat_lane_acceptance) {
            return Err(BeatlaneError::Config(format!(
                "detector.repeat_lane_acceptance must lie in [0, 1], got {}",
                self.repeat_lane_acceptance
            )));
        }
        Ok(())
    }
}

/// Timing windows and point values used by the judgment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Notes become active this many seconds before their target time.
    pub lookahead: f64,
    pub perfect_window: f64,
    pub good_window: f64,
    pub perfect_points: u64,
    pub good_points: u64,
    /// How long a missed note stays in the active set for drawing.
    pub render_tail: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            lookahead: 2.0,
            perfect_window: 0.050,
            good_window: 0.120,
            perfect_points: 100,
            good_points: 50,
            render_tail: 0.25,
        }
    }
}

impl JudgeConfig {
    fn validate(&self) -> Result<()> {
        if self.lookahead.is_nan() || self.lookahead <= 0.0 {
            return Err(BeatlaneError::Config("judge.lookahead must be positive".into()));
        }
        if self.perfect_window.is_nan()
            || self.good_window.is_nan()
            || self.perfect_window < 0.0
            || self.perfect_window > self.good_window
        {
            return Err(BeatlaneError::Config(format!(
                "judge.perfect_window ({}) must lie in [0, good_window ({})]",
                self.perfect_window, self.good_window
            )));
        }
        Ok(())
    }

    /// Retention after the target time, never shorter than the good window so
    /// a note cannot leave the active set before its miss is reported.
    pub fn retention(&self) -> f64 {
        self.render_tail.max(self.good_window)
    }
}

/// Session level settings that are not judgment concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Extra seconds after the track before the session reports its result.
    pub end_padding: f64,
    /// Amount subtracted from each lane flash per tick.
    pub flash_decay: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            end_padding: 1.0,
            flash_decay: 0.1,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if !self.end_padding.is_finite() || self.end_padding < 0.0 {
            return Err(BeatlaneError::Config(
                "session.end_padding must be a finite, non-negative number".into(),
            ));
        }
        Ok(())
    }
}
