use serde::{Deserialize, Serialize};

use crate::{Chart, JudgeConfig, JudgeEngine, Result, ScoreState};

/// One lane press as it was applied to the judgment engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedPress {
    pub time: f64,
    pub lane: usize,
}

/// Press history of a session, enough to re-judge it offline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Seed the chart was generated with, if known.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Track time at which the session ended.
    pub end_time: f64,
    pub presses: Vec<RecordedPress>,
}

impl ReplayLog {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects presses while a session runs.
#[derive(Debug, Default)]
pub struct InputRecorder {
    log: ReplayLog,
    is_recording: bool,
}

impl InputRecorder {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            log: ReplayLog {
                seed,
                ..ReplayLog::default()
            },
            is_recording: false,
        }
    }

    pub fn start(&mut self) {
        self.log.presses.clear();
        self.log.end_time = 0.0;
        self.is_recording = true;
    }

    pub fn record(&mut self, lane: usize, time: f64) {
        if self.is_recording {
            self.log.presses.push(RecordedPress { time, lane });
        }
    }

    pub fn stop(&mut self, end_time: f64) {
        self.log.end_time = end_time;
        self.is_recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    pub fn into_log(self) -> ReplayLog {
        self.log
    }
}

/// Re-judges a recorded session against a fresh engine.
///
/// Each press is preceded by a tick at its own time, then a final tick at
/// `end_time` settles every remaining note.
pub fn replay(chart: &Chart, config: &JudgeConfig, log: &ReplayLog) -> ScoreState {
    let mut engine = JudgeEngine::new(chart, config.clone());
    for press in &log.presses {
        engine.tick(press.time);
        engine.press(press.lane, press.time);
    }
    engine.tick(log.end_time);
    engine.score().clone()
}
