//! Core library for the Beatlane rhythm game.
//!
//! Two halves live here. Chart generation turns decoded audio into lane notes
//! with an energy onset detector (`analysis`, `chart`). Play sessions judge
//! lane presses against that chart on a playback clock and keep score
//! (`timeline`, `judge`, `score`, `session`). Decoding beyond WAV, drawing,
//! and device input are left to the host.

pub mod analysis;
pub mod audio;
pub mod chart;
pub mod config;
pub mod error;
pub mod judge;
pub mod mapping;
pub mod record;
pub mod render;
pub mod score;
pub mod session;
pub mod timeline;

/// Number of playable lanes.
pub const LANE_COUNT: usize = 4;

/// Slack for comparing times derived from window indices or clock readings.
pub(crate) const TIME_EPSILON: f64 = 1e-9;

pub use analysis::EnergyProfile;
pub use audio::AudioBuffer;
pub use chart::{generate_chart, Chart, Note, OnsetDetector};
pub use config::{AppConfig, DetectorConfig, JudgeConfig, SessionConfig};
pub use error::{BeatlaneError, ClockError, Result};
pub use judge::{JudgeEngine, Judgement, TickReport};
pub use mapping::{lane_from_touch, KeyMap};
pub use record::{replay, InputRecorder, RecordedPress, ReplayLog};
pub use render::{FrameSnapshot, LaneState, NoteView};
pub use score::{multiplier, FinalResult, HitKind, Rank, ScoreState};
pub use session::{autoplay, InputEvent, Session, SessionState, SessionTick, DEFAULT_TICK_INTERVAL};
pub use timeline::{AudioOutput, ClockSource, ManualClock, NullOutput, PlaybackClock, SystemClock};
