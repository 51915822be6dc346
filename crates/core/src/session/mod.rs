//! Play session: one chart, one clock, one judgment engine.
//!
//! A session is driven from a single timeline. The host calls
//! [`Session::tick`] at display cadence and [`Session::handle`] for every
//! input event in between; each event reads the clock when it is applied.

use crate::{
    AppConfig, BeatlaneError, Chart, ClockSource, FinalResult, FrameSnapshot, InputRecorder,
    JudgeEngine, Judgement, LaneState, ManualClock, PlaybackClock, ReplayLog, Result, ScoreState,
    LANE_COUNT,
};

/// Nominal 60 Hz frame interval.
pub const DEFAULT_TICK_INTERVAL: f64 = 1.0 / 60.0;

/// Abstract input delivered by the device collaborator. Lanes arrive as raw
/// integers so out-of-range values can be dropped here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    LanePress(i32),
    LaneRelease(i32),
    Pause,
    Resume,
    TogglePause,
    Restart,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Playing,
    Paused,
    Finished,
    Exited,
}

/// Result of one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTick {
    /// Not started yet, or exited.
    Idle,
    Frame(FrameSnapshot),
    Finished(FinalResult),
}

pub struct Session<C: ClockSource> {
    chart: Chart,
    config: AppConfig,
    clock: PlaybackClock<C>,
    /// Dropped on exit.
    engine: Option<JudgeEngine>,
    lanes: LaneState,
    recorder: InputRecorder,
    state: SessionState,
    result: Option<FinalResult>,
}

impl<C: ClockSource> Session<C> {
    pub fn new(chart: Chart, config: AppConfig, clock: PlaybackClock<C>) -> Self {
        Self {
            chart,
            config,
            clock,
            engine: None,
            lanes: LaneState::default(),
            recorder: InputRecorder::default(),
            state: SessionState::Ready,
            result: None,
        }
    }

    /// Attaches the chart seed to the replay log.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.recorder = InputRecorder::new(Some(seed));
        self
    }

    /// Starts playback from the top of the track.
    pub fn begin(&mut self) -> Result<()> {
        if self.state == SessionState::Exited {
            return Err(BeatlaneError::msg("session has been exited"));
        }
        self.engine = Some(JudgeEngine::new(&self.chart, self.config.judge.clone()));
        self.lanes = LaneState::default();
        self.result = None;
        self.recorder.start();
        self.clock.start(0.0)?;
        self.state = SessionState::Playing;
        tracing::debug!(notes = self.chart.len(), "session started");
        Ok(())
    }

    /// Runs activation and expiry at the current clock time. While paused the
    /// judgment state is left untouched.
    pub fn tick(&mut self) -> Result<SessionTick> {
        match self.state {
            SessionState::Ready | SessionState::Exited => Ok(SessionTick::Idle),
            SessionState::Finished => Ok(self
                .result
                .clone()
                .map_or(SessionTick::Idle, SessionTick::Finished)),
            SessionState::Paused => Ok(self
                .snapshot()
                .map_or(SessionTick::Idle, SessionTick::Frame)),
            SessionState::Playing => {
                let now = self.clock.elapsed();
                let Some(engine) = self.engine.as_mut() else {
                    return Ok(SessionTick::Idle);
                };
                let report = engine.tick(now);
                if !report.missed.is_empty() {
                    tracing::trace!(missed = ?report.missed, now, "notes expired");
                }
                self.lanes.decay(self.config.session.flash_decay);

                if now > self.chart.duration() + self.config.session.end_padding {
                    let result = self.finish(now)?;
                    return Ok(SessionTick::Finished(result));
                }
                Ok(self
                    .snapshot()
                    .map_or(SessionTick::Idle, SessionTick::Frame))
            }
        }
    }

    fn finish(&mut self, now: f64) -> Result<FinalResult> {
        self.clock.stop()?;
        self.recorder.stop(now);
        let score = self
            .engine
            .as_ref()
            .map(|engine| engine.score().clone())
            .unwrap_or_default();
        let result = FinalResult::from(score);
        tracing::info!(
            score = result.score.score,
            accuracy = result.accuracy,
            rank = %result.rank,
            max_combo = result.score.max_combo,
            "session finished"
        );
        self.state = SessionState::Finished;
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Applies one input event. Returns the judgement when a press hits.
    pub fn handle(&mut self, event: InputEvent) -> Result<Option<Judgement>> {
        match event {
            InputEvent::LanePress(raw) => Ok(self.press(raw)),
            InputEvent::LaneRelease(raw) => {
                if let Some(lane) = lane_index(raw) {
                    self.lanes.set_held(lane, false);
                }
                Ok(None)
            }
            InputEvent::Pause => {
                if self.state == SessionState::Playing {
                    self.clock.pause()?;
                    self.lanes.release_all();
                    self.state = SessionState::Paused;
                    tracing::debug!(at = self.clock.elapsed(), "session paused");
                }
                Ok(None)
            }
            InputEvent::Resume => {
                if self.state == SessionState::Paused {
                    self.clock.resume()?;
                    self.state = SessionState::Playing;
                    tracing::debug!(at = self.clock.elapsed(), "session resumed");
                }
                Ok(None)
            }
            InputEvent::TogglePause => match self.state {
                SessionState::Playing => self.handle(InputEvent::Pause),
                SessionState::Paused => self.handle(InputEvent::Resume),
                _ => Ok(None),
            },
            InputEvent::Restart => {
                if matches!(
                    self.state,
                    SessionState::Playing | SessionState::Paused | SessionState::Finished
                ) {
                    self.begin()?;
                }
                Ok(None)
            }
            InputEvent::Exit => {
                self.exit()?;
                Ok(None)
            }
        }
    }

    fn press(&mut self, raw: i32) -> Option<Judgement> {
        let Some(lane) = lane_index(raw) else {
            tracing::trace!(lane = raw, "ignoring press outside lane range");
            return None;
        };
        if self.state != SessionState::Playing {
            return None;
        }

        let now = self.clock.elapsed();
        self.lanes.set_held(lane, true);
        self.recorder.record(lane, now);

        let judgement = self.engine.as_mut()?.press(lane, now)?;
        self.lanes.flash(lane);
        Some(judgement)
    }

    /// Stops the clock and discards judgment state. No result is kept.
    pub fn exit(&mut self) -> Result<()> {
        if self.state == SessionState::Exited {
            return Ok(());
        }
        if !self.clock.is_stopped() {
            self.clock.stop()?;
        }
        self.engine = None;
        self.result = None;
        self.lanes = LaneState::default();
        self.state = SessionState::Exited;
        tracing::debug!("session exited");
        Ok(())
    }

    /// Read-only view of the current frame, `None` before `begin` and after
    /// exit.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        let engine = self.engine.as_ref()?;
        Some(FrameSnapshot::capture(
            engine,
            &self.lanes,
            self.clock.elapsed(),
            self.state == SessionState::Paused,
        ))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> Option<&ScoreState> {
        self.engine.as_ref().map(JudgeEngine::score)
    }

    pub fn result(&self) -> Option<&FinalResult> {
        self.result.as_ref()
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn replay_log(&self) -> &ReplayLog {
        self.recorder.log()
    }
}

impl<C: ClockSource> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("notes", &self.chart.len())
            .field("clock", &self.clock)
            .finish()
    }
}

fn lane_index(raw: i32) -> Option<usize> {
    usize::try_from(raw).ok().filter(|&lane| lane < LANE_COUNT)
}

/// Plays a chart on a simulated clock, pressing every note at
/// `note.time + press_offset` and ticking every `tick_interval` seconds.
/// Presses land between ticks at their exact time.
pub fn autoplay(
    chart: &Chart,
    config: &AppConfig,
    press_offset: f64,
    tick_interval: f64,
) -> Result<(FinalResult, ReplayLog)> {
    if tick_interval.is_nan() || tick_interval <= 0.0 {
        return Err(BeatlaneError::Config(format!(
            "tick interval must be positive, got {tick_interval}"
        )));
    }
    if !press_offset.is_finite() {
        return Err(BeatlaneError::Config(format!(
            "press offset must be finite, got {press_offset}"
        )));
    }
    config.validate()?;

    let source = ManualClock::new();
    let mut session = Session::new(
        chart.clone(),
        config.clone(),
        PlaybackClock::new(source.clone()),
    );
    session.begin()?;

    let mut presses: Vec<(f64, usize)> = chart
        .notes()
        .iter()
        .map(|note| ((note.time + press_offset).max(0.0), note.lane))
        .collect();
    presses.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut pending = presses.into_iter().peekable();
    let mut now = 0.0;
    loop {
        let tick_time = now + tick_interval;
        while let Some(&(time, lane)) = pending.peek() {
            if time > tick_time {
                break;
            }
            source.set(time.max(now));
            session.handle(InputEvent::LanePress(lane as i32))?;
            session.handle(InputEvent::LaneRelease(lane as i32))?;
            pending.next();
        }

        source.set(tick_time);
        now = tick_time;
        if let SessionTick::Finished(result) = session.tick()? {
            return Ok((result, session.replay_log().clone()));
        }
    }
}
