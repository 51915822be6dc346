use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::{ClockError, Result};

/// Monotonic time source in seconds from an arbitrary epoch.
pub trait ClockSource {
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock for tests and offline simulation. Clones share the same
/// underlying time, so a test can keep one handle while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// The playback resource driven alongside the clock, e.g. an audio stream.
pub trait AudioOutput {
    /// Begins (or restarts) playback at a track-relative offset.
    fn play_from(&mut self, offset: f64) -> Result<()>;
    /// Stops playback and releases whatever `play_from` acquired.
    fn halt(&mut self);
}

/// Output that plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play_from(&mut self, _offset: f64) -> Result<()> {
        Ok(())
    }

    fn halt(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClockState {
    Idle,
    Playing { origin: f64 },
    Paused { saved: f64 },
    Stopped { at: f64 },
}

/// Track-relative time for a play session.
///
/// While playing, `elapsed = source.now() - origin` where the origin is fixed
/// at `start(offset)` time as `now - offset`. Pausing freezes the value and
/// resuming restarts from it, so wall time spent paused never leaks into
/// track time.
pub struct PlaybackClock<C: ClockSource = SystemClock> {
    source: C,
    output: Box<dyn AudioOutput>,
    state: ClockState,
}

impl<C: ClockSource> PlaybackClock<C> {
    pub fn new(source: C) -> Self {
        Self::with_output(source, Box::new(NullOutput))
    }

    pub fn with_output(source: C, output: Box<dyn AudioOutput>) -> Self {
        Self {
            source,
            output,
            state: ClockState::Idle,
        }
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    /// Starts playback at `offset` seconds into the track. Any playback in
    /// progress is replaced.
    pub fn start(&mut self, offset: f64) -> Result<()> {
        let offset = offset.max(0.0);
        if matches!(self.state, ClockState::Playing { .. }) {
            self.output.halt();
        }
        self.output.play_from(offset)?;
        self.state = ClockState::Playing {
            origin: self.source.now() - offset,
        };
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            ClockState::Playing { .. } => {
                let saved = self.elapsed();
                self.output.halt();
                self.state = ClockState::Paused { saved };
                Ok(())
            }
            ClockState::Stopped { .. } => Err(ClockError::AlreadyStopped.into()),
            ClockState::Idle | ClockState::Paused { .. } => Err(ClockError::NotRunning.into()),
        }
    }

    /// Continues from the paused position; equivalent to `start(saved)`.
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            ClockState::Paused { saved } => self.start(saved),
            ClockState::Idle => Err(ClockError::NeverStarted.into()),
            ClockState::Playing { .. } => Err(ClockError::AlreadyRunning.into()),
            ClockState::Stopped { .. } => Err(ClockError::AlreadyStopped.into()),
        }
    }

    /// Releases the output. The clock stays frozen at its last value.
    pub fn stop(&mut self) -> Result<()> {
        let at = match self.state {
            ClockState::Stopped { .. } => return Err(ClockError::AlreadyStopped.into()),
            ClockState::Playing { .. } => {
                let at = self.elapsed();
                self.output.halt();
                at
            }
            ClockState::Paused { saved } => saved,
            ClockState::Idle => 0.0,
        };
        self.state = ClockState::Stopped { at };
        Ok(())
    }

    /// Moves the playhead. A playing clock keeps playing from the new
    /// position; an idle or paused clock will resume from it.
    pub fn seek(&mut self, offset: f64) -> Result<()> {
        match self.state {
            ClockState::Playing { .. } => self.start(offset),
            ClockState::Idle | ClockState::Paused { .. } => {
                self.state = ClockState::Paused {
                    saved: offset.max(0.0),
                };
                Ok(())
            }
            ClockState::Stopped { .. } => Err(ClockError::AlreadyStopped.into()),
        }
    }

    /// Current track-relative time in seconds.
    pub fn elapsed(&self) -> f64 {
        match self.state {
            ClockState::Idle => 0.0,
            ClockState::Playing { origin } => self.source.now() - origin,
            ClockState::Paused { saved } => saved,
            ClockState::Stopped { at } => at,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, ClockState::Playing { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, ClockState::Paused { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, ClockState::Stopped { .. })
    }
}

impl<C: ClockSource> fmt::Debug for PlaybackClock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackClock")
            .field("state", &self.state)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
