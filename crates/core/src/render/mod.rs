use serde::{Deserialize, Serialize};

use crate::{JudgeEngine, ScoreState, LANE_COUNT};

/// Read-only view of one active note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteView {
    pub id: usize,
    pub lane: usize,
    pub time: f64,
    /// Seconds until the note reaches the hit line; negative once past it.
    pub offset: f64,
    pub missed: bool,
}

/// Everything a renderer needs for one frame. Built by copying out of the
/// judgment state, so drawing can never feed back into judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub time: f64,
    pub paused: bool,
    pub notes: Vec<NoteView>,
    pub score: ScoreState,
    pub held: [bool; LANE_COUNT],
    /// Hit flash intensity per lane in [0, 1].
    pub flash: [f32; LANE_COUNT],
}

impl FrameSnapshot {
    pub fn capture(engine: &JudgeEngine, lanes: &LaneState, time: f64, paused: bool) -> Self {
        let notes = engine
            .active_notes()
            .map(|note| NoteView {
                id: note.id,
                lane: note.lane,
                time: note.time,
                offset: note.time - time,
                missed: note.missed,
            })
            .collect();

        Self {
            time,
            paused,
            notes,
            score: engine.score().clone(),
            held: lanes.held,
            flash: lanes.flash,
        }
    }
}

/// Cosmetic per-lane state: which lanes are held and how bright their hit
/// flash still is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneState {
    held: [bool; LANE_COUNT],
    flash: [f32; LANE_COUNT],
}

impl LaneState {
    pub fn set_held(&mut self, lane: usize, held: bool) {
        if let Some(slot) = self.held.get_mut(lane) {
            *slot = held;
        }
    }

    pub fn flash(&mut self, lane: usize) {
        if let Some(slot) = self.flash.get_mut(lane) {
            *slot = 1.0;
        }
    }

    pub fn decay(&mut self, amount: f32) {
        for value in &mut self.flash {
            *value = (*value - amount).max(0.0);
        }
    }

    pub fn release_all(&mut self) {
        self.held = [false; LANE_COUNT];
    }

    pub fn is_held(&self, lane: usize) -> bool {
        self.held.get(lane).copied().unwrap_or(false)
    }
}
