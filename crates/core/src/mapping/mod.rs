use serde::{Deserialize, Serialize};

use crate::LANE_COUNT;

/// Routes physical keys to lane indices. Device plumbing lives outside the
/// core; this only captures the agreed layout so every front end maps keys
/// the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub lanes: [char; LANE_COUNT],
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            lanes: ['D', 'F', 'J', 'K'],
        }
    }
}

impl KeyMap {
    pub fn new(lanes: [char; LANE_COUNT]) -> Self {
        Self { lanes }
    }

    /// Lane bound to `key`, compared case-insensitively.
    pub fn lane_for_key(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_uppercase();
        self.lanes
            .iter()
            .position(|bound| bound.to_ascii_uppercase() == key)
    }

    pub fn key_for_lane(&self, lane: usize) -> Option<char> {
        self.lanes.get(lane).copied()
    }
}

/// Maps a horizontal touch coordinate onto one of four equal-width bands.
///
/// Coordinates left of the surface or at/after its right edge yield `None`.
pub fn lane_from_touch(x: f32, width: f32) -> Option<usize> {
    if width.is_nan() || width <= 0.0 || x.is_nan() || x < 0.0 {
        return None;
    }
    let band = (x / (width / LANE_COUNT as f32)).floor() as usize;
    (band < LANE_COUNT).then_some(band)
}
