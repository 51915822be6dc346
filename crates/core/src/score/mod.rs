use std::fmt;

use serde::{Deserialize, Serialize};

/// Timing class of a successful hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitKind {
    Perfect,
    Good,
}

/// Running counters for a play session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub perfect: u32,
    pub good: u32,
    pub miss: u32,
    /// Consecutive hits since the last miss.
    pub combo: u32,
    pub max_combo: u32,
    pub score: u64,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a hit, extends the combo and returns the points awarded.
    pub fn register_hit(&mut self, kind: HitKind, base_points: u64) -> u64 {
        match kind {
            HitKind::Perfect => self.perfect += 1,
            HitKind::Good => self.good += 1,
        }
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);

        let points = base_points * multiplier(self.combo);
        self.score += points;
        points
    }

    pub fn register_miss(&mut self) {
        self.miss += 1;
        self.combo = 0;
    }

    /// Notes judged so far.
    pub fn judged(&self) -> u32 {
        self.perfect + self.good + self.miss
    }

    /// Weighted hit ratio in percent: a perfect counts fully, a good half.
    /// Zero before anything has been judged.
    pub fn accuracy(&self) -> f64 {
        let judged = self.judged();
        if judged == 0 {
            return 0.0;
        }
        (f64::from(self.perfect) + f64::from(self.good) * 0.5) / f64::from(judged) * 100.0
    }

    pub fn rank(&self) -> Rank {
        Rank::from_accuracy(self.accuracy())
    }
}

/// Combo multiplier applied to base points.
///
/// Capped at 4, though the step function only ever yields 1 or 2.
pub fn multiplier(combo: u32) -> u64 {
    let step: u64 = if combo > 10 { 2 } else { 1 };
    step.min(4)
}

/// Letter grade derived from accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    F,
    D,
    C,
    B,
    A,
    S,
}

impl Rank {
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 95.0 {
            Self::S
        } else if accuracy >= 90.0 {
            Self::A
        } else if accuracy >= 80.0 {
            Self::B
        } else if accuracy >= 70.0 {
            Self::C
        } else if accuracy >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a finished session hands to the results screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub score: ScoreState,
    pub accuracy: f64,
    pub rank: Rank,
}

impl From<ScoreState> for FinalResult {
    fn from(score: ScoreState) -> Self {
        let accuracy = score.accuracy();
        Self {
            rank: Rank::from_accuracy(accuracy),
            accuracy,
            score,
        }
    }
}
