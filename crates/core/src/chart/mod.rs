//! Chart generation: turns an [`EnergyProfile`] into timed lane notes.
//!
//! Onsets are found with an adaptive threshold: a window counts when it is
//! louder than the trailing average by a fixed ratio, louder than the window
//! before it, and above an absolute noise floor. Emitted notes are spaced at
//! least `min_gap_seconds` apart. Lanes are drawn from an injected [`Rng`] so
//! a chart is reproducible from `(audio, seed)`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    AudioBuffer, BeatlaneError, DetectorConfig, EnergyProfile, Result, LANE_COUNT, TIME_EPSILON,
};

/// One hittable chart event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Index of the energy window the onset was found in.
    pub id: usize,
    /// Target hit instant, in seconds from track start.
    pub time: f64,
    pub lane: usize,
    #[serde(default)]
    pub hit: bool,
    #[serde(default)]
    pub missed: bool,
}

impl Note {
    pub fn new(id: usize, time: f64, lane: usize) -> Self {
        Self {
            id,
            time,
            lane,
            hit: false,
            missed: false,
        }
    }

    /// Neither hit nor missed yet.
    pub fn is_pending(&self) -> bool {
        !self.hit && !self.missed
    }
}

/// An ordered note sequence plus the length of the track it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    notes: Vec<Note>,
    /// Track length in seconds.
    duration: f64,
}

impl Chart {
    /// Builds a chart, rejecting note sequences that break chart ordering or
    /// lane bounds.
    pub fn new(notes: Vec<Note>, duration: f64) -> Result<Self> {
        let chart = Self { notes, duration };
        chart.validate()?;
        Ok(chart)
    }

    /// Reads a chart previously written with [`Chart::to_json`].
    pub fn from_json(text: &str) -> Result<Self> {
        let chart: Self = serde_json::from_str(text)?;
        chart.validate()?;
        Ok(chart)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(BeatlaneError::msg(format!(
                "chart duration {} is not a valid track length",
                self.duration
            )));
        }
        let mut previous = 0.0_f64;
        for note in &self.notes {
            if note.time.is_nan() || note.time < previous {
                return Err(BeatlaneError::msg(format!(
                    "note {} at {}s breaks time ordering",
                    note.id, note.time
                )));
            }
            if note.lane >= LANE_COUNT {
                return Err(BeatlaneError::msg(format!(
                    "note {} uses lane {} (expected < {LANE_COUNT})",
                    note.id, note.lane
                )));
            }
            if note.hit && note.missed {
                return Err(BeatlaneError::msg(format!(
                    "note {} is flagged both hit and missed",
                    note.id
                )));
            }
            previous = note.time;
        }
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Energy onset detector.
#[derive(Debug, Clone, Default)]
pub struct OnsetDetector {
    config: DetectorConfig,
}

impl OnsetDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Scans the profile front to back and emits notes in time order.
    pub fn detect<R: Rng>(&self, profile: &EnergyProfile, rng: &mut R) -> Vec<Note> {
        let energies = profile.energies();
        let mut notes: Vec<Note> = Vec::new();
        let mut previous_energy = 0.0_f32;

        for (index, &energy) in energies.iter().enumerate() {
            let history = &energies[index.saturating_sub(self.config.history_windows)..index];
            let local_average = if history.is_empty() {
                0.0
            } else {
                history.iter().sum::<f32>() / history.len() as f32
            };

            let is_onset = energy > local_average * self.config.threshold_ratio
                && energy > previous_energy
                && energy > self.config.noise_floor;
            previous_energy = energy;

            if !is_onset {
                continue;
            }

            let time = profile.time_of(index);
            let last = notes.last();
            if let Some(last) = last {
                if time - last.time < self.config.min_gap_seconds - TIME_EPSILON {
                    continue;
                }
            }

            let lane = self.pick_lane(last.map(|note| note.lane), rng);
            notes.push(Note::new(index, time, lane));
        }

        notes
    }

    /// Uniform lane draw; a repeat of the previous lane is kept only with
    /// probability `repeat_lane_acceptance`, otherwise redrawn.
    fn pick_lane<R: Rng>(&self, previous: Option<usize>, rng: &mut R) -> usize {
        let mut lane = rng.gen_range(0..LANE_COUNT);
        if let Some(previous) = previous {
            while lane == previous && rng.gen::<f64>() >= self.config.repeat_lane_acceptance {
                lane = rng.gen_range(0..LANE_COUNT);
            }
        }
        lane
    }
}

/// Full pipeline from decoded audio to a playable chart.
///
/// Fails fast when the buffer is unusable; a short or silent buffer is not an
/// error and produces an empty chart.
pub fn generate_chart(buffer: &AudioBuffer, config: &DetectorConfig, seed: u64) -> Result<Chart> {
    buffer.validate()?;

    let profile = EnergyProfile::compute(&buffer.samples, buffer.sample_rate, config.window_seconds)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let notes = OnsetDetector::new(config.clone()).detect(&profile, &mut rng);

    tracing::debug!(
        windows = profile.len(),
        notes = notes.len(),
        seed,
        "generated chart"
    );

    Ok(Chart {
        notes,
        duration: buffer.duration(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn detect(energies: Vec<f32>, seed: u64) -> Vec<Note> {
        let profile = EnergyProfile::from_energies(energies, 0.05);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        OnsetDetector::default().detect(&profile, &mut rng)
    }

    fn ids(notes: &[Note]) -> Vec<usize> {
        notes.iter().map(|note| note.id).collect()
    }

    #[test]
    fn sustained_energy_triggers_once() {
        let notes = detect(vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5], 1);
        assert_eq!(ids(&notes), vec![4]);
        assert!((notes[0].time - 0.2).abs() < 1e-12);
        assert!(notes[0].is_pending());
    }

    #[test]
    fn onsets_inside_min_gap_are_suppressed() {
        let notes = detect(vec![0.0, 0.5, 0.0, 0.9, 0.0, 0.0, 0.0, 0.9], 1);
        assert_eq!(ids(&notes), vec![1, 7]);
    }

    #[test]
    fn gap_of_exactly_min_gap_is_allowed() {
        let notes = detect(vec![0.0, 0.5, 0.0, 0.0, 0.9], 1);
        assert_eq!(ids(&notes), vec![1, 4]);
    }

    #[test]
    fn energy_at_noise_floor_is_ignored() {
        let notes = detect(vec![0.0, 0.05, 0.0, 0.05, 0.0], 1);
        assert!(notes.is_empty());
    }

    #[test]
    fn quiet_rise_below_local_average_is_ignored() {
        // Loud bed followed by a small rise that does not clear 1.3x average.
        let mut energies = vec![0.6; 10];
        energies.extend([0.5, 0.65]);
        let notes = detect(energies, 1);
        assert_eq!(ids(&notes), vec![0]);
    }

    #[test]
    fn seed_makes_lanes_reproducible() {
        let energies: Vec<f32> = (0..200)
            .map(|i| if i % 5 == 0 { 0.8 } else { 0.0 })
            .collect();
        assert_eq!(detect(energies.clone(), 42), detect(energies, 42));
    }

    #[test]
    fn zero_acceptance_never_repeats_lanes() {
        let energies: Vec<f32> = (0..400)
            .map(|i| if i % 4 == 0 { 0.8 } else { 0.0 })
            .collect();
        let profile = EnergyProfile::from_energies(energies, 0.05);
        let detector = OnsetDetector::new(DetectorConfig {
            repeat_lane_acceptance: 0.0,
            ..DetectorConfig::default()
        });
        let notes = detector.detect(&profile, &mut ChaCha8Rng::seed_from_u64(3));

        assert!(notes.len() > 50);
        for pair in notes.windows(2) {
            assert_ne!(pair[0].lane, pair[1].lane);
        }
    }

    #[test]
    fn impulses_one_second_apart_yield_one_note_each() {
        let sample_rate = 1_000;
        let mut samples = vec![0.0_f32; 5 * sample_rate];
        for second in 0..5 {
            let start = second * sample_rate;
            for sample in &mut samples[start..start + 10] {
                *sample = 1.0;
            }
        }
        let buffer = AudioBuffer::new(samples, sample_rate as u32);
        let chart = generate_chart(&buffer, &DetectorConfig::default(), 7).unwrap();

        assert_eq!(chart.len(), 5);
        for (second, note) in chart.notes().iter().enumerate() {
            assert!((note.time - second as f64).abs() <= 0.05 + 1e-9);
        }
        assert!((chart.duration() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn silent_or_short_audio_gives_empty_chart() {
        let silent = AudioBuffer::new(vec![0.0; 44_100], 44_100);
        assert!(generate_chart(&silent, &DetectorConfig::default(), 0)
            .unwrap()
            .is_empty());

        let short = AudioBuffer::new(vec![1.0; 10], 44_100);
        assert!(generate_chart(&short, &DetectorConfig::default(), 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unusable_audio_fails_fast() {
        let buffer = AudioBuffer::new(vec![0.0; 100], 0);
        let err = generate_chart(&buffer, &DetectorConfig::default(), 0).unwrap_err();
        assert!(matches!(err, BeatlaneError::InvalidAudio(_)));
    }

    #[test]
    fn chart_json_round_trip_and_validation() {
        let chart = Chart::new(vec![Note::new(0, 0.5, 1), Note::new(3, 0.8, 2)], 2.0).unwrap();
        let restored = Chart::from_json(&chart.to_json().unwrap()).unwrap();
        assert_eq!(restored, chart);

        assert!(Chart::new(vec![Note::new(0, 1.0, 0), Note::new(1, 0.5, 0)], 2.0).is_err());
        assert!(Chart::new(vec![Note::new(0, 1.0, 4)], 2.0).is_err());
    }

    proptest! {
        #[test]
        fn detected_notes_respect_chart_invariants(
            energies in proptest::collection::vec(0.0_f32..1.0, 0..400),
            seed in any::<u64>(),
        ) {
            let notes = detect(energies, seed);
            for note in &notes {
                prop_assert!(note.lane < LANE_COUNT);
                prop_assert!(note.time >= 0.0);
                prop_assert!(note.is_pending());
            }
            for pair in notes.windows(2) {
                prop_assert!(pair[1].time >= pair[0].time);
                prop_assert!(pair[1].time - pair[0].time >= 0.15 - 1e-9);
            }
        }
    }
}
