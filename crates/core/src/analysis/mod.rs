use std::ops::Index;

use crate::{BeatlaneError, Result};

/// Short-window RMS loudness of a track. Entry `i` covers the audio starting
/// at `i * window_seconds`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyProfile {
    window_seconds: f64,
    energies: Vec<f32>,
}

impl EnergyProfile {
    /// Splits `samples` into consecutive non-overlapping windows and measures
    /// each one. A trailing partial window is dropped.
    pub fn compute(samples: &[f32], sample_rate: u32, window_seconds: f64) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BeatlaneError::InvalidAudio("sample rate must be positive"));
        }
        if window_seconds.is_nan() || window_seconds <= 0.0 {
            return Err(BeatlaneError::InvalidAudio("window length must be positive"));
        }

        let samples_per_window = samples_per_window(sample_rate, window_seconds);
        let energies = samples
            .chunks_exact(samples_per_window)
            .map(compute_rms)
            .collect();

        Ok(Self {
            window_seconds,
            energies,
        })
    }

    /// Wraps precomputed energies, mostly useful for driving the detector
    /// with synthetic curves.
    pub fn from_energies(energies: Vec<f32>, window_seconds: f64) -> Self {
        Self {
            window_seconds,
            energies,
        }
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    pub fn energies(&self) -> &[f32] {
        &self.energies
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Start time of window `index` in seconds.
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 * self.window_seconds
    }
}

impl Index<usize> for EnergyProfile {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.energies[index]
    }
}

/// Number of samples in one window, never zero.
pub fn samples_per_window(sample_rate: u32, window_seconds: f64) -> usize {
    ((f64::from(sample_rate) * window_seconds).round() as usize).max(1)
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_value_per_complete_window() {
        // 100 Hz with 50 ms windows -> 5 samples per window.
        let samples = vec![0.5_f32; 23];
        let profile = EnergyProfile::compute(&samples, 100, 0.05).unwrap();

        assert_eq!(profile.len(), 4);
        for energy in profile.energies() {
            assert!((energy - 0.5).abs() < 1e-6);
        }
        assert!((profile.time_of(3) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn rms_of_alternating_signal() {
        let samples = [1.0_f32, -1.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0];
        let profile = EnergyProfile::compute(&samples, 80, 0.05).unwrap();

        assert_eq!(profile.len(), 2);
        assert!((profile[0] - 1.0).abs() < 1e-6);
        assert_eq!(profile[1], 0.0);
    }

    #[test]
    fn short_or_empty_input_yields_empty_profile() {
        let profile = EnergyProfile::compute(&[0.9; 3], 100, 0.05).unwrap();
        assert!(profile.is_empty());

        let profile = EnergyProfile::compute(&[], 44_100, 0.05).unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn window_length_is_rounded() {
        assert_eq!(samples_per_window(44_100, 0.05), 2_205);
        assert_eq!(samples_per_window(22_050, 0.05), 1_103);
        assert_eq!(samples_per_window(1, 0.05), 1);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let err = EnergyProfile::compute(&[0.0; 10], 0, 0.05).unwrap_err();
        assert!(matches!(err, BeatlaneError::InvalidAudio(_)));
    }
}
