use anyhow::Context;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for generating a synthetic multichannel signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rows: usize,
    pub columns: usize,
    pub frequency: f64,
    pub noise: f64,
    pub seed: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rows: 256,
            columns: 4,
            frequency: 8.0,
            noise: 0.05,
            seed: 0,
        }
    }
}

/// Uniform jitter in `[-amplitude, amplitude)`; zero when the amplitude is not
/// a positive finite number.
pub(crate) fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude.is_finite() && amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

/// Rows are samples, columns are channels. Each channel is a phase-shifted
/// sine with a decaying envelope plus seeded noise.
pub fn build_signal(config: &SignalConfig) -> anyhow::Result<Array2<f64>> {
    let rows = config.rows.max(1);
    let columns = config.columns.max(1);
    rows.checked_mul(columns)
        .context("overflow computing sample count for generator")?;
    anyhow::ensure!(
        config.noise.is_finite(),
        "noise amplitude must be finite, got {}",
        config.noise
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let signal = Array2::from_shape_fn((rows, columns), |(row, column)| {
        let position = row as f64 / rows as f64;
        let phase = position * 2.0 * PI * config.frequency + column as f64 * 0.25;
        let envelope = 0.2 + 0.8 * (1.0 - position);
        phase.sin() * envelope + jitter(&mut rng, config.noise)
    });
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_expected_shape() {
        let config = SignalConfig {
            rows: 64,
            columns: 3,
            ..Default::default()
        };
        let signal = build_signal(&config).unwrap();
        assert_eq!(signal.dim(), (64, 3));
    }

    #[test]
    fn same_seed_same_signal() {
        let config = SignalConfig::default();
        assert_eq!(build_signal(&config).unwrap(), build_signal(&config).unwrap());
    }

    #[test]
    fn zero_noise_is_allowed() {
        let config = SignalConfig {
            noise: 0.0,
            rows: 4,
            columns: 1,
            ..Default::default()
        };
        let signal = build_signal(&config).unwrap();
        assert_eq!(signal[[0, 0]], 0.0);
    }

    #[test]
    fn infinite_noise_is_an_error() {
        let config = SignalConfig {
            noise: f64::INFINITY,
            rows: 4,
            columns: 1,
            ..Default::default()
        };
        assert!(build_signal(&config).is_err());

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(jitter(&mut rng, f64::INFINITY), 0.0);
        assert_eq!(jitter(&mut rng, f64::NAN), 0.0);
    }
}
