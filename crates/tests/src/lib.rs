//! Shared signal generators for the integration tests

use std::f64::consts::PI;

pub const SAMPLE_RATE: f64 = 48000.0;

pub fn sine(frequency: f64, amplitude: f64, samples: usize) -> Vec<f64> {
    (0..samples)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / SAMPLE_RATE).sin())
        .collect()
}

pub fn constant(value: f64, samples: usize) -> Vec<f64> {
    vec![value; samples]
}

pub fn silence(samples: usize) -> Vec<f64> {
    vec![0.0; samples]
}

/// Alternating loud and quiet sections of a tone
pub fn bursts(frequency: f64, section: usize, sections: usize) -> Vec<f64> {
    sine(frequency, 1.0, section * sections)
        .into_iter()
        .enumerate()
        .map(|(i, x)| if (i / section) % 2 == 0 { 0.9 * x } else { 0.02 * x })
        .collect()
}

/// Interleave equal-length channels into `f32` frames
pub fn interleave(channels: &[Vec<f64>]) -> Vec<f32> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    (0..frames)
        .flat_map(|i| channels.iter().map(move |ch| ch[i] as f32))
        .collect()
}

pub fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0f64, |acc, s| acc.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave() {
        let left = vec![1.0, 2.0];
        let right = vec![-1.0, -2.0];
        assert_eq!(interleave(&[left, right]), vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_bursts_alternate() {
        let signal = bursts(1000.0, 480, 4);
        assert_eq!(signal.len(), 1920);
        assert!(peak(&signal[..480]) > 0.8);
        assert!(peak(&signal[480..960]) < 0.03);
    }
}
