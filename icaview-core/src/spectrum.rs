//! One-sided power spectrum of component time series
//!
//! Reproduces the reference pipeline's spectrum routine exactly:
//! `power = abs(rfft(data))^2` with frequency bins from
//! `rfftfreq(power.len()*2 - 1, dt)`. That frequency denominator is
//! `num_bins*2 - 1`, which for even-length input is N+1 rather than N.
//! The divergence is intentional and load-bearing: changing it breaks
//! bit-compatibility with the reference output.
//!
//! Direct summation is O(N^2); fMRI time series run a few hundred
//! volumes, well within budget.

use serde::Serialize;

/// One-sided power spectrum: `frequencies[k]` in cycles per unit of the
/// sampling interval, `power[k]` the squared DFT magnitude.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

/// Compute the one-sided power spectrum of a real-valued series.
///
/// `sampling_interval` is the time between samples (the fMRI repetition
/// time); with the default of 1.0 the frequency axis is in cycles per
/// sample. Empty input yields an empty spectrum.
pub fn compute_power_spectrum(series: &[f64], sampling_interval: f64) -> PowerSpectrum {
    if series.is_empty() {
        return PowerSpectrum::default();
    }

    let n = series.len();
    let num_bins = n / 2 + 1;
    let mut frequencies = Vec::with_capacity(num_bins);
    let mut power = Vec::with_capacity(num_bins);

    for k in 0..num_bins {
        let angle = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
        let mut re = 0.0;
        let mut im = 0.0;
        for (i, value) in series.iter().enumerate() {
            let theta = angle * i as f64;
            re += value * theta.cos();
            im += value * theta.sin();
        }

        power.push(re * re + im * im);

        // rfftfreq(num_bins*2 - 1, dt): N+1 in the denominator for even N
        frequencies.push(k as f64 / ((num_bins * 2 - 1) as f64 * sampling_interval));
    }

    PowerSpectrum { frequencies, power }
}

/// Convert power values to decibels relative to `reference` (default: the
/// maximum power).
///
/// Non-positive power floors at -100 dB; a zero reference maps every
/// value to 0 dB rather than dividing by zero. Empty input yields empty
/// output.
pub fn power_to_decibels(power: &[f64], reference: Option<f64>) -> Vec<f64> {
    if power.is_empty() {
        return Vec::new();
    }

    let max = power.iter().cloned().fold(f64::MIN, f64::max);
    let reference = reference.unwrap_or(max);
    if reference == 0.0 {
        return vec![0.0; power.len()];
    }

    power
        .iter()
        .map(|&p| {
            if p <= 0.0 {
                -100.0
            } else {
                10.0 * (p / reference).log10()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series() {
        let spectrum = compute_power_spectrum(&[], 1.0);
        assert!(spectrum.frequencies.is_empty());
        assert!(spectrum.power.is_empty());
    }

    #[test]
    fn test_bin_count_and_shape() {
        for n in [1, 2, 5, 8, 100, 101] {
            let series: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
            let spectrum = compute_power_spectrum(&series, 1.0);
            assert_eq!(spectrum.frequencies.len(), n / 2 + 1);
            assert_eq!(spectrum.power.len(), n / 2 + 1);
            assert_eq!(spectrum.frequencies[0], 0.0);
            assert!(spectrum.power.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_one_cycle_oscillation_peaks_at_k1() {
        // One full cycle over four samples concentrates power in bin 1
        let spectrum = compute_power_spectrum(&[1.0, 0.0, -1.0, 0.0], 1.0);
        assert_eq!(spectrum.power.len(), 3);
        assert!(spectrum.power[1] > spectrum.power[0] * 100.0);
        assert!(spectrum.power[1] > spectrum.power[2] * 100.0);
        assert!((spectrum.power[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_dc_component() {
        // Constant series: all power at k=0, equal to (sum)^2
        let spectrum = compute_power_spectrum(&[2.0, 2.0, 2.0, 2.0, 2.0], 1.0);
        assert!((spectrum.power[0] - 100.0).abs() < 1e-9);
        for &p in &spectrum.power[1..] {
            assert!(p < 1e-9);
        }
    }

    #[test]
    fn test_even_length_frequency_axis_quirk() {
        // N=4: num_bins=3, denominator is 3*2-1 = 5, not 4
        let spectrum = compute_power_spectrum(&[1.0, 0.0, -1.0, 0.0], 1.0);
        assert!((spectrum.frequencies[1] - 1.0 / 5.0).abs() < 1e-12);
        assert!((spectrum.frequencies[2] - 2.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_odd_length_frequency_axis() {
        // N=5: num_bins=3, denominator 5 matches the naive axis
        let series = [1.0, 0.5, -0.5, -1.0, 0.0];
        let spectrum = compute_power_spectrum(&series, 2.0);
        assert!((spectrum.frequencies[2] - 2.0 / 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_sampling_interval_scales_axis() {
        let series = [1.0, 0.0, -1.0, 0.0];
        let unit = compute_power_spectrum(&series, 1.0);
        let doubled = compute_power_spectrum(&series, 2.0);
        for (a, b) in unit.frequencies.iter().zip(&doubled.frequencies) {
            assert!((a - b * 2.0).abs() < 1e-12);
        }
        assert_eq!(unit.power, doubled.power);
    }

    #[test]
    fn test_decibels_relative_to_max() {
        let db = power_to_decibels(&[1.0, 10.0, 100.0], None);
        assert!((db[2] - 0.0).abs() < 1e-9);
        assert!((db[1] + 10.0).abs() < 1e-9);
        assert!((db[0] + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_decibels_floor_and_zero_reference() {
        let db = power_to_decibels(&[0.0, -1.0, 4.0], Some(4.0));
        assert_eq!(db[0], -100.0);
        assert_eq!(db[1], -100.0);
        assert!((db[2] - 0.0).abs() < 1e-9);

        assert_eq!(power_to_decibels(&[1.0, 2.0], Some(0.0)), vec![0.0, 0.0]);
        assert!(power_to_decibels(&[], None).is_empty());
    }
}
