/*
MIT License

Copyright (c) 2024 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Builds the onset detection function (ODF): a novelty curve with one value
//! per analysis frame that rises whenever spectral energy appears.

use crate::audio_input::AudioSource;
use crate::error::{AnalysisError, ProgressCallback};
use crate::stft::{PowerSpectrum, StftFrameProvider};
use crate::util::{get_normalized_hann_window, wrap_index};

/// Gain applied to the spectral magnitude before the logarithmic
/// compression, roughly emulating perceived loudness.
const COMPRESSION_GAIN: f64 = 1000.0;

/// Length of the moving average that is subtracted from the novelty curve.
const MOVING_AVERAGE_DURATION_SECS: f64 = 0.2;

/// An onset detection function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Odf {
    /// One non-negative novelty value per analysis frame. The length is a
    /// power of two.
    pub values: Vec<f64>,
    /// Duration of the analyzed audio in seconds.
    pub duration: f64,
}

impl Odf {
    /// Number of ODF values per second.
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        if self.duration > 0.0 {
            self.values.len() as f64 / self.duration
        } else {
            0.0
        }
    }

    /// Whether all values are zero, i.e., no onset is left.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// Half-wave rectified difference of consecutive compressed spectra.
///
/// `prev` is updated to `current` afterwards.
fn get_novelty_measure(prev: &mut [f64], current: &[f64], noise_gate: f64) -> f64 {
    let novelty = prev
        .iter_mut()
        .zip(current.iter())
        .map(|(p, &c)| {
            let diff = c - *p;
            *p = c;
            diff.max(0.0)
        })
        .sum::<f64>();
    if novelty / current.len() as f64 > noise_gate {
        novelty
    } else {
        0.0
    }
}

/// Applies `log2(1 + gamma * |X|)` to each bin of a power spectrum in place.
fn compress(power: &mut [f64]) {
    power
        .iter_mut()
        .for_each(|p| *p = (1.0 + COMPRESSION_GAIN * p.sqrt()).log2());
}

/// Returns the circular moving average of `values`, weighted with a
/// normalized Hann window of `2 * half_len + 1` taps.
#[must_use]
pub fn get_moving_average(values: &[f64], half_len: usize) -> Vec<f64> {
    let len = values.len();
    if len == 0 {
        return Vec::new();
    }
    let window = get_normalized_hann_window(2 * half_len + 1);
    (0..len)
        .map(|i| {
            window
                .iter()
                .enumerate()
                .map(|(j, w)| {
                    let index = i as i64 + j as i64 - half_len as i64;
                    w * values[wrap_index(index, len)]
                })
                .sum()
        })
        .collect()
}

/// Half length of the moving average window in ODF samples.
fn moving_average_half_len(odf_sample_rate: f64) -> usize {
    let quarter = (MOVING_AVERAGE_DURATION_SECS * odf_sample_rate / 4.0).round() as usize;
    quarter * 2 + 1
}

/// Subtracts the moving average from `values` and clamps the result to be
/// non-negative. This removes slow swells of loudness.
pub fn remove_trend(values: &mut [f64], odf_sample_rate: f64) {
    let average = get_moving_average(values, moving_average_half_len(odf_sample_rate));
    values
        .iter_mut()
        .zip(average)
        .for_each(|(v, avg)| *v = (*v - avg).max(0.0));
}

/// Computes the onset detection function of the source.
///
/// The first frame only seeds the history. The first value compares the
/// first frame with the last one, as the audio is considered to be cyclic,
/// so that value `k` is the novelty of frame `k`. Hence, the ODF has as many values as there are frames. `progress` is
/// invoked once per frame.
///
/// The returned ODF is not yet detrended, see [`remove_trend`].
pub fn get_raw_onset_detection_function<S: AudioSource>(
    source: S,
    treat_as_loop: bool,
    noise_gate: f64,
    progress: &mut dyn ProgressCallback,
) -> Result<Odf, AnalysisError> {
    let duration = source.duration_secs();
    let mut frames = StftFrameProvider::new(source, treat_as_loop);
    let num_frames = frames.num_frames();
    let mut spectrum = PowerSpectrum::new(frames.frame_size());
    let num_bins = spectrum.num_bins();

    let mut values = Vec::with_capacity(num_frames);
    let mut first = None;
    let mut prev = vec![0.0; num_bins];
    let mut current = vec![0.0; num_bins];

    for (i, frame) in frames.by_ref().enumerate() {
        let frame = frame?;
        spectrum.compute(&frame, &mut current);
        compress(&mut current);

        if first.is_none() {
            first = Some(current.clone());
            prev.copy_from_slice(&current);
        } else {
            values.push(get_novelty_measure(&mut prev, &current, noise_gate));
        }

        progress.on_progress((i + 1) as f64 / num_frames as f64)?;
    }

    // Closing the loop: the onset at the loop start is found at index 0.
    if let Some(first) = first {
        values.push(get_novelty_measure(&mut prev, &first, noise_gate));
        values.rotate_right(1);
    }
    debug_assert_eq!(values.len(), num_frames);

    Ok(Odf { values, duration })
}

/// Computes the detrended onset detection function of the source.
///
/// See [`get_raw_onset_detection_function`] and [`remove_trend`].
pub fn get_onset_detection_function<S: AudioSource>(
    source: S,
    treat_as_loop: bool,
    noise_gate: f64,
    progress: &mut dyn ProgressCallback,
) -> Result<Odf, AnalysisError> {
    let mut odf = get_raw_onset_detection_function(source, treat_as_loop, noise_gate, progress)?;
    let odf_sample_rate = odf.sample_rate();
    remove_trend(&mut odf.values, odf_sample_rate);
    Ok(odf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_input::MonoSamples;
    use crate::config::DEFAULT_ODF_NOISE_GATE;
    use crate::error::NoProgress;
    use crate::test_utils::synth;

    #[test]
    fn test_novelty_is_half_wave_rectified() {
        let mut prev = vec![1.0, 2.0, 3.0];
        let novelty = get_novelty_measure(&mut prev, &[2.0, 1.0, 5.0], 0.0);
        check!(novelty == 3.0);
        check!(prev == vec![2.0, 1.0, 5.0]);
    }

    #[test]
    fn test_novelty_below_noise_gate_is_zero() {
        let mut prev = vec![0.0; 4];
        check!(get_novelty_measure(&mut prev, &[0.01, 0.0, 0.0, 0.0], 0.01) == 0.0);
        let mut prev = vec![0.0; 4];
        check!(get_novelty_measure(&mut prev, &[1.0, 0.0, 0.0, 0.0], 0.01) == 1.0);
    }

    #[test]
    fn test_moving_average() {
        check!(get_moving_average(&[], 3).is_empty());

        // The average of a constant is the constant.
        let average = get_moving_average(&[2.0; 16], 3);
        check!(average.iter().all(|&a| approx_eq!(f64, a, 2.0, epsilon = 1e-9)));

        // Circular: an impulse at the begin spreads to the end as well.
        let mut values = vec![0.0; 16];
        values[0] = 1.0;
        let average = get_moving_average(&values, 1);
        check!(average[15] > 0.0);
        check!(approx_eq!(f64, average[15], average[1], epsilon = 1e-12));
        check!(average[0] > average[1]);
        check!(average[2] == 0.0);
    }

    #[test]
    fn test_remove_trend_clamps_to_zero() {
        let mut values = vec![0.0; 32];
        values[10] = 5.0;
        remove_trend(&mut values, 64.0);
        check!(values.iter().all(|&v| v >= 0.0));
        check!(values[10] > 0.0);
        check!(values[9] == 0.0);
    }

    #[test]
    fn test_silence_has_silent_odf() {
        let samples = vec![0.0; 44100];
        let odf = get_onset_detection_function(
            MonoSamples::new(&samples, 44100),
            true,
            DEFAULT_ODF_NOISE_GATE,
            &mut NoProgress,
        )
        .unwrap();
        check!(odf.values.len().is_power_of_two());
        check!(odf.is_silent());
        check!(approx_eq!(f64, odf.duration, 1.0));
    }

    #[test]
    fn test_odf_peaks_at_onsets() {
        // Four beats at 120 BPM, one every 32 ODF samples.
        let samples = synth::click_loop(44100, 120.0, &[1.0, 1.0, 1.0, 1.0]);
        let odf = get_onset_detection_function(
            MonoSamples::new(&samples, 44100),
            true,
            DEFAULT_ODF_NOISE_GATE,
            &mut NoProgress,
        )
        .unwrap();
        check!(odf.values.len() == 128);
        check!(approx_eq!(f64, odf.sample_rate(), 64.0, epsilon = 1e-9));

        let max_index = odf
            .values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        // The onset is detected by the frame that first contains it.
        check!(max_index % 32 == 0);
        // The click at the loop start is found by the wrap-around comparison.
        check!(odf.values[0] > odf.values[1]);
        check!(odf.values[0] > odf.values[127]);
        // Periodic signal, periodic ODF.
        for i in 0..96 {
            check!(approx_eq!(
                f64,
                odf.values[i],
                odf.values[i + 32],
                epsilon = 1e-6
            ));
        }
    }

    #[test]
    fn test_progress_is_reported_per_frame() {
        let samples = vec![0.0; 44100];
        let mut reported = Vec::new();
        let mut progress = |fraction: f64| -> Result<(), AnalysisError> {
            reported.push(fraction);
            Ok(())
        };
        let odf = get_onset_detection_function(
            MonoSamples::new(&samples, 44100),
            true,
            DEFAULT_ODF_NOISE_GATE,
            &mut progress,
        )
        .unwrap();
        check!(reported.len() == odf.values.len());
        check!(reported.last() == Some(&1.0));
    }

    #[test]
    fn test_cancellation_aborts() {
        let samples = vec![0.0; 44100];
        let mut calls = 0;
        let mut progress = |_fraction: f64| {
            calls += 1;
            if calls == 3 {
                Err(AnalysisError::Cancelled)
            } else {
                Ok(())
            }
        };
        let res = get_onset_detection_function(
            MonoSamples::new(&samples, 44100),
            true,
            DEFAULT_ODF_NOISE_GATE,
            &mut progress,
        );
        check!(matches!(res, Err(AnalysisError::Cancelled)));
        check!(calls == 3);
    }
}
