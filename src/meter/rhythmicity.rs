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

//! Tells loops apart from signals without a steady pulse.
//!
//! A beat grid can be found in almost anything, even in noise. In a loop,
//! the beats split the loop into equal parts and the autocorrelation peaks
//! at the lags of these parts.

use super::autocorrelation::get_normalized_circular_autocorrelation;
use crate::onset::Odf;
use crate::util::mean;

/// Numbers of equal parts a loop is tried to be split into.
const LOOP_DIVISORS: [usize; 7] = [2, 3, 4, 6, 8, 9, 12];

/// Log10 probability a divisor must exceed for the signal to be rhythmic.
const MIN_LOG10_PROBABILITY: f64 = -1.0;

/// Log10 probability of a divisor, from how close the beats are to the
/// multiples of the divisor period and how pronounced the autocorrelation
/// is at the beats that start a part.
fn get_divisor_log10_probability(
    xcorr: &[f64],
    xcorr_mean: f64,
    lags: &[usize],
    divisor: usize,
    lag_duration: f64,
) -> f64 {
    let period = xcorr.len() as f64 / divisor as f64;
    let distances = lags
        .iter()
        .map(|&lag| {
            let lag = lag as f64;
            (lag - (lag / period).round() * period).abs() * lag_duration
        })
        .collect::<Vec<_>>();
    let step = lags.len() / divisor;
    let part_values = (0..divisor)
        .map(|i| xcorr[lags[i * step]])
        .collect::<Vec<_>>();
    let (Some(distance), Some(part_value)) = (mean(&distances), mean(&part_values)) else {
        return f64::NEG_INFINITY;
    };

    // An average distance of 0.1 seconds means a probability of 0.1.
    let distance_log10_probability = -10.0 * distance;
    // 1.0 for a perfect peak, 0.0 for a peak 0.01 above the mean.
    let peakiness = (part_value - xcorr_mean).clamp(0.0, 1.0);
    let peakiness_probability = 1.0 + 0.5 * peakiness.log10();
    if peakiness_probability <= 0.0 {
        return f64::NEG_INFINITY;
    }
    distance_log10_probability + peakiness_probability.log10()
}

/// Whether the beats split the ODF into equal parts that repeat, as they
/// do in a loop.
///
/// `beat_indices` must be ascending. Positions are taken relative to the
/// first beat. Returns `false` if the number of beats has none of the
/// supported divisors.
#[must_use]
pub fn is_rhythmic(odf: &Odf, beat_indices: &[usize]) -> bool {
    let len = odf.values.len();
    let Some(&first) = beat_indices.first() else {
        return false;
    };
    if len == 0 || odf.duration <= 0.0 || beat_indices.iter().any(|&i| i >= len) {
        return false;
    }
    let xcorr = get_normalized_circular_autocorrelation(&odf.values);
    let Some(xcorr_mean) = mean(&xcorr) else {
        return false;
    };

    let lags = beat_indices
        .iter()
        .map(|&i| i.saturating_sub(first))
        .collect::<Vec<_>>();
    let lag_duration = odf.duration / len as f64;
    let best = LOOP_DIVISORS
        .iter()
        .filter(|&&divisor| lags.len() % divisor == 0)
        .map(|&divisor| {
            get_divisor_log10_probability(&xcorr, xcorr_mean, &lags, divisor, lag_duration)
        })
        .fold(f64::NEG_INFINITY, f64::max);
    log::debug!("rhythmicity: log10 probability {best:.3}");
    best > MIN_LOG10_PROBABILITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::BeatTracker;

    /// 4 seconds at 64 values per second with a spike every 32 values.
    fn eight_spikes() -> Odf {
        let mut values = vec![0.0; 256];
        (0..256).step_by(32).for_each(|i| values[i] = 1.0);
        Odf {
            values,
            duration: 4.0,
        }
    }

    #[test]
    fn test_even_beats_are_rhythmic() {
        let odf = eight_spikes();
        let beats = BeatTracker::AutocorrelationPeriod
            .get_beat_indices(&odf)
            .unwrap();
        check!(beats.len() == 8);
        check!(is_rhythmic(&odf, &beats));

        // Only the positions relative to the first beat matter.
        let mut shifted = odf.clone();
        shifted.values.rotate_right(7);
        let beats = beats.iter().map(|&i| i + 7).collect::<Vec<_>>();
        check!(is_rhythmic(&shifted, &beats));
    }

    #[test]
    fn test_uneven_beats_are_not_rhythmic() {
        let odf = eight_spikes();
        check!(!is_rhythmic(&odf, &[0, 40, 50, 100, 130, 170, 200, 250]));
    }

    #[test]
    fn test_beat_counts_without_divisor_are_not_rhythmic() {
        let odf = eight_spikes();
        check!(!is_rhythmic(&odf, &[]));
        check!(!is_rhythmic(&odf, &[0]));
        check!(!is_rhythmic(&odf, &[0, 32, 64, 96, 128, 160, 192]));
    }

    #[test]
    fn test_silence_is_not_rhythmic() {
        let odf = Odf {
            values: vec![0.0; 256],
            duration: 4.0,
        };
        check!(!is_rhythmic(&odf, &[0, 128]));
    }
}
