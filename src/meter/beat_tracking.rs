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

//! Finds the beats in an onset detection function.

use super::autocorrelation::get_normalized_circular_autocorrelation;
use crate::onset::Odf;
use crate::util::{get_peak_indices, mean};

/// Slowest tempo the beat period search considers.
const MIN_BPM: f64 = 60.0;
/// Fastest tempo the beat period search considers.
const MAX_BPM: f64 = 180.0;

/// The available beat tracking algorithms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BeatTracker {
    /// Estimates the beat period from the autocorrelation of the ODF and
    /// lays an evenly spaced beat grid over the loop, aligned with the
    /// strongest onsets.
    #[default]
    AutocorrelationPeriod,
    /// Every autocorrelation peak above the autocorrelation mean is snapped
    /// to the closest ODF peak.
    OdfPeakPicking,
}

impl BeatTracker {
    /// Returns the ascending ODF indices of the beats or `None` if no beat
    /// was found.
    #[must_use]
    pub fn get_beat_indices(self, odf: &Odf) -> Option<Vec<usize>> {
        let beats = match self {
            Self::AutocorrelationPeriod => get_beats_from_autocorrelation(odf),
            Self::OdfPeakPicking => get_beats_from_odf_peaks(odf),
        }?;
        log::debug!("{self:?} found {} beats", beats.len());
        (!beats.is_empty()).then_some(beats)
    }
}

/// Climbs from `index` to the closest local maximum.
fn climb_to_peak(values: &[f64], mut index: usize) -> usize {
    loop {
        if index + 1 < values.len() && values[index + 1] > values[index] {
            index += 1;
        } else if index > 0 && values[index - 1] > values[index] {
            index -= 1;
        } else {
            return index;
        }
    }
}

/// First autocorrelation peak above the mean within the tempo range.
fn find_beat_period(xcorr: &[f64], odf_sample_rate: f64) -> Option<usize> {
    let len = xcorr.len();
    let min_lag = ((odf_sample_rate * 60.0 / MAX_BPM) as usize).max(1);
    let max_lag = ((odf_sample_rate * 60.0 / MIN_BPM).ceil() as usize).min(len.checked_sub(2)?);
    let xcorr_mean = mean(xcorr)?;
    (min_lag..=max_lag).find(|&lag| {
        xcorr[lag] > xcorr_mean && xcorr[lag] > xcorr[lag - 1] && xcorr[lag] >= xcorr[lag + 1]
    })
}

/// Lags of the beats relative to the first beat, found at the
/// autocorrelation peaks close to multiples of the beat period.
fn get_beat_lags(xcorr: &[f64], period: usize) -> Option<Vec<usize>> {
    let len = xcorr.len();
    let mut lags = vec![0, period];
    let mut prev = period;
    for num_periods in 1.. {
        let estimate =
            (prev as f64 * (num_periods + 1) as f64 / num_periods as f64).round() as usize;
        // Less than half a period left: that is the first beat again.
        if estimate + period / 2 >= len {
            break;
        }
        let lag = climb_to_peak(xcorr, estimate);
        if lag == prev {
            // Periodicity is not consistent.
            return None;
        }
        if lag < prev || lag + period / 2 >= len {
            break;
        }
        lags.push(lag);
        prev = lag;
    }
    Some(lags)
}

/// Circular shift of the beat grid that maximizes the summed onset strength.
fn find_phase(values: &[f64], lags: &[usize], period: usize) -> usize {
    let len = values.len();
    let strength = |offset: usize| lags.iter().map(|&lag| values[(lag + offset) % len]).sum::<f64>();
    (0..period)
        .map(|offset| (offset, strength(offset)))
        .fold((0, f64::NEG_INFINITY), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
        .0
}

fn get_beats_from_autocorrelation(odf: &Odf) -> Option<Vec<usize>> {
    let xcorr = get_normalized_circular_autocorrelation(&odf.values);
    let period = find_beat_period(&xcorr, odf.sample_rate())?;
    let lags = get_beat_lags(&xcorr, period)?;
    let phase = find_phase(&odf.values, &lags, period);
    log::debug!("beat period of {period} ODF samples, phase {phase}");

    let len = odf.values.len();
    let mut beats = lags.iter().map(|&lag| (lag + phase) % len).collect::<Vec<_>>();
    beats.sort_unstable();
    beats.dedup();
    Some(beats)
}

/// ODF peak with the smallest circular distance to `index`.
fn closest_peak(peaks: &[usize], index: usize, len: usize) -> Option<usize> {
    peaks.iter().copied().min_by_key(|&peak| {
        let distance = peak.abs_diff(index);
        distance.min(len - distance)
    })
}

fn get_beats_from_odf_peaks(odf: &Odf) -> Option<Vec<usize>> {
    let odf_peaks = get_peak_indices(&odf.values);
    if odf_peaks.is_empty() {
        return None;
    }
    let xcorr = get_normalized_circular_autocorrelation(&odf.values);
    let xcorr_mean = mean(&xcorr)?;

    let len = odf.values.len();
    let mut beats = get_peak_indices(&xcorr)
        .into_iter()
        .filter(|&lag| xcorr[lag] > xcorr_mean)
        .filter_map(|lag| closest_peak(&odf_peaks, lag, len))
        .collect::<Vec<_>>();
    beats.sort_unstable();
    beats.dedup();
    Some(beats)
}
