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

//! Cleans up an onset detection function before meter fitting.
//!
//! Two passes are applied:
//! 1. Noise peaks are removed. All peaks are clustered by their height and
//!    the lower clusters are considered noise.
//! 2. Temporal masking: like in human hearing, a loud onset masks quieter
//!    onsets shortly before and after it.

use super::clustering::{get_centroid, get_clusters};
use crate::util::get_peak_indices;

/// Maximum distance at which a peak masks smaller values.
const TEMPORAL_MASKING_DURATION_SECS: f64 = 0.1;

/// Peak values of the clusters a noise peak removal pass worked with, sorted
/// by ascending centroid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterReport {
    /// Peak values of all clusters.
    pub clusters: Vec<Vec<f64>>,
    /// Peak values of the clusters that were considered noise.
    pub suppressed_clusters: Vec<Vec<f64>>,
}

/// Walks from `peak` in direction `step` as long as the values don't rise.
fn find_trough(values: &[f64], peak: usize, step: isize) -> usize {
    let len = values.len();
    let mut index = peak;
    for _ in 0..len {
        let next = (index as isize + step).rem_euclid(len as isize) as usize;
        if values[next] <= values[index] {
            index = next;
        } else {
            break;
        }
    }
    index
}

/// Returns the troughs left and right of a peak.
#[must_use]
pub fn get_surrounding_troughs(values: &[f64], peak: usize) -> (usize, usize) {
    (find_trough(values, peak, -1), find_trough(values, peak, 1))
}

/// Sets `values` to zero in the circular half-open range `[from, to)`. If
/// `from == to`, all values are cleared.
fn clear_circular_range(values: &mut [f64], from: usize, to: usize) {
    let len = values.len();
    let mut count = (to + len - from) % len;
    if count == 0 {
        count = len;
    }
    (0..count).for_each(|i| values[(from + i) % len] = 0.0);
}

/// Clusters the peaks by height and removes the ones that are likely noise.
///
/// The lowest cluster is always considered noise, as long as there is more
/// than one cluster. The middle cluster is considered noise as well if the
/// upper cluster is more than `gap_ratio` times as far from it as the lower
/// one. A removed peak is cleared between its surrounding troughs.
pub fn remove_noise_peaks(
    values: &mut [f64],
    peak_indices: &[usize],
    gap_ratio: f64,
) -> ClusterReport {
    let peak_values = peak_indices.iter().map(|&i| values[i]).collect::<Vec<_>>();
    let mut clusters = get_clusters(&peak_values)
        .into_iter()
        .map(|cluster| (get_centroid(&peak_values, &cluster), cluster))
        .collect::<Vec<_>>();
    clusters.sort_by(|a, b| a.0.total_cmp(&b.0));

    let num_suppressed = match clusters.as_slice() {
        [] | [_] => 0,
        [(low, _), (mid, _), (high, _)] if high - mid > gap_ratio * (mid - low) => 2,
        _ => 1,
    };
    log::debug!(
        "{} peak clusters with centroids {:?}, {num_suppressed} considered noise",
        clusters.len(),
        clusters.iter().map(|(c, _)| *c).collect::<Vec<_>>()
    );

    // The troughs must be found before anything is cleared.
    let ranges = clusters[..num_suppressed]
        .iter()
        .flat_map(|(_, cluster)| cluster.iter())
        .map(|&i| get_surrounding_troughs(values, peak_indices[i]))
        .collect::<Vec<_>>();
    for (from, to) in ranges {
        clear_circular_range(values, from, to);
    }

    let to_values = |cluster: &Vec<usize>| {
        cluster
            .iter()
            .map(|&i| peak_values[i])
            .collect::<Vec<_>>()
    };
    ClusterReport {
        suppressed_clusters: clusters[..num_suppressed]
            .iter()
            .map(|(_, cluster)| to_values(cluster))
            .collect(),
        clusters: clusters.iter().map(|(_, cluster)| to_values(cluster)).collect(),
    }
}

/// Clears values that are masked by a nearby louder peak.
///
/// A peak masks the value at distance `j` (in both directions) if that
/// value is smaller than `peak * (1 - j / window)`, where the window
/// corresponds to 0.1 seconds.
pub fn simulate_temporal_masking(values: &mut [f64], odf_sample_rate: f64) {
    let len = values.len();
    let peak_indices = get_peak_indices(values);
    if peak_indices.len() < 2 {
        return;
    }

    let window = ((TEMPORAL_MASKING_DURATION_SECS * odf_sample_rate).round() as usize).min(len);
    let mut masked = vec![false; len];
    for &peak in &peak_indices {
        let peak_value = values[peak];
        for j in 1..window {
            let threshold = peak_value * (1.0 - j as f64 / window as f64);
            let before = (peak + len - j % len) % len;
            let after = (peak + j) % len;
            if values[before] < threshold {
                masked[before] = true;
            }
            if values[after] < threshold {
                masked[after] = true;
            }
        }
    }

    values
        .iter_mut()
        .zip(masked)
        .filter(|(_, masked)| *masked)
        .for_each(|(v, _)| *v = 0.0);
}

/// Applies both passes: noise peak removal, then temporal masking.
pub fn post_process(values: &mut [f64], odf_sample_rate: f64, gap_ratio: f64) -> ClusterReport {
    let peak_indices = get_peak_indices(values);
    let report = remove_noise_peaks(values, &peak_indices, gap_ratio);
    simulate_temporal_masking(values, odf_sample_rate);
    report
}
