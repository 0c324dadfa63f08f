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

//! Intermediate results of an analysis, for inspection and plotting.

use crate::meter::Hypothesis;

/// Collects the intermediate results of
/// [`crate::get_musical_meter_from_signal`].
///
/// Fields of stages the analysis didn't reach stay empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebugOutput {
    /// The detrended ODF before the clean-up. The beats are tracked on it.
    pub raw_odf: Vec<f64>,
    /// Peaks of [`Self::raw_odf`].
    pub raw_odf_peak_indices: Vec<usize>,
    /// Values of the ODF peaks, grouped by cluster, ordered by centroid.
    pub clusters: Vec<Vec<f64>>,
    /// The clusters whose peaks were considered noise.
    pub suppressed_clusters: Vec<Vec<f64>>,
    /// The ODF after the clean-up.
    pub odf: Vec<f64>,
    /// Indices of the beats. The first one is taken as a downbeat.
    pub beat_indices: Vec<usize>,
    /// All scored meter hypotheses.
    pub hypotheses: Vec<Hypothesis>,
    /// The winning hypothesis.
    pub winner: Option<Hypothesis>,
}
