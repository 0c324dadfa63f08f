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

//! Configuration of an analysis run.

use crate::meter::beat_tracking::BeatTracker;
use core::time::Duration;
use thiserror::Error;

/// Inputs longer than this are not considered a loop and are rejected.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(60);

/// Average rise of the log-compressed spectrum per bin below which a frame
/// is considered to carry no onset at all. This silences the onset
/// detection function during digital silence and very quiet tails.
pub const DEFAULT_ODF_NOISE_GATE: f64 = 0.01;

/// Weight of the self-similarity term relative to the tempo prior when
/// scoring meter hypotheses.
pub const DEFAULT_DISSIMILARITY_WEIGHT: f64 = 10.0;

/// The middle cluster of onset peaks is considered noise as well if the gap
/// between the upper and the middle cluster is that many times larger than
/// the gap between the middle and the lower cluster.
pub const DEFAULT_MIDDLE_CLUSTER_GAP_RATIO: f64 = 4.0;

/// Possible errors of [`AnalysisConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfigError {
    /// See [`AnalysisConfig::max_duration`].
    #[error("the maximum duration must not be zero")]
    ZeroMaxDuration,
    /// See [`AnalysisConfig::odf_noise_gate`].
    #[error("the noise gate must be finite and not negative: {0}")]
    InvalidNoiseGate(f64),
    /// See [`AnalysisConfig::dissimilarity_weight`].
    #[error("the dissimilarity weight must be finite and not negative: {0}")]
    InvalidDissimilarityWeight(f64),
    /// See [`AnalysisConfig::middle_cluster_gap_ratio`].
    #[error("the middle cluster gap ratio must be finite and positive: {0}")]
    InvalidGapRatio(f64),
}

/// Tunables of the analysis. [`AnalysisConfig::default`] yields the values
/// the detection is calibrated for.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Whether the audio is a seamless loop. If so, analysis frames that
    /// reach over the begin or the end of the audio wrap around. Otherwise,
    /// they are zero-padded.
    pub treat_as_loop: bool,
    /// Algorithm that finds the beats in the onset detection function.
    pub beat_tracker: BeatTracker,
    /// Longer inputs are rejected.
    pub max_duration: Duration,
    /// See [`DEFAULT_ODF_NOISE_GATE`].
    pub odf_noise_gate: f64,
    /// See [`DEFAULT_DISSIMILARITY_WEIGHT`].
    pub dissimilarity_weight: f64,
    /// See [`DEFAULT_MIDDLE_CLUSTER_GAP_RATIO`].
    pub middle_cluster_gap_ratio: f64,
}

impl AnalysisConfig {
    /// Checks that all values are in a sensible range.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.max_duration.is_zero() {
            return Err(InvalidConfigError::ZeroMaxDuration);
        }
        if !self.odf_noise_gate.is_finite() || self.odf_noise_gate < 0.0 {
            return Err(InvalidConfigError::InvalidNoiseGate(self.odf_noise_gate));
        }
        if !self.dissimilarity_weight.is_finite() || self.dissimilarity_weight < 0.0 {
            return Err(InvalidConfigError::InvalidDissimilarityWeight(
                self.dissimilarity_weight,
            ));
        }
        if !self.middle_cluster_gap_ratio.is_finite() || self.middle_cluster_gap_ratio <= 0.0 {
            return Err(InvalidConfigError::InvalidGapRatio(
                self.middle_cluster_gap_ratio,
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            treat_as_loop: true,
            beat_tracker: BeatTracker::default(),
            max_duration: DEFAULT_MAX_DURATION,
            odf_noise_gate: DEFAULT_ODF_NOISE_GATE,
            dissimilarity_weight: DEFAULT_DISSIMILARITY_WEIGHT,
            middle_cluster_gap_ratio: DEFAULT_MIDDLE_CLUSTER_GAP_RATIO,
        }
    }
}
