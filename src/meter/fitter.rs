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

//! Fits a meter to the beats of an onset detection function.
//!
//! Every combination of a number of bars and a time signature that evenly
//! distributes the beats is a hypothesis. Beats that play the same metrical
//! role should sound alike in a loop, so each hypothesis is scored by how
//! similar the onset strengths of such beats are, combined with a prior on
//! typical loop tempi.

use super::time_div::TimeDivTree;
use super::TimeSignature;
use crate::onset::Odf;
use crate::util::mean;

/// Largest number of bars a loop is assumed to have.
pub const MAX_NUM_BARS: usize = 8;

/// Dissimilarities below this value are considered a perfect repetition.
/// This keeps the logarithm in the score finite.
pub const DISSIMILARITY_FLOOR: f64 = 1e-4;

/// A scored (number of bars, time signature) hypothesis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hypothesis {
    /// Number of bars of the loop.
    pub num_bars: usize,
    /// Time signature of the loop.
    pub time_signature: TimeSignature,
    /// Tempo in beats per minute implied by the hypothesis.
    pub bpm: f64,
    /// Tempo in quarter notes per minute implied by the hypothesis.
    pub quarter_notes_per_minute: f64,
    /// Likelihood of the tempo, in `(0, 1]`. Higher is better.
    pub bpm_probability: f64,
    /// Normalized mean squared difference of the onset strengths of beats
    /// with the same metrical role. Lower is better.
    pub dissimilarity: f64,
    /// Number of beat pairs the dissimilarity is based on.
    pub num_comparisons: usize,
    /// Combined score. Higher is better.
    pub score: f64,
}

/// Whether the beats can be evenly distributed among `num_bars` bars of the
/// given time signature.
#[inline]
#[must_use]
pub const fn is_valid_hypothesis(
    num_beats: usize,
    num_bars: usize,
    time_signature: TimeSignature,
) -> bool {
    let divisor = num_bars * time_signature.beats_per_bar();
    divisor != 0 && num_beats % divisor == 0
}

/// Mean squared difference of the values of all pairs, normalized by the
/// squared mean of the whole ODF. Returns 0 if there are no pairs.
///
/// Dividing by the mean itself would leave a measure that scales with the
/// signal level. With the squared mean, scaling the ODF by any factor leaves
/// the dissimilarity unchanged, so quiet and loud renditions of a loop
/// score alike.
fn get_dissimilarity(beat_values: &[f64], pairs: &[(usize, usize)], odf_mean: f64) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let sum = pairs
        .iter()
        .map(|&(a, b)| {
            let diff = beat_values[a] - beat_values[b];
            diff * diff
        })
        .sum::<f64>();
    sum / pairs.len() as f64 / (odf_mean * odf_mean)
}

/// Checks the preconditions of [`get_hypotheses`]. Violations are
/// programming errors: they panic in debug builds.
fn is_well_formed(odf: &Odf, beat_indices: &[usize]) -> bool {
    let len = odf.values.len();
    let is_power_of_two = len.is_power_of_two();
    let beats_in_range = beat_indices.iter().all(|&i| i < len);
    let beats_ascending = beat_indices.windows(2).all(|w| w[0] < w[1]);
    debug_assert!(is_power_of_two, "ODF length {len} is not a power of two");
    debug_assert!(beats_in_range, "beat index out of range");
    debug_assert!(beats_ascending, "beat indices are not strictly ascending");
    is_power_of_two && beats_in_range && beats_ascending
}

/// Scores all valid hypotheses.
///
/// `weight` balances the self-similarity of the beats against the tempo
/// prior. Hypotheses without any beat pair to compare get a neutral
/// self-similarity term. The result is empty if no hypothesis is valid or
/// the ODF carries no onsets.
#[must_use]
pub fn get_hypotheses(odf: &Odf, beat_indices: &[usize], weight: f64) -> Vec<Hypothesis> {
    if beat_indices.is_empty() || odf.duration <= 0.0 || !is_well_formed(odf, beat_indices) {
        return Vec::new();
    }
    let Some(odf_mean) = mean(&odf.values).filter(|&m| m > 0.0) else {
        return Vec::new();
    };

    let num_beats = beat_indices.len();
    let beat_values = beat_indices
        .iter()
        .map(|&i| odf.values[i])
        .collect::<Vec<_>>();

    let mut hypotheses = Vec::new();
    for num_bars in 1..=MAX_NUM_BARS {
        for time_signature in TimeSignature::ALL {
            if !is_valid_hypothesis(num_beats, num_bars, time_signature) {
                continue;
            }
            let Some(tree) = TimeDivTree::new(num_beats, num_bars, time_signature) else {
                continue;
            };
            let pairs = tree.comparison_pairs();
            let dissimilarity = get_dissimilarity(&beat_values, &pairs, odf_mean);

            let bars_per_minute = num_bars as f64 * 60.0 / odf.duration;
            let bpm = bars_per_minute * time_signature.beats_per_bar() as f64;
            let bpm_probability = time_signature.bpm_probability(bpm);

            let self_similarity = if pairs.is_empty() {
                0.0
            } else {
                -weight * dissimilarity.max(DISSIMILARITY_FLOOR).ln()
            };
            let score = bpm_probability.ln() + self_similarity;

            log::trace!(
                "{num_bars} bar(s) of {time_signature}: {bpm:.2} bpm, p={bpm_probability:.4}, \
                 dissimilarity={dissimilarity:.4} ({} pairs), score={score:.3}",
                pairs.len()
            );

            hypotheses.push(Hypothesis {
                num_bars,
                time_signature,
                bpm,
                quarter_notes_per_minute: bars_per_minute * time_signature.quarter_notes_per_bar(),
                bpm_probability,
                dissimilarity,
                num_comparisons: pairs.len(),
                score,
            });
        }
    }
    hypotheses
}

/// Returns the hypothesis with the highest score. On a tie, the first one
/// wins.
#[must_use]
pub fn select_winner(hypotheses: &[Hypothesis]) -> Option<Hypothesis> {
    hypotheses
        .iter()
        .copied()
        .reduce(|best, h| if h.score > best.score { h } else { best })
}

/// Fits the best meter hypothesis to the ODF and its beats. Returns `None`
/// if no hypothesis is valid.
#[must_use]
pub fn fit_meter(odf: &Odf, beat_indices: &[usize], weight: f64) -> Option<Hypothesis> {
    let winner = select_winner(&get_hypotheses(odf, beat_indices, weight))?;
    log::debug!(
        "best meter: {} bar(s) of {} at {:.2} qpm",
        winner.num_bars,
        winner.time_signature,
        winner.quarter_notes_per_minute
    );
    Some(winner)
}
