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

//! Some common numeric utilities shared by the analysis stages.

use std::f64::consts::PI;

/// Returns the arithmetic mean of the values or `None` if there are no
/// values.
#[inline]
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Returns a Hann window of the given length whose values sum up to `1.0`.
///
/// The window is symmetric around its center and has no zero-valued taps, so
/// that each tap contributes. A normalized window keeps the level of an
/// analysis independent of the window length.
#[must_use]
pub fn get_normalized_hann_window(len: usize) -> Vec<f64> {
    let mut window = (0..len)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * (n + 1) as f64 / (len + 1) as f64).cos()))
        .collect::<Vec<_>>();
    let sum = window.iter().sum::<f64>();
    if sum > 0.0 {
        window.iter_mut().for_each(|w| *w /= sum);
    }
    window
}

/// Returns the indices of all local maxima of `values`, treating the slice as
/// circular. A plateau counts once, at its first index: a value must be
/// strictly greater than its left neighbour and not smaller than its right
/// neighbour.
///
/// As values are typically non-negative, zero-valued plateaus never count as
/// peaks.
#[must_use]
pub fn get_peak_indices(values: &[f64]) -> Vec<usize> {
    let len = values.len();
    if len < 2 {
        return Vec::new();
    }
    (0..len)
        .filter(|&i| {
            let prev = values[(i + len - 1) % len];
            let next = values[(i + 1) % len];
            values[i] > prev && values[i] >= next
        })
        .collect()
}

/// Wraps a possibly negative index into `0..len`.
#[inline]
#[must_use]
pub const fn wrap_index(index: i64, len: usize) -> usize {
    index.rem_euclid(len as i64) as usize
}
