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

//! Autocorrelation of onset detection functions.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Returns the circular autocorrelation of `values`, normalized so that the
/// value at lag 0 is `1.0`.
///
/// It is computed as the inverse FFT of the power spectrum. The result has
/// the same length as the input and is symmetric: `xcorr[i] == xcorr[N - i]`.
/// An input without energy is returned unchanged.
#[must_use]
pub fn get_normalized_circular_autocorrelation(values: &[f64]) -> Vec<f64> {
    if values.iter().all(|&v| v == 0.0) {
        return values.to_vec();
    }

    let len = values.len();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(len);
    let ifft = planner.plan_fft_inverse(len);

    let mut buffer = values
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect::<Vec<_>>();
    fft.process(&mut buffer);
    buffer
        .iter_mut()
        .for_each(|bin| *bin = Complex::new(bin.norm_sqr(), 0.0));
    ifft.process(&mut buffer);

    let energy = buffer[0].re;
    let mut xcorr = buffer.iter().map(|c| c.re / energy).collect::<Vec<_>>();

    // Remove the rounding noise that breaks the symmetry.
    for i in 1..=len / 2 {
        let avg = (xcorr[i] + xcorr[len - i]) / 2.0;
        xcorr[i] = avg;
        xcorr[len - i] = avg;
    }
    xcorr[0] = 1.0;
    xcorr
}
