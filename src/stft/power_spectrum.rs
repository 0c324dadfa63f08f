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

use core::fmt::{Debug, Formatter};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Computes the power spectrum (squared magnitudes) of real-valued frames of
/// a fixed size. The FFT plan and all buffers are allocated once and reused
/// for every frame.
pub struct PowerSpectrum {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl PowerSpectrum {
    /// Creates a new instance for frames of `frame_size` samples.
    #[must_use]
    pub fn new(frame_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::default(); frame_size],
            scratch,
        }
    }

    /// Number of bins of the power spectrum, i.e., all bins from DC up to
    /// and including Nyquist.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.buffer.len() / 2 + 1
    }

    /// Computes the power spectrum of `frame` into `power`.
    ///
    /// `frame` must have the frame size this instance was created with and
    /// `power` must have [`Self::num_bins`] elements.
    pub fn compute(&mut self, frame: &[f32], power: &mut [f64]) {
        debug_assert_eq!(frame.len(), self.buffer.len());
        debug_assert_eq!(power.len(), self.num_bins());

        self.buffer
            .iter_mut()
            .zip(frame.iter().copied().chain(core::iter::repeat(0.0)))
            .for_each(|(bin, sample)| *bin = Complex::new(sample, 0.0));
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        power
            .iter_mut()
            .zip(self.buffer.iter())
            .for_each(|(p, bin)| *p = f64::from(bin.norm_sqr()));
    }
}

impl Debug for PowerSpectrum {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PowerSpectrum")
            .field("frame_size", &self.buffer.len())
            .finish()
    }
}
