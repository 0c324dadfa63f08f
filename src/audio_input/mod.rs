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

//! Abstraction over the audio the analysis reads from.
//!
//! The analysis never owns or mutates the audio. It only needs random
//! access to mono `f32` samples in range `-1.0..=1.0` at a known sample rate.

mod circular;

pub use circular::CircularSource;

use std::io;

/// Random-access source of mono audio samples.
///
/// The source must not change during an analysis.
pub trait AudioSource {
    /// Sample rate in Hertz, such as `44100`.
    fn sample_rate(&self) -> u32;

    /// Total number of samples.
    fn num_samples(&self) -> u64;

    /// Reads up to `buffer.len()` samples beginning at sample index `start`
    /// into `buffer` and returns how many samples were read. Near the end,
    /// fewer samples than requested are returned. Reads of in-range samples
    /// should not fail; I/O errors are propagated to the caller of the
    /// analysis.
    fn read_floats(&self, buffer: &mut [f32], start: u64) -> io::Result<usize>;

    /// Duration of the audio in seconds.
    #[inline]
    fn duration_secs(&self) -> f64 {
        if self.sample_rate() == 0 {
            0.0
        } else {
            self.num_samples() as f64 / self.sample_rate() as f64
        }
    }
}

impl<S: AudioSource + ?Sized> AudioSource for &S {
    #[inline]
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    #[inline]
    fn num_samples(&self) -> u64 {
        (**self).num_samples()
    }

    #[inline]
    fn read_floats(&self, buffer: &mut [f32], start: u64) -> io::Result<usize> {
        (**self).read_floats(buffer, start)
    }
}

/// In-memory [`AudioSource`] over a slice of mono samples.
#[derive(Debug, Clone, Copy)]
pub struct MonoSamples<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> MonoSamples<'a> {
    /// Creates a new source. The samples are expected to be in range
    /// `-1.0..=1.0`.
    #[must_use]
    pub const fn new(samples: &'a [f32], sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the underlying samples.
    #[must_use]
    pub const fn samples(&self) -> &'a [f32] {
        self.samples
    }
}

impl AudioSource for MonoSamples<'_> {
    #[inline]
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    fn num_samples(&self) -> u64 {
        self.samples.len() as u64
    }

    fn read_floats(&self, buffer: &mut [f32], start: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(start) else {
            return Ok(0);
        };
        if start >= self.samples.len() {
            return Ok(0);
        }
        let count = buffer.len().min(self.samples.len() - start);
        buffer[..count].copy_from_slice(&self.samples[start..start + count]);
        Ok(count)
    }
}
