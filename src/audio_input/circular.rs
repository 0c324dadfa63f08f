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

use super::AudioSource;
use std::io;

/// Adapter that turns an [`AudioSource`] into an endless loop of itself.
///
/// Reads starting at or beyond the end continue at the beginning, so that
/// every read fills the whole buffer as long as the underlying source isn't
/// empty. Start indices are taken modulo the number of samples.
#[derive(Debug, Clone, Copy)]
pub struct CircularSource<S> {
    inner: S,
}

impl<S: AudioSource> CircularSource<S> {
    /// Wraps the given source.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AudioSource> AudioSource for CircularSource<S> {
    #[inline]
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    #[inline]
    fn num_samples(&self) -> u64 {
        self.inner.num_samples()
    }

    fn read_floats(&self, buffer: &mut [f32], start: u64) -> io::Result<usize> {
        let len = self.inner.num_samples();
        if len == 0 {
            return Ok(0);
        }

        let mut pos = start % len;
        let mut filled = 0;
        while filled < buffer.len() {
            let read = self.inner.read_floats(&mut buffer[filled..], pos)?;
            if read == 0 {
                // The source claims more samples than it delivers.
                buffer[filled..].fill(0.0);
                break;
            }
            filled += read;
            pos = (pos + read as u64) % len;
        }
        Ok(buffer.len())
    }
}
