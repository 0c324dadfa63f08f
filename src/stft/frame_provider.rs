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

use crate::audio_input::{AudioSource, CircularSource};
use crate::util::get_normalized_hann_window;
use std::io;

/// Frame size at the reference sample rate of 44.1 kHz is `2^11`.
const REFERENCE_FRAME_SIZE_EXPONENT: f64 = 11.0;
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Returns the power-of-two frame size whose duration is closest to 2048
/// samples at 44.1 kHz.
#[must_use]
pub fn get_frame_size(sample_rate: u32) -> usize {
    if sample_rate == 0 {
        return 1;
    }
    let exponent = REFERENCE_FRAME_SIZE_EXPONENT
        + (f64::from(sample_rate) / REFERENCE_SAMPLE_RATE).log2();
    1 << (exponent.round().max(0.0) as u32)
}

/// Returns the number of frames for the given number of samples.
///
/// The nominal hop size is a quarter of the frame size. The number of frames
/// is the power of two that is closest (on a log scale) to the number of
/// nominal hops fitting into the signal, so that the resulting onset
/// detection function has a power-of-two length.
#[must_use]
pub fn get_num_frames(num_samples: u64, frame_size: usize) -> usize {
    if num_samples == 0 {
        return 0;
    }
    let nominal_hop_size = (frame_size / 4).max(1) as f64;
    let exponent = (num_samples as f64 / nominal_hop_size).log2().round();
    1 << (exponent.max(0.0) as u32)
}

/// Slices an [`AudioSource`] into overlapping frames that are multiplied
/// with a normalized Hann window.
///
/// Frame `i` ends right before sample `round((i + 1) * hop_size)`. Hence,
/// the first frame reaches left of the first sample and the last frames
/// reach beyond the end. These parts wrap around if the source is treated as
/// loop. Otherwise, they are zero.
///
/// The frames are produced lazily and exactly once. The iterator yields an
/// error if the source fails to provide samples.
#[derive(Debug)]
pub struct StftFrameProvider<S> {
    source: S,
    treat_as_loop: bool,
    frame_size: usize,
    hop_size: f64,
    num_frames: usize,
    window: Vec<f32>,
    frame_index: usize,
}

impl<S: AudioSource> StftFrameProvider<S> {
    /// Creates a new frame provider for the given source.
    pub fn new(source: S, treat_as_loop: bool) -> Self {
        let frame_size = get_frame_size(source.sample_rate());
        let num_frames = get_num_frames(source.num_samples(), frame_size);
        let hop_size = if num_frames == 0 {
            0.0
        } else {
            source.num_samples() as f64 / num_frames as f64
        };
        let window = get_normalized_hann_window(frame_size)
            .into_iter()
            .map(|w| w as f32)
            .collect();
        Self {
            source,
            treat_as_loop,
            frame_size,
            hop_size,
            num_frames,
            window,
            frame_index: 0,
        }
    }

    /// Number of samples per frame. This is always a power of two.
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Distance between the begin of two consecutive frames in samples.
    #[must_use]
    pub const fn hop_size(&self) -> f64 {
        self.hop_size
    }

    /// Total number of frames. This is always a power of two (or zero for an
    /// empty source).
    #[must_use]
    pub const fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Frames per second.
    #[must_use]
    pub fn frame_rate(&self) -> f64 {
        if self.hop_size > 0.0 {
            f64::from(self.source.sample_rate()) / self.hop_size
        } else {
            0.0
        }
    }

    /// Index of the first sample of the frame with the given index. This may
    /// be negative.
    fn frame_start(&self, frame_index: usize) -> i64 {
        ((frame_index + 1) as f64 * self.hop_size).round() as i64 - self.frame_size as i64
    }

    /// Reads the raw (not windowed) samples of a frame.
    fn read_frame(&self, frame_index: usize, frame: &mut [f32]) -> io::Result<()> {
        let start = self.frame_start(frame_index);
        let num_samples = self.source.num_samples() as i64;

        if self.treat_as_loop {
            let start = start.rem_euclid(num_samples) as u64;
            CircularSource::new(&self.source).read_floats(frame, start)?;
            return Ok(());
        }

        frame.fill(0.0);
        let begin = start.max(0);
        let end = (start + frame.len() as i64).min(num_samples);
        if begin < end {
            let offset = (begin - start) as usize;
            let len = (end - begin) as usize;
            let read = self
                .source
                .read_floats(&mut frame[offset..offset + len], begin as u64)?;
            debug_assert_eq!(read, len);
        }
        Ok(())
    }
}

impl<S: AudioSource> Iterator for StftFrameProvider<S> {
    type Item = io::Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame_index >= self.num_frames {
            return None;
        }

        let mut frame = vec![0.0; self.frame_size];
        let res = self.read_frame(self.frame_index, &mut frame).map(|_| {
            frame
                .iter_mut()
                .zip(self.window.iter())
                .for_each(|(sample, w)| *sample *= w);
            frame
        });
        self.frame_index += 1;
        Some(res)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_frames - self.frame_index;
        (remaining, Some(remaining))
    }
}

impl<S: AudioSource> ExactSizeIterator for StftFrameProvider<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_input::MonoSamples;

    /// With this sample rate, frames have eight samples and the nominal hop
    /// size is two samples.
    const TINY_SAMPLE_RATE: u32 = 172;

    #[test]
    fn test_get_frame_size() {
        check!(get_frame_size(44100) == 2048);
        check!(get_frame_size(48000) == 2048);
        check!(get_frame_size(22050) == 1024);
        check!(get_frame_size(96000) == 4096);
        check!(get_frame_size(TINY_SAMPLE_RATE) == 8);
        check!(get_frame_size(0) == 1);
    }

    #[test]
    fn test_get_num_frames() {
        check!(get_num_frames(0, 2048) == 0);
        check!(get_num_frames(1, 2048) == 1);
        // 4 s at 44.1 kHz: 344.5 nominal hops
        check!(get_num_frames(176400, 2048) == 256);
        // 8 s at 44.1 kHz: 689 nominal hops
        check!(get_num_frames(352800, 2048) == 512);
        check!(get_num_frames(16, 8) == 8);
    }

    #[test]
    fn test_frame_count_and_hop_size() {
        let samples = vec![0.0; 176400];
        let provider = StftFrameProvider::new(MonoSamples::new(&samples, 44100), true);
        check!(provider.num_frames() == 256);
        check!(provider.frame_size() == 2048);
        check!(approx_eq!(f64, provider.hop_size(), 689.0625));
        check!(approx_eq!(f64, provider.frame_rate(), 64.0, epsilon = 1e-9));
        check!(provider.count() == 256);
    }

    #[test]
    fn test_loop_frames_wrap_around() {
        let samples = (0..16).map(|i| i as f32).collect::<Vec<_>>();
        let provider = StftFrameProvider::new(MonoSamples::new(&samples, TINY_SAMPLE_RATE), true);
        check!(provider.num_frames() == 8);
        check!(provider.hop_size() == 2.0);

        let mut frame = [0.0; 8];
        provider.read_frame(0, &mut frame).unwrap();
        check!(frame == [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 0.0, 1.0]);

        provider.read_frame(7, &mut frame).unwrap();
        check!(frame == [8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn test_non_loop_frames_are_zero_padded() {
        let samples = (1..=16).map(|i| i as f32).collect::<Vec<_>>();
        let provider =
            StftFrameProvider::new(MonoSamples::new(&samples, TINY_SAMPLE_RATE), false);

        let mut frame = [-1.0; 8];
        provider.read_frame(0, &mut frame).unwrap();
        check!(frame == [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);

        provider.read_frame(4, &mut frame).unwrap();
        check!(frame == [3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_frames_are_windowed() {
        let samples = vec![1.0; 16];
        let frames = StftFrameProvider::new(MonoSamples::new(&samples, TINY_SAMPLE_RATE), true)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        check!(frames.len() == 8);
        for frame in frames {
            // A constant signal times a normalized window sums up to the
            // signal's level.
            check!(approx_eq!(f32, frame.iter().sum::<f32>(), 1.0, epsilon = 1e-5));
        }
    }

    #[test]
    fn test_empty_source_has_no_frames() {
        let mut provider = StftFrameProvider::new(MonoSamples::new(&[], 44100), true);
        check!(provider.num_frames() == 0);
        check!(provider.next().is_none());
    }
}
