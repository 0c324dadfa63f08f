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

use itertools::Itertools;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::vec::Vec;

/// Installs a logger so that the analysis steps of a test can be followed.
/// Subsequent calls have no effect.
pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Debug)
        .with_utc_timestamps()
        .init();
}

/// Reads a WAV file to mono audio. Returns the samples as mono audio.
/// Additionally, it returns the header of the file.
pub fn read_wav_to_mono<T: AsRef<Path>>(file: T) -> (Vec<f32>, hound::WavSpec) {
    let mut reader = hound::WavReader::open(file).unwrap();
    let header = reader.spec();

    let data = match header.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.unwrap())
            .collect::<Vec<_>>(),
        hound::SampleFormat::Int => {
            assert_eq!(header.bits_per_sample, 16, "unsupported format!");
            reader
                .samples::<i16>()
                .map(|s| s.unwrap() as f32 / i16::MAX as f32)
                .collect::<Vec<_>>()
        }
    };

    if header.channels == 1 {
        (data, header)
    } else if header.channels == 2 {
        let data = data
            .into_iter()
            .chunks(2)
            .into_iter()
            .map(|mut lr| {
                let l = lr.next().unwrap();
                let r = lr
                    .next()
                    .expect("should have an even number of LRLR samples");
                (l + r) / 2.0
            })
            .collect::<Vec<_>>();
        (data, header)
    } else {
        panic!("unsupported format!");
    }
}

/// Writes mono `f32` samples to a WAV file.
pub fn write_wav_file<T: AsRef<Path>>(file: T, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(file, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Returns the cargo target dir.
pub fn target_dir() -> PathBuf {
    // 1. Check if CARGO_TARGET_DIR is set
    if let Ok(dir) = std::env::var("CARGO_TARGET_DIR") {
        PathBuf::from(dir)
    } else {
        // 2. Fall back to default: go up from CARGO_MANIFEST_DIR
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.join("target")
    }
}

/// Returns a directory within the cargo target dir to store test artifacts.
/// The directory is created if it doesn't exist yet.
pub fn target_dir_test_artifacts() -> PathBuf {
    let mut path = target_dir();
    path.push("test_generated");
    std::fs::create_dir_all(&path).unwrap();
    path
}

/// Synthetic drum loops. Unlike recorded loops, their tempo and meter are
/// known exactly.
pub mod synth {
    use core::f32::consts::TAU;

    /// A short percussive sound: a low thump plus a bright attack, both
    /// decaying exponentially. Its peak amplitude is below `1.0`.
    pub fn click(sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| n as f32 / sample_rate as f32)
            .map(|t| {
                let low = (TAU * 150.0 * t).sin() * (-t / 0.05).exp();
                let high = (TAU * 2500.0 * t).sin() * (-t / 0.01).exp();
                0.5 * low + 0.5 * high
            })
            .collect()
    }

    /// A loop with one click per beat, scaled by the strength of that beat.
    /// Every click lasts until the next one begins, so equally strong beats
    /// produce bit-identical audio.
    pub fn click_loop(sample_rate: u32, bpm: f64, strengths: &[f32]) -> Vec<f32> {
        let beat_len = (sample_rate as f64 * 60.0 / bpm).round() as usize;
        let click = click(sample_rate, beat_len);
        strengths
            .iter()
            .flat_map(|&strength| click.iter().map(move |&x| strength * x))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_loop() {
        let samples = synth::click_loop(44100, 120.0, &[1.0, 0.5, 0.0]);
        check!(samples.len() == 3 * 22050);
        check!(samples.iter().all(|s| s.abs() <= 1.0));
        check!(samples[..22050].iter().any(|&s| s != 0.0));
        check!(samples[44100..].iter().all(|&s| s == 0.0));
        check!(samples[22050 + 100] == 0.5 * samples[100]);
    }

    #[test]
    fn test_wav_file_preserves_samples() {
        let samples = synth::click_loop(22050, 100.0, &[1.0, 0.7]);
        let mut path = target_dir_test_artifacts();
        path.push("test_utils_click_loop.wav");
        write_wav_file(&path, &samples, 22050);

        let (read, header) = read_wav_to_mono(&path);
        check!(header.sample_rate == 22050);
        check!(header.channels == 1);
        check!(read == samples);
    }
}
