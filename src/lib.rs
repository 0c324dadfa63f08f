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

//! **meter-detector** infers the tempo and the musical meter of short audio
//! loops, such as the drum loops of a sample pack, from the audio signal
//! alone or from a tempo hint in the file name.
//!
//! The analysis is offline: it reads the whole loop through an
//! [`AudioSource`], computes an onset detection function ([`Odf`]) from the
//! short-time power spectra, cleans it up, tracks the beats and finally
//! fits the number of bars and the [`TimeSignature`] that explain the
//! repetitions in the loop best. Hosts such as DAWs then use
//! [`get_project_sync_info`] to fit the loop into their project tempo.
//!
//! # Example
//!
//! ```rust
//! use meter_detector::{get_musical_meter, AnalysisConfig, MonoSamples, NoProgress};
//!
//! let samples = vec![0.0; 44100];
//! let source = MonoSamples::new(&samples, 44100);
//! let meter = get_musical_meter(
//!     source,
//!     Some("Drums_-_120BPM_-_Sticks.wav"),
//!     &AnalysisConfig::default(),
//!     &mut NoProgress,
//! )
//! .unwrap()
//! .unwrap();
//! assert_eq!(meter.bpm, 120.0);
//! ```
//!
//! # Logging
//!
//! The crate logs its decisions via the [`log`] facade.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(missing_debug_implementations)]

#[cfg_attr(test, macro_use)]
#[cfg(test)]
extern crate assert2;

#[cfg_attr(test, macro_use)]
#[cfg(test)]
extern crate float_cmp;

mod audio_input;
mod config;
mod debug_output;
mod error;
mod filename;
pub mod meter;
pub mod onset;
pub mod stft;
mod sync_info;
mod util;

#[cfg(test)]
mod test_utils;

pub use audio_input::{AudioSource, CircularSource, MonoSamples};
pub use config::{
    AnalysisConfig, InvalidConfigError, DEFAULT_DISSIMILARITY_WEIGHT, DEFAULT_MAX_DURATION,
    DEFAULT_MIDDLE_CLUSTER_GAP_RATIO, DEFAULT_ODF_NOISE_GATE,
};
pub use debug_output::DebugOutput;
pub use error::{AnalysisError, NoProgress, ProgressCallback};
pub use filename::{get_bpm_from_filename, MAX_FILENAME_BPM, MIN_FILENAME_BPM};
pub use meter::{BeatTracker, Hypothesis, TimeSignature};
pub use onset::Odf;
pub use sync_info::{get_project_sync_info, ProjectSyncInfo};

use meter::fitter::{fit_meter, get_hypotheses, select_winner};
use meter::rhythmicity::is_rhythmic;
use onset::odf::get_onset_detection_function;
use onset::post_filter::post_process;
use util::get_peak_indices;

/// Where the tempo of a [`MusicalMeter`] comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TempoSource {
    /// The file name carries the tempo.
    Filename,
    /// The tempo was inferred from the audio signal.
    Signal,
}

/// Tempo and meter of a loop.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MusicalMeter {
    /// Tempo in beats per minute. A beat is a quarter note, except for 6/8
    /// where it is a dotted quarter.
    pub bpm: f64,
    /// The time signature, if known. File name hints don't carry one.
    pub time_signature: Option<TimeSignature>,
    /// Where the tempo comes from.
    pub tempo_source: TempoSource,
}

/// Determines the musical meter of a loop.
///
/// A tempo hint in `filename` takes precedence over the signal analysis, see
/// [`get_bpm_from_filename`] and [`get_musical_meter_from_signal`].
///
/// Returns `Ok(None)` if no meter could be detected.
pub fn get_musical_meter<S: AudioSource>(
    source: S,
    filename: Option<&str>,
    config: &AnalysisConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<Option<MusicalMeter>, AnalysisError> {
    config.validate()?;
    if let Some(bpm) = filename.and_then(get_bpm_from_filename) {
        log::debug!("using the tempo of the file name: {bpm} bpm");
        return Ok(Some(MusicalMeter {
            bpm,
            time_signature: None,
            tempo_source: TempoSource::Filename,
        }));
    }
    get_musical_meter_from_signal(source, config, progress, None)
}

/// Determines the musical meter of a loop from its audio signal.
///
/// Empty sources and sources longer than [`AnalysisConfig::max_duration`]
/// are not analyzed. `progress` is invoked once per analysis frame and may
/// abort the analysis. If `debug_output` is provided, it receives the
/// intermediate results.
///
/// Returns `Ok(None)` if no meter could be detected, such as for silence or
/// for signals whose beats don't repeat like in a loop.
pub fn get_musical_meter_from_signal<S: AudioSource>(
    source: S,
    config: &AnalysisConfig,
    progress: &mut dyn ProgressCallback,
    mut debug_output: Option<&mut DebugOutput>,
) -> Result<Option<MusicalMeter>, AnalysisError> {
    config.validate()?;

    if source.num_samples() == 0 || source.sample_rate() == 0 {
        log::debug!("the source is empty");
        return Ok(None);
    }
    let duration = source.duration_secs();
    if duration > config.max_duration.as_secs_f64() {
        log::debug!(
            "the source is too long for a loop: {duration:.2}s > {:.2}s",
            config.max_duration.as_secs_f64()
        );
        return Ok(None);
    }

    let odf = get_onset_detection_function(
        source,
        config.treat_as_loop,
        config.odf_noise_gate,
        progress,
    )?;
    if let Some(debug) = debug_output.as_deref_mut() {
        debug.raw_odf = odf.values.clone();
        debug.raw_odf_peak_indices = get_peak_indices(&odf.values);
    }

    // Weak beats must survive for the beat tracker, so only the fitter gets
    // to see the cleaned-up ODF.
    let mut filtered_odf = odf.clone();
    let odf_sample_rate = odf.sample_rate();
    let report = post_process(
        &mut filtered_odf.values,
        odf_sample_rate,
        config.middle_cluster_gap_ratio,
    );
    if let Some(debug) = debug_output.as_deref_mut() {
        debug.clusters = report.clusters;
        debug.suppressed_clusters = report.suppressed_clusters;
        debug.odf = filtered_odf.values.clone();
    }
    if filtered_odf.is_silent() {
        log::debug!("no onsets found");
        return Ok(None);
    }

    let Some(beat_indices) = config.beat_tracker.get_beat_indices(&odf) else {
        log::debug!("no beats found");
        return Ok(None);
    };
    if let Some(debug) = debug_output.as_deref_mut() {
        debug.beat_indices = beat_indices.clone();
    }
    if !is_rhythmic(&odf, &beat_indices) {
        log::debug!("the beats do not repeat like in a loop");
        return Ok(None);
    }

    let winner = match debug_output {
        Some(debug) => {
            debug.hypotheses =
                get_hypotheses(&filtered_odf, &beat_indices, config.dissimilarity_weight);
            debug.winner = select_winner(&debug.hypotheses);
            debug.winner
        }
        None => fit_meter(&filtered_odf, &beat_indices, config.dissimilarity_weight),
    };

    let Some(winner) = winner else {
        log::debug!("no meter fits the beats");
        return Ok(None);
    };
    Ok(Some(MusicalMeter {
        bpm: winner.quarter_notes_per_minute / winner.time_signature.quarter_notes_per_beat(),
        time_signature: Some(winner.time_signature),
        tempo_source: TempoSource::Signal,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        init_logger, read_wav_to_mono, synth, target_dir_test_artifacts, write_wav_file,
    };

    /// Two bars of 4/4 at 120 BPM, four seconds in total.
    fn two_bars_at_120_bpm() -> Vec<f32> {
        synth::click_loop(44100, 120.0, &[1.0; 8])
    }

    #[test]
    fn test_two_bars_of_four_four() {
        init_logger();
        let samples = two_bars_at_120_bpm();
        let mut debug = DebugOutput::default();
        let meter = get_musical_meter_from_signal(
            MonoSamples::new(&samples, 44100),
            &AnalysisConfig::default(),
            &mut NoProgress,
            Some(&mut debug),
        )
        .unwrap()
        .unwrap();

        check!(meter.time_signature == Some(TimeSignature::FourFour));
        check!(meter.tempo_source == TempoSource::Signal);
        check!(approx_eq!(f64, meter.bpm, 120.0, epsilon = 1e-9));

        check!(debug.raw_odf.len() == 256);
        check!(debug.odf.len() == 256);
        check!(debug.beat_indices.len() == 8);
        check!(debug.beat_indices[0] == 0);
        check!(debug.beat_indices.windows(2).all(|w| w[1] - w[0] == 32));
        check!(!debug.hypotheses.is_empty());
        let winner = debug.winner.unwrap();
        check!(winner.num_bars == 2);
        check!(winner.time_signature == TimeSignature::FourFour);
    }

    fn detect_meter(samples: &[f32]) -> Option<MusicalMeter> {
        get_musical_meter_from_signal(
            MonoSamples::new(samples, 44100),
            &AnalysisConfig::default(),
            &mut NoProgress,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_accented_four_four() {
        init_logger();
        let accents = [1.0, 0.4, 0.7, 0.4, 1.0, 0.4, 0.7, 0.4];
        for bpm in [120.0, 90.0] {
            let meter = detect_meter(&synth::click_loop(44100, bpm, &accents)).unwrap();
            check!(meter.time_signature == Some(TimeSignature::FourFour));
            check!(approx_eq!(f64, meter.bpm, bpm, epsilon = 1e-6));
        }
    }

    #[test]
    fn test_waltz() {
        init_logger();
        let samples = synth::click_loop(44100, 120.0, &[1.0, 0.5, 0.5, 1.0, 0.5, 0.5]);
        let meter = detect_meter(&samples).unwrap();
        check!(meter.time_signature == Some(TimeSignature::ThreeFour));
        check!(approx_eq!(f64, meter.bpm, 120.0, epsilon = 1e-6));
    }

    #[test]
    fn test_six_eight_in_eighth_notes() {
        init_logger();
        // Two bars of six eighth notes, 180 eighths per minute.
        let bar = [1.0, 0.4, 0.4, 0.7, 0.4, 0.4];
        let samples = synth::click_loop(44100, 180.0, &bar.repeat(2));
        let meter = detect_meter(&samples).unwrap();
        check!(meter.time_signature == Some(TimeSignature::SixEight));
        // One dotted quarter per three eighths.
        check!(approx_eq!(f64, meter.bpm, 60.0, epsilon = 1e-6));
    }

    #[test]
    fn test_white_noise_has_no_meter() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        init_logger();
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let samples = (0..4 * 44100)
                .map(|_| rng.random_range(-0.5..0.5))
                .collect::<Vec<f32>>();
            let meter = detect_meter(&samples);
            check!(meter == None, "seed {seed}");
        }
    }

    #[test]
    fn test_loop_from_wav_file() {
        let samples = two_bars_at_120_bpm();
        let mut path = target_dir_test_artifacts();
        path.push("two_bars_of_four_four.wav");
        write_wav_file(&path, &samples, 44100);

        let (samples, header) = read_wav_to_mono(&path);
        let meter = get_musical_meter(
            MonoSamples::new(&samples, header.sample_rate),
            path.file_name().and_then(|name| name.to_str()),
            &AnalysisConfig::default(),
            &mut NoProgress,
        )
        .unwrap()
        .unwrap();
        // The file name carries no tempo, so the signal decides.
        check!(meter.tempo_source == TempoSource::Signal);
        check!(meter.time_signature == Some(TimeSignature::FourFour));
        check!(approx_eq!(f64, meter.bpm, 120.0, epsilon = 1e-9));

        let sync_info = get_project_sync_info(&meter, Some(240.0), 4.0);
        check!(sync_info.raw_audio_tempo == meter.bpm);
        check!(sync_info.recommended_stretch_factor == 2.0);
        check!(sync_info.excess_duration_in_quarter_notes == 0.0);
    }

    #[test]
    fn test_filename_takes_precedence() {
        let samples = two_bars_at_120_bpm();
        let mut progress = |_fraction: f64| -> Result<(), AnalysisError> {
            panic!("the signal must not be analyzed");
        };
        let meter = get_musical_meter(
            MonoSamples::new(&samples, 44100),
            Some("/loops/funk_95bpm.wav"),
            &AnalysisConfig::default(),
            &mut progress,
        )
        .unwrap();
        check!(
            meter
                == Some(MusicalMeter {
                    bpm: 95.0,
                    time_signature: None,
                    tempo_source: TempoSource::Filename,
                })
        );
    }

    #[test]
    fn test_silence_has_no_meter() {
        let samples = vec![0.0; 4 * 44100];
        let mut debug = DebugOutput::default();
        let meter = get_musical_meter_from_signal(
            MonoSamples::new(&samples, 44100),
            &AnalysisConfig::default(),
            &mut NoProgress,
            Some(&mut debug),
        )
        .unwrap();
        check!(meter == None);
        check!(debug.odf.iter().all(|&v| v == 0.0));
        check!(debug.winner == None);
    }

    #[test]
    fn test_sources_that_are_not_analyzed() {
        let config = AnalysisConfig::default();
        let meter =
            get_musical_meter_from_signal(MonoSamples::new(&[], 44100), &config, &mut NoProgress, None)
                .unwrap();
        check!(meter == None);

        let samples = vec![0.0; 61 * 44100];
        let mut progress = |_fraction: f64| -> Result<(), AnalysisError> {
            panic!("the signal must not be analyzed");
        };
        let meter =
            get_musical_meter_from_signal(MonoSamples::new(&samples, 44100), &config, &mut progress, None)
                .unwrap();
        check!(meter == None);
    }

    #[test]
    fn test_cancellation() {
        let samples = two_bars_at_120_bpm();
        let mut calls = 0;
        let mut progress = |_fraction: f64| {
            calls += 1;
            if calls == 10 {
                Err(AnalysisError::Cancelled)
            } else {
                Ok(())
            }
        };
        let result = get_musical_meter_from_signal(
            MonoSamples::new(&samples, 44100),
            &AnalysisConfig::default(),
            &mut progress,
            None,
        );
        check!(let Err(AnalysisError::Cancelled) = result);
        check!(calls == 10);
    }

    #[test]
    fn test_callback_error_is_propagated() {
        let samples = two_bars_at_120_bpm();
        let mut progress = |_fraction: f64| -> Result<(), AnalysisError> {
            Err(AnalysisError::Callback("host shut down".into()))
        };
        let result = get_musical_meter_from_signal(
            MonoSamples::new(&samples, 44100),
            &AnalysisConfig::default(),
            &mut progress,
            None,
        );
        let Err(AnalysisError::Callback(err)) = result else {
            panic!("expected a callback error");
        };
        check!(err.to_string() == "host shut down");
    }

    #[test]
    fn test_invalid_config() {
        let config = AnalysisConfig {
            dissimilarity_weight: f64::NAN,
            ..Default::default()
        };
        let result = get_musical_meter(MonoSamples::new(&[], 44100), None, &config, &mut NoProgress);
        check!(let Err(AnalysisError::InvalidConfig(InvalidConfigError::InvalidDissimilarityWeight(_))) = result);
    }
}
