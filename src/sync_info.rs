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

//! Information a host (such as a DAW) needs to fit a loop into its project.

use crate::meter::TimeSignature;
use crate::MusicalMeter;

/// Excess durations of at least this many quarter notes are not considered
/// a trailing tail but part of the loop.
const MAX_EXCESS_QUARTER_NOTES: f64 = 0.125;

/// How to sync a clip to a project tempo.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectSyncInfo {
    /// Tempo of the clip in quarter notes per minute.
    pub raw_audio_tempo: f64,
    /// Power of two the clip tempo should be multiplied with to be as close
    /// as possible to the project tempo. Playing a 63 QPM loop in a 128 QPM
    /// project at double speed is usually what users want.
    pub recommended_stretch_factor: f64,
    /// Number of quarter notes the clip is longer than a whole number of
    /// quarter notes, if it is only a bit longer. Typically a reverb tail.
    pub excess_duration_in_quarter_notes: f64,
    /// Time signature of the clip, if known.
    pub time_signature: Option<TimeSignature>,
}

fn is_valid_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Computes how to sync a clip with the detected `meter` and a duration of
/// `clip_duration_secs` to a project running at `host_tempo` (quarter notes
/// per minute). Without a host tempo, the clip is not stretched.
#[must_use]
pub fn get_project_sync_info(
    meter: &MusicalMeter,
    host_tempo: Option<f64>,
    clip_duration_secs: f64,
) -> ProjectSyncInfo {
    let quarter_notes_per_beat = meter
        .time_signature
        .unwrap_or(TimeSignature::FourFour)
        .quarter_notes_per_beat();
    let raw_audio_tempo = meter.bpm * quarter_notes_per_beat;

    let mut info = ProjectSyncInfo {
        raw_audio_tempo,
        recommended_stretch_factor: 1.0,
        excess_duration_in_quarter_notes: 0.0,
        time_signature: meter.time_signature,
    };
    if !is_valid_positive(raw_audio_tempo) {
        log::debug!("no sync info for tempo {raw_audio_tempo}");
        return info;
    }

    if let Some(host_tempo) = host_tempo.filter(|&t| is_valid_positive(t)) {
        info.recommended_stretch_factor = (host_tempo / raw_audio_tempo).log2().round().exp2();
    }

    if is_valid_positive(clip_duration_secs) {
        let num_quarter_notes = clip_duration_secs * raw_audio_tempo / 60.0;
        let excess = num_quarter_notes - num_quarter_notes.round();
        if excess > 0.0 && excess < MAX_EXCESS_QUARTER_NOTES {
            info.excess_duration_in_quarter_notes = excess;
        }
    }

    info
}
