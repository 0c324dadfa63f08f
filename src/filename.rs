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

//! Tempo hints in file names.
//!
//! Sample packs usually encode the tempo of a loop in its file name, such as
//! `Drums_-_120BPM_-_Sticks.wav`. Such a hint is more reliable than any
//! signal analysis.

use once_cell::sync::Lazy;
use regex::Regex;

/// Slowest tempo (in BPM) a file name hint is accepted for.
pub const MIN_FILENAME_BPM: f64 = 30.0;
/// Fastest tempo (in BPM) a file name hint is accepted for.
pub const MAX_FILENAME_BPM: f64 = 300.0;

/// Two or three digits, optionally followed by a separator and then `bpm`.
/// Other text is only allowed if a separator splits it from the number.
static BPM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:.*[_\-\s./\\])?(\d{2,3})(?:[_\-\s.])?bpm(?:[_\-\s.].*)?$")
        .expect("should be a valid regex")
});

/// Extracts the tempo in BPM from a file name or path, if it has one.
///
/// Only the base name is considered. Tempi outside
/// [`MIN_FILENAME_BPM`]..=[`MAX_FILENAME_BPM`] are ignored.
#[must_use]
pub fn get_bpm_from_filename(filename: &str) -> Option<f64> {
    let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let captures = BPM_REGEX.captures(basename)?;
    let bpm = captures.get(1)?.as_str().parse::<f64>().ok()?;
    (MIN_FILENAME_BPM..=MAX_FILENAME_BPM)
        .contains(&bpm)
        .then_some(bpm)
}
