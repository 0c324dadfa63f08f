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

//! Errors that can abort an analysis.
//!
//! Note that "no meter detected" is not an error. All public entry points
//! report it as `Ok(None)`. An [`AnalysisError`] is only returned if the
//! analysis couldn't run to completion.

use crate::config::InvalidConfigError;
use thiserror::Error;

/// Reasons why an analysis was aborted.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The [`crate::AnalysisConfig`] is invalid.
    #[error("invalid analysis config")]
    InvalidConfig(#[from] InvalidConfigError),
    /// The audio source failed to provide samples.
    #[error("failed to read samples from the audio source")]
    Io(#[from] std::io::Error),
    /// The progress callback requested to cancel the analysis.
    #[error("the analysis was cancelled")]
    Cancelled,
    /// The progress callback failed with a custom error.
    #[error("the progress callback failed")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reports the progress of an analysis and decides whether it may continue.
///
/// It is invoked once per analysis frame with the fraction of work done in
/// range `0.0..=1.0`. Returning an error aborts the analysis immediately and
/// the error is handed to the caller unchanged. Use
/// [`AnalysisError::Cancelled`] for a regular cancellation.
pub trait ProgressCallback {
    /// Called once per analysis frame.
    fn on_progress(&mut self, fraction_done: f64) -> Result<(), AnalysisError>;
}

impl<F> ProgressCallback for F
where
    F: FnMut(f64) -> Result<(), AnalysisError>,
{
    #[inline]
    fn on_progress(&mut self, fraction_done: f64) -> Result<(), AnalysisError> {
        self(fraction_done)
    }
}

/// A [`ProgressCallback`] that ignores all progress updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    #[inline]
    fn on_progress(&mut self, _fraction_done: f64) -> Result<(), AnalysisError> {
        Ok(())
    }
}
