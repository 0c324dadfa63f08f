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

use core::fmt::{Display, Formatter};

/// The time signatures the meter detection can tell apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeSignature {
    /// Four quarter-note beats per bar.
    FourFour,
    /// Three quarter-note beats per bar.
    ThreeFour,
    /// Two dotted-quarter beats per bar, each of three eighth notes.
    SixEight,
}

impl TimeSignature {
    /// All variants, in the order hypotheses are enumerated.
    pub const ALL: [Self; 3] = [Self::FourFour, Self::ThreeFour, Self::SixEight];

    /// Number of beats per bar. A beat of 6/8 is a dotted quarter.
    #[must_use]
    pub const fn beats_per_bar(self) -> usize {
        match self {
            Self::FourFour => 4,
            Self::ThreeFour => 3,
            Self::SixEight => 2,
        }
    }

    /// Duration of one beat in quarter notes.
    #[must_use]
    pub const fn quarter_notes_per_beat(self) -> f64 {
        match self {
            Self::FourFour | Self::ThreeFour => 1.0,
            Self::SixEight => 1.5,
        }
    }

    /// Duration of one bar in quarter notes.
    #[must_use]
    pub fn quarter_notes_per_bar(self) -> f64 {
        self.beats_per_bar() as f64 * self.quarter_notes_per_beat()
    }

    /// Subdivision factors of a bar, from the bar level down to the finest
    /// canonical level. 4/4 halves the bar and then each half, 3/4 divides
    /// it into three beats and 6/8 into two dotted quarters of three
    /// eighths each.
    #[must_use]
    pub const fn subdivision_pattern(self) -> &'static [usize] {
        match self {
            Self::FourFour => &[2, 2],
            Self::ThreeFour => &[3],
            Self::SixEight => &[2, 3],
        }
    }

    /// Mean and standard deviation (in beats per minute) of the tempo that
    /// loops in this time signature typically have.
    #[must_use]
    pub const fn tempo_prior(self) -> (f64, f64) {
        // TODO 3/4 and 6/8 priors may be mixed up, validate them against
        //  a labeled loop collection.
        match self {
            Self::FourFour => (115.0, 25.0),
            Self::ThreeFour => (140.0, 25.0),
            Self::SixEight => (64.0, 15.0),
        }
    }

    /// Unnormalized Gaussian likelihood of the tempo in beats per minute.
    /// It is `1.0` at the mean of [`Self::tempo_prior`].
    #[must_use]
    pub fn bpm_probability(self, bpm: f64) -> f64 {
        let (mu, sigma) = self.tempo_prior();
        let z = (bpm - mu) / sigma;
        (-0.5 * z * z).exp()
    }
}

impl Display for TimeSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::FourFour => "4/4",
            Self::ThreeFour => "3/4",
            Self::SixEight => "6/8",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_notes() {
        check!(TimeSignature::FourFour.quarter_notes_per_bar() == 4.0);
        check!(TimeSignature::ThreeFour.quarter_notes_per_bar() == 3.0);
        check!(TimeSignature::SixEight.quarter_notes_per_bar() == 3.0);
        check!(TimeSignature::SixEight.quarter_notes_per_beat() == 1.5);
    }

    #[test]
    fn test_subdivision_pattern_matches_beats_per_bar() {
        let product = |sig: TimeSignature| sig.subdivision_pattern().iter().product::<usize>();
        check!(product(TimeSignature::FourFour) == TimeSignature::FourFour.beats_per_bar());
        check!(product(TimeSignature::ThreeFour) == TimeSignature::ThreeFour.beats_per_bar());
        // Six eighths, grouped into two beats.
        check!(product(TimeSignature::SixEight) == 6);
        check!(TimeSignature::SixEight.subdivision_pattern()[0] == 2);
    }

    #[test]
    fn test_bpm_probability() {
        check!(TimeSignature::FourFour.bpm_probability(115.0) == 1.0);
        check!(approx_eq!(
            f64,
            TimeSignature::FourFour.bpm_probability(140.0),
            (-0.5_f64).exp(),
            epsilon = 1e-12
        ));
        check!(TimeSignature::SixEight.bpm_probability(64.0) == 1.0);
        check!(TimeSignature::ThreeFour.bpm_probability(400.0) < 1e-10);
    }

    #[test]
    fn test_display() {
        check!(TimeSignature::SixEight.to_string() == "6/8");
    }
}
