//! Pitches, pitch-name languages and named intervals
//!
//! A pitch is a diatonic step, a chromatic alteration and an octave
//! (octave 4 holds middle C, written `c'`). Pitches render in any of the
//! LilyPond note-name languages; English is the default.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};

/// Semitones above C for each diatonic step
const STEP_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Note naming language for LilyPond output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchLanguage {
    /// Dutch: c d e f g a b (cis/ees for sharps/flats) - LilyPond default
    Nederlands,

    /// English: c d e f g a b (cs/ef for sharps/flats)
    #[default]
    English,

    /// German: c d e f g a h (cis/es for sharps/flats)
    Deutsch,

    /// Italian: do re mi fa sol la si (dod/mib for sharps/flats)
    Italiano,
}

impl PitchLanguage {
    /// Name used in the `\language` directive
    pub fn directive_name(&self) -> &'static str {
        match self {
            PitchLanguage::Nederlands => "nederlands",
            PitchLanguage::English => "english",
            PitchLanguage::Deutsch => "deutsch",
            PitchLanguage::Italiano => "italiano",
        }
    }
}

/// Musical pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    /// Scale degree (0=C, 1=D, 2=E, 3=F, 4=G, 5=A, 6=B)
    pub step: u8,

    /// Accidental (-2=double flat, -1=flat, 0=natural, +1=sharp, +2=double sharp)
    pub alteration: i8,

    /// Octave number (4 = middle C octave)
    pub octave: i8,
}

impl Pitch {
    /// Create a new pitch with validation
    pub fn new(step: u8, alteration: i8, octave: i8) -> ScoreResult<Self> {
        if step > 6 {
            return Err(ScoreError::Parse {
                token: step.to_string(),
                reason: "step must be 0-6".to_string(),
            });
        }
        if !(-2..=2).contains(&alteration) {
            return Err(ScoreError::Parse {
                token: alteration.to_string(),
                reason: "alteration must be -2 to +2".to_string(),
            });
        }
        Ok(Self {
            step,
            alteration,
            octave,
        })
    }

    /// Parse an English pitch name such as `c'`, `fs''`, `bf,` or `ess`
    pub fn from_name(name: &str) -> ScoreResult<Self> {
        let error = |reason: &str| ScoreError::Parse {
            token: name.to_string(),
            reason: reason.to_string(),
        };
        let mut chars = name.chars();
        let letter = chars.next().ok_or_else(|| error("empty pitch name"))?;
        let step = match letter {
            'c' => 0,
            'd' => 1,
            'e' => 2,
            'f' => 3,
            'g' => 4,
            'a' => 5,
            'b' => 6,
            _ => return Err(error("unknown pitch letter")),
        };
        let rest: String = chars.collect();
        let accidental_end = rest
            .find(|c: char| c == '\'' || c == ',')
            .unwrap_or(rest.len());
        let (accidental, ticks) = rest.split_at(accidental_end);
        let alteration = match accidental {
            "" => 0,
            "s" | "sharp" => 1,
            "ss" | "x" => 2,
            "f" | "flat" => -1,
            "ff" => -2,
            _ => return Err(error("unknown accidental")),
        };
        let mut octave: i8 = 3;
        for tick in ticks.chars() {
            octave = match tick {
                '\'' => octave.checked_add(1),
                ',' => octave.checked_sub(1),
                _ => return Err(error("unexpected octave mark")),
            }
            .ok_or_else(|| error("octave out of range"))?;
        }
        Pitch::new(step, alteration, octave)
    }

    /// Semitones above middle C (negative below)
    pub fn number(&self) -> i32 {
        (self.octave as i32 - 4) * 12 + STEP_SEMITONES[self.step as usize] + self.alteration as i32
    }

    /// Staff positions above middle C (negative below)
    pub fn diatonic_number(&self) -> i32 {
        (self.octave as i32 - 4) * 7 + self.step as i32
    }

    /// Transpose by a named interval, spelling the result from the interval's
    /// staff-space count
    pub fn transpose(&self, interval: &NamedInterval) -> ScoreResult<Pitch> {
        let diatonic = self.diatonic_number() + interval.staff_spaces;
        let octave = diatonic.div_euclid(7) + 4;
        let step = diatonic.rem_euclid(7);
        let natural = (octave - 4) * 12 + STEP_SEMITONES[step as usize];
        let alteration = self.number() + interval.semitones - natural;
        if !(-2..=2).contains(&alteration) {
            return Err(ScoreError::InvalidAttachment(format!(
                "transposing {} by {} needs alteration {}",
                self, interval, alteration
            )));
        }
        Pitch::new(step as u8, alteration as i8, octave as i8)
    }

    /// Convert pitch to LilyPond notation in specified language
    pub fn to_lilypond_string(&self, language: PitchLanguage) -> String {
        format!("{}{}", self.note_name(language), self.octave_marks())
    }

    fn note_name(&self, language: PitchLanguage) -> String {
        let (base, suffixes): (&str, [&str; 4]) = match language {
            PitchLanguage::Nederlands => (
                ["c", "d", "e", "f", "g", "a", "b"][self.step as usize],
                ["eses", "es", "is", "isis"],
            ),
            PitchLanguage::English => (
                ["c", "d", "e", "f", "g", "a", "b"][self.step as usize],
                ["ff", "f", "s", "ss"],
            ),
            PitchLanguage::Deutsch => (
                ["c", "d", "e", "f", "g", "a", "h"][self.step as usize],
                ["eses", "es", "is", "isis"],
            ),
            PitchLanguage::Italiano => (
                ["do", "re", "mi", "fa", "sol", "la", "si"][self.step as usize],
                ["bb", "b", "d", "dd"],
            ),
        };
        match self.alteration {
            -2 => format!("{}{}", base, suffixes[0]),
            -1 => format!("{}{}", base, suffixes[1]),
            1 => format!("{}{}", base, suffixes[2]),
            2 => format!("{}{}", base, suffixes[3]),
            _ => base.to_string(),
        }
    }

    fn octave_marks(&self) -> String {
        // c' is octave 4 (middle C), c is octave 3, c, is octave 2
        if self.octave >= 4 {
            "'".repeat((self.octave - 3) as usize)
        } else {
            ",".repeat((3 - self.octave) as usize)
        }
    }
}

impl Ord for Pitch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number()
            .cmp(&other.number())
            .then(self.diatonic_number().cmp(&other.diatonic_number()))
    }
}

impl PartialOrd for Pitch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lilypond_string(PitchLanguage::English))
    }
}

/// Interval with a diatonic size and a chromatic size, e.g. `+M3` is four
/// semitones over two staff spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedInterval {
    pub staff_spaces: i32,
    pub semitones: i32,
}

impl NamedInterval {
    pub fn new(staff_spaces: i32, semitones: i32) -> Self {
        Self {
            staff_spaces,
            semitones,
        }
    }

    /// Parse interval names such as `M3`, `+P5`, `-m2`, `A4`, `d7`, `P8`
    pub fn from_name(name: &str) -> ScoreResult<Self> {
        let error = |reason: &str| ScoreError::Parse {
            token: name.to_string(),
            reason: reason.to_string(),
        };
        let (sign, body) = match name.as_bytes().first() {
            Some(b'-') => (-1, &name[1..]),
            Some(b'+') => (1, &name[1..]),
            _ => (1, name),
        };
        let mut chars = body.chars();
        let quality = chars.next().ok_or_else(|| error("empty interval"))?;
        let number: i32 = chars
            .as_str()
            .parse()
            .map_err(|_| error("interval number expected"))?;
        if number < 1 {
            return Err(error("interval number must be positive"));
        }
        let steps = number - 1;
        let simple = (steps % 7) as usize;
        let perfect_class = matches!(simple, 0 | 3 | 4);
        let adjustment = match (quality, perfect_class) {
            ('P', true) => 0,
            ('M', false) => 0,
            ('m', false) => -1,
            ('A', _) => 1,
            ('d', true) => -1,
            ('d', false) => -2,
            _ => return Err(error("quality does not fit interval number")),
        };
        let semitones = (steps / 7) * 12 + STEP_SEMITONES[simple] + adjustment;
        Ok(Self::new(sign * steps, sign * semitones))
    }
}

impl fmt::Display for NamedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+} steps/{:+} semitones", self.staff_spaces, self.semitones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        let c = Pitch::from_name("c'").unwrap();
        assert_eq!((c.step, c.alteration, c.octave), (0, 0, 4));
        let fs = Pitch::from_name("fs''").unwrap();
        assert_eq!((fs.step, fs.alteration, fs.octave), (3, 1, 5));
        let bf = Pitch::from_name("bf,").unwrap();
        assert_eq!((bf.step, bf.alteration, bf.octave), (6, -1, 2));
        assert!(Pitch::from_name("h'").is_err());
    }

    #[test]
    fn test_too_many_octave_marks() {
        let high = format!("c{}", "'".repeat(130));
        assert!(matches!(Pitch::from_name(&high), Err(ScoreError::Parse { .. })));
        let low = format!("c{}", ",".repeat(140));
        assert!(matches!(Pitch::from_name(&low), Err(ScoreError::Parse { .. })));
    }

    #[test]
    fn test_languages() {
        let p = Pitch::new(3, 1, 4).unwrap();
        assert_eq!(p.to_lilypond_string(PitchLanguage::English), "fs'");
        assert_eq!(p.to_lilypond_string(PitchLanguage::Nederlands), "fis'");
        assert_eq!(p.to_lilypond_string(PitchLanguage::Italiano), "fad'");
        let b = Pitch::new(6, -1, 3).unwrap();
        assert_eq!(b.to_lilypond_string(PitchLanguage::Deutsch), "hes");
    }

    #[test]
    fn test_ordering_by_height() {
        let mut pitches = vec![
            Pitch::from_name("g'").unwrap(),
            Pitch::from_name("c'").unwrap(),
            Pitch::from_name("e'").unwrap(),
        ];
        pitches.sort();
        let names: Vec<String> = pitches.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["c'", "e'", "g'"]);
    }

    #[test]
    fn test_intervals() {
        assert_eq!(NamedInterval::from_name("M3").unwrap(), NamedInterval::new(2, 4));
        assert_eq!(NamedInterval::from_name("-P5").unwrap(), NamedInterval::new(-4, -7));
        assert_eq!(NamedInterval::from_name("P8").unwrap(), NamedInterval::new(7, 12));
        assert_eq!(NamedInterval::from_name("A4").unwrap(), NamedInterval::new(3, 6));
        assert!(NamedInterval::from_name("P3").is_err());
    }

    #[test]
    fn test_transpose_spelling() {
        let c = Pitch::from_name("c'").unwrap();
        let e = c.transpose(&NamedInterval::from_name("M3").unwrap()).unwrap();
        assert_eq!(e.to_string(), "e'");
        let ef = c.transpose(&NamedInterval::from_name("m3").unwrap()).unwrap();
        assert_eq!(ef.to_string(), "ef'");
        let f = c.transpose(&NamedInterval::from_name("-P5").unwrap()).unwrap();
        assert_eq!(f.to_string(), "f");
        let b = Pitch::from_name("b'").unwrap();
        let ds = b.transpose(&NamedInterval::from_name("M3").unwrap()).unwrap();
        assert_eq!(ds.to_string(), "ds''");
    }
}
